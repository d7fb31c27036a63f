pub mod app;
pub mod archive;
pub mod assets;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod glitch;
pub mod layout;
pub mod output;
