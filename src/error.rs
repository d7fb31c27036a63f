use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ExportError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("could not read {what}: {message}")]
    Prompt { what: &'static str, message: String },

    #[error("Glitch request failed: {0}")]
    GlitchHttp(String),

    #[error("Glitch returned status {status} for {url}")]
    GlitchStatus { status: u16, url: String },

    #[error("could not parse JSON: {0}")]
    ListingParse(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("asset request failed: {0}")]
    AssetHttp(String),

    #[error("asset host returned status {status}")]
    AssetStatus { status: u16 },

    #[error("unusable project title: {0:?}")]
    InvalidTitle(String),

    #[error("unusable asset name: {0:?}")]
    InvalidAssetName(String),

    #[error("asset record {uuid} has no {field}")]
    IncompleteAsset { uuid: String, field: &'static str },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("{title} did not extract to {}", .expected.display())]
    MissingAppRoot { title: String, expected: PathBuf },

    #[error("malformed .glitch-assets line {line}: {message}")]
    ManifestParse { line: usize, message: String },

    #[error("malformed .glitch-assets line {line}: record has no uuid")]
    ManifestMissingUuid { line: usize },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

/// Renders `err` followed by every `source()` beneath it, joined with `: `.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::io;

    use super::*;

    #[derive(Debug)]
    struct Outer(io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "error sending request")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn chain_includes_sources() {
        let err = Outer(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "Connection refused (os error 111)",
        ));
        assert_eq!(
            error_chain(&err),
            "error sending request: Connection refused (os error 111)"
        );
    }

    #[test]
    fn chain_of_plain_error_is_its_message() {
        let err = io::Error::other("boom");
        assert_eq!(error_chain(&err), "boom");
    }
}
