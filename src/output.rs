use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ExportResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Console,
    Json,
}

/// Prints progress lines to stdout as they happen.
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_welcome() {
        println!("\nWelcome to the Glitch.com bulk project downloader.");
    }

    pub fn print_finished(result: &ExportResult) {
        let failed = result.count(crate::app::ProjectAction::Failed);
        println!();
        println!("*** Finished downloading all your projects ***");
        if failed > 0 {
            println!("    ({failed} project(s) could not be downloaded, see messages above)");
        }
        println!();
        println!("NOTE: asset URLs were not automatically replaced in any source");
        println!("      code, so you will still need to replace CDN URLs in your");
        println!("      code with relative links to the ./glitch-assets directory.");
        println!();
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} in {:.1}s", event.message, elapsed.as_secs_f64()),
            None => println!("{}", event.message),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
