use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use glitch_export::app::{App, ExportOptions};
use glitch_export::config::ConfigLoader;
use glitch_export::credentials::{self, StdinPrompter};
use glitch_export::glitch::GlitchHttpClient;
use glitch_export::layout::Layout;
use glitch_export::output::{ConsoleOutput, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "glitch-export")]
#[command(about = "Download all of your Glitch projects, active and archived, with their assets")]
#[command(version, author)]
struct Cli {
    /// Glitch user id (prompted for when omitted)
    #[arg(env = "GLITCH_USER_ID")]
    user_id: Option<String>,

    /// Persistent token (prompted for when omitted)
    #[arg(env = "GLITCH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Do not download assets listed in .glitch-assets
    #[arg(long)]
    no_assets: bool,

    /// Re-download projects that already exist locally
    #[arg(long)]
    no_skip: bool,

    /// Accept invalid TLS certificates when downloading assets
    #[arg(long)]
    force_assets: bool,

    /// Keep the downloaded .tgz archives without unpacking them
    #[arg(long)]
    no_unpack: bool,

    /// Keep archives after unpacking
    #[arg(long)]
    keep_archives: bool,

    /// Path to a glitch-export.json config file
    #[arg(long)]
    config: Option<String>,

    /// Print a JSON report instead of progress lines
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Whatever is already on disk stays there.
    ctrlc::set_handler(|| std::process::exit(1)).into_diagnostic()?;

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };

    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    let options = ExportOptions {
        no_assets: cli.no_assets,
        no_skip: cli.no_skip,
        force_assets: cli.force_assets,
        no_unpack: cli.no_unpack,
        keep_archives: cli.keep_archives,
        page_limit: config.page_limit,
    };

    if matches!(output_mode, OutputMode::Console) {
        ConsoleOutput::print_welcome();
    }
    let credentials =
        credentials::resolve(cli.user_id, cli.token, &mut StdinPrompter::new()).into_diagnostic()?;

    let client = GlitchHttpClient::new(&config).into_diagnostic()?;
    let app = App::new(Layout::new(config.output_dir.clone()), client);

    match output_mode {
        OutputMode::Console => {
            let result = app.export(&credentials, &options, &ConsoleOutput);
            ConsoleOutput::print_finished(&result);
        }
        OutputMode::Json => {
            let result = app.export(&credentials, &options, &JsonOutput);
            JsonOutput::print_export(&result).into_diagnostic()?;
        }
    }
    Ok(())
}
