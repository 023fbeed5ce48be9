mod commands;
mod config;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::commands::{App, CliError, component_listing};
use crate::config::{DEFAULT_BACKEND_URL, DEFAULT_WAIT_SECS, Settings};

#[derive(Parser, Debug)]
#[command(name = "panelboard", about = "Backend-driven panel client")]
struct Cli {
    #[arg(long, env = "PANELBOARD_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Poll interval in milliseconds; overrides POLL_INTERVAL_MS.
    #[arg(long, env = "PANELBOARD_POLL_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Double the delay after each unfinished attempt, up to POLL_BACKOFF_MAX_MS.
    #[arg(long)]
    backoff: bool,

    /// Give up waiting for a poll after this many seconds.
    #[arg(long, env = "PANELBOARD_WAIT_SECS", default_value_t = DEFAULT_WAIT_SECS)]
    wait_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the components the backend exposes.
    Components,
    /// Load a component and print its elements and store entries.
    Fetch { component: String },
    /// Load a component and print its tables as LaTeX.
    ExportTables { component: String },
    /// POST a payload to an element endpoint and apply the changed elements.
    Post {
        path: String,
        #[arg(long)]
        data: String,
        /// Load this component first so the update has something to change.
        #[arg(long)]
        component: Option<String>,
        /// Reject updates to keys the store does not already hold.
        #[arg(long, env = "PANELBOARD_STRICT")]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::new(cli.backend_url, cli.interval_ms, cli.backoff, cli.wait_secs);

    match run(settings, cli.command).await {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings, command: Command) -> Result<String, CliError> {
    let mut app = App::new(settings)?;
    match command {
        Command::Components => Ok(component_listing(&app.components().await?)),
        Command::Fetch { component } => {
            app.load_component(&component).await?;
            Ok(app.listing())
        }
        Command::ExportTables { component } => {
            app.load_component(&component).await?;
            app.latex_tables()
        }
        Command::Post { path, data, component, strict } => {
            let body: Value = serde_json::from_str(&data)?;
            if let Some(component) = component {
                app.load_component(&component).await?;
            }
            let writes = app.post(&path, body, strict).await?;
            tracing::info!(writes, path = %path, "post applied");
            Ok(app.listing())
        }
    }
}
