use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod analyze;

use crate::core::AppConfig;
use analyze::AnalyzeArgs;

/// Analyze Google Calendar meetings within a time window
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Start date in YYYY-MM-DD format
    #[arg(long, short)]
    start: String,

    /// End date in YYYY-MM-DD format
    #[arg(long, short)]
    end: String,

    /// Where the cached OAuth token is stored
    #[arg(long)]
    token_path: Option<PathBuf>,

    /// OAuth client secret file downloaded from the Google Cloud console
    #[arg(long)]
    client_secrets: Option<PathBuf>,

    /// Where to write the chart page
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Write the chart without opening a browser
    #[arg(long, action, default_value = "false")]
    no_open: bool,

    /// Print the metrics as JSON instead of a table
    #[arg(long, action, default_value = "false")]
    json: bool,
}

impl Cli {
    fn config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        if let Some(path) = &self.token_path {
            config.token_path = path.clone();
        }
        if let Some(path) = &self.client_secrets {
            config.client_secrets_path = path.clone();
        }
        config
    }
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Logs go to stderr so `--json` output stays clean on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.config();
    analyze::run(
        AnalyzeArgs {
            start: args.start,
            end: args.end,
            output: args.output,
            open: !args.no_open,
            json: args.json,
        },
        &config,
    )
    .await
}
