use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;

use crate::analysis::{
    DateWindow, MetricsSet, Owner, analyze_calendar_data, calculate_meeting_metrics,
};
use crate::chart::{self, ChartOptions, summary_table};
use crate::core::AppConfig;
use crate::google::{CalendarSource, GoogleCalendar, obtain_credentials};

pub struct AnalyzeArgs {
    pub start: String,
    pub end: String,
    pub output: Option<PathBuf>,
    pub open: bool,
    pub json: bool,
}

/// Fetch, classify and aggregate the events in the window.
pub async fn analyze(
    source: &(dyn CalendarSource + Send + Sync),
    window: &DateWindow,
    owner: &Owner,
) -> Result<MetricsSet> {
    let events = source
        .fetch_events(window.time_min(), window.time_max())
        .await?;
    let facts = analyze_calendar_data(&events, owner)?;
    Ok(calculate_meeting_metrics(&facts, window.start, window.end))
}

/// The metrics as printed on stdout, pretty JSON or the summary table.
pub fn format_output(metrics: &MetricsSet, json: bool) -> Result<String> {
    if json {
        Ok(format!("{}\n", serde_json::to_string_pretty(metrics)?))
    } else {
        Ok(summary_table(metrics))
    }
}

pub async fn run(args: AnalyzeArgs, config: &AppConfig) -> Result<()> {
    run_with_output(args, config, &mut io::stdout()).await
}

pub async fn run_with_output(
    args: AnalyzeArgs,
    config: &AppConfig,
    out: &mut impl Write,
) -> Result<()> {
    // Bad dates are reported and end the run without touching the network
    let window = match DateWindow::parse(&args.start, &args.end) {
        Ok(window) => window,
        Err(err) => {
            writeln!(out, "Error: {}", err)?;
            return Ok(());
        }
    };
    tracing::info!("Analyzing meetings from {} to {}", window.start, window.end);

    let client = config.http_client()?;
    let credentials = obtain_credentials(&client, config).await?;
    let calendar = GoogleCalendar::new(
        client,
        &config.calendar_api_url,
        &config.calendar_id,
        &credentials.access_token,
    );

    let owner = Owner {
        email: config.owner_email.clone(),
    };
    let metrics = analyze(&calendar, &window, &owner).await?;
    out.write_all(format_output(&metrics, args.json)?.as_bytes())?;

    let mut options = ChartOptions {
        open: args.open,
        ..ChartOptions::default()
    };
    if let Some(path) = args.output {
        options.output_path = path;
    }
    let path = chart::render(&metrics, &window, &options).await?;
    if !args.json {
        writeln!(out, "Chart saved to {}", path.display())?;
    }

    Ok(())
}
