//! Bar + marker chart of the meeting metrics.

pub mod summary;
pub mod template;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use crate::analysis::{DateWindow, MetricsSet, TrackedStatus};
use crate::core::RenderError;
use crate::core::browser::open_in_browser;
use template::{PLOTLY_CDN_URL, Template, templates};

pub use summary::summary_table;

pub const CHART_TITLE: &str = "Meeting Time Analysis";
const TEXT_COLOR: &str = "#2D3436";
const GRID_COLOR: &str = "#DFE6E9";

pub fn status_color(status: TrackedStatus) -> &'static str {
    match status {
        TrackedStatus::Accepted => "#00B894",
        TrackedStatus::Declined => "#FF7675",
        TrackedStatus::NeedsAction => "#74B9FF",
        TrackedStatus::Tentative => "#FDCB6E",
    }
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub output_path: PathBuf,
    pub open: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            output_path: std::env::temp_dir().join("meeting_analysis.html"),
            open: true,
        }
    }
}

/// One bar per status on the hours axis and one diamond per status on
/// the percentage axis.
pub fn traces(metrics: &MetricsSet) -> Value {
    let mut traces = Vec::new();
    for (status, m) in metrics.iter() {
        let name = status.display_name();
        let color = status_color(status);
        traces.push(json!({
            "type": "bar",
            "name": format!("{} Meetings", name),
            "x": [name],
            "y": [m.total_hours],
            "marker": {"color": color},
            "hovertemplate": format!(
                "<b>%{{x}}</b><br>Total Hours: %{{y:.1f}}<br>Working Hours: {:.1}<br>Non-Working Hours: {:.1}<extra></extra>",
                m.working_hours, m.non_working_hours
            ),
        }));
        traces.push(json!({
            "type": "scatter",
            "mode": "markers",
            "name": format!("{} (%)", name),
            "x": [name],
            "y": [m.percentage_of_working_hours],
            "yaxis": "y2",
            "marker": {
                "size": 20,
                "symbol": "diamond",
                "color": color,
                "line": {"color": "white", "width": 2},
            },
            "hovertemplate": "<b>%{x}</b><br>Percentage of Working Hours: %{y:.1f}%<extra></extra>",
        }));
    }
    Value::Array(traces)
}

pub fn layout() -> Value {
    json!({
        "title": {"text": CHART_TITLE, "font": {"size": 24, "color": TEXT_COLOR}, "x": 0.5, "y": 0.95},
        "plot_bgcolor": "white",
        "paper_bgcolor": "white",
        "barmode": "group",
        "bargap": 0.15,
        "bargroupgap": 0.1,
        "hovermode": "x unified",
        "showlegend": true,
        "legend": {"orientation": "h", "yanchor": "bottom", "y": -0.2, "xanchor": "center", "x": 0.5},
        "margin": {"t": 100, "l": 70, "r": 70, "b": 100},
        "font": {"family": "Arial, sans-serif", "size": 12, "color": TEXT_COLOR},
        "xaxis": {"showgrid": false, "showline": true, "linecolor": GRID_COLOR, "tickfont": {"size": 12}},
        "yaxis": {
            "title": {"text": "Total Hours", "font": {"size": 14}},
            "showgrid": true,
            "gridcolor": GRID_COLOR,
            "showline": true,
            "linecolor": GRID_COLOR,
            "tickformat": ".1f",
            "tickfont": {"size": 12},
        },
        "yaxis2": {
            "title": {"text": "Percentage of Working Hours", "font": {"size": 14}},
            "overlaying": "y",
            "side": "right",
            "showgrid": false,
            "showline": true,
            "linecolor": GRID_COLOR,
            "tickformat": ".1f",
            "ticksuffix": "%",
            "tickfont": {"size": 12},
        },
    })
}

pub fn render_html(metrics: &MetricsSet, window: &DateWindow) -> Result<String, RenderError> {
    let registry = templates()?;
    let data = json!({
        "title": CHART_TITLE,
        "plotly_url": PLOTLY_CDN_URL,
        "start": window.start.to_string(),
        "end": window.end.to_string(),
        "working_days": metrics.total_working_days,
        "working_hours": format!("{:.1}", metrics.total_working_hours),
        "traces": serde_json::to_string(&traces(metrics))?,
        "layout": serde_json::to_string(&layout())?,
    });
    Ok(registry.render(&Template::MeetingChart.to_string(), &data)?)
}

fn write_chart(path: &Path, html: &str) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, html)?;
    Ok(())
}

/// Write the chart page and show it in the browser. Returns the path the
/// page was written to.
pub async fn render(
    metrics: &MetricsSet,
    window: &DateWindow,
    options: &ChartOptions,
) -> Result<PathBuf, RenderError> {
    let html = render_html(metrics, window)?;
    write_chart(&options.output_path, &html)?;
    tracing::info!("Chart written to {}", options.output_path.display());

    if options.open {
        open_in_browser(&options.output_path.display().to_string()).await;
    }
    Ok(options.output_path.clone())
}
