//! HTML page for the chart. Plotly does the drawing in the browser,
//! the template only embeds the trace and layout JSON.

use std::fmt;

use handlebars::{Handlebars, TemplateError};

#[derive(Debug)]
pub enum Template {
    MeetingChart,
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub const PLOTLY_CDN_URL: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

pub const MEETING_CHART_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<script src="{{plotly_url}}"></script>
<style>
  body { margin: 0; font-family: Arial, sans-serif; color: #2D3436; background: white; }
  #chart { width: 100vw; height: 90vh; }
  p.range { text-align: center; margin: 0.5em 0 0 0; }
</style>
</head>
<body>
<p class="range">{{start}} to {{end}} &middot; {{working_days}} working days ({{working_hours}} hours)</p>
<div id="chart"></div>
<script>
  Plotly.newPlot("chart", {{{traces}}}, {{{layout}}}, {"responsive": true});
</script>
</body>
</html>
"#;

pub fn templates<'a>() -> Result<Handlebars<'a>, TemplateError> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_template_string(&Template::MeetingChart.to_string(), MEETING_CHART_TEMPLATE)?;
    Ok(registry)
}
