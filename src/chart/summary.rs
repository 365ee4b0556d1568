use crate::analysis::MetricsSet;

/// Plain text version of the chart for the terminal.
pub fn summary_table(metrics: &MetricsSet) -> String {
    let mut out = format!(
        "{:<10} {:>8} {:>8} {:>12} {:>9}\n",
        "Status", "Total", "Working", "Non-working", "% of wh"
    );
    for (status, m) in metrics.iter() {
        out.push_str(&format!(
            "{:<10} {:>8.1} {:>8.1} {:>12.1} {:>8.1}%\n",
            status.display_name(),
            m.total_hours,
            m.working_hours,
            m.non_working_hours,
            m.percentage_of_working_hours
        ));
    }
    out.push_str(&format!(
        "{} working days, {:.1} working hours\n",
        metrics.total_working_days, metrics.total_working_hours
    ));
    out
}
