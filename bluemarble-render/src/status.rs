use tracing::{error, info};

use crate::progress::ProgressReport;

/// Receives user-facing status lines from the template manager.
pub trait StatusSink: Send + Sync {
    fn report_status(&self, message: &str);
    fn report_error(&self, message: &str);
}

/// Forwards status lines to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn report_status(&self, message: &str) {
        info!(target: "bluemarble::status", "{message}");
    }

    fn report_error(&self, message: &str) {
        error!(target: "bluemarble::status", "{message}");
    }
}

/// `1234567` → `"1,234,567"`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// The two-line summary shown after each composited tile.
pub fn status_message(templates_drawn: usize, report: &ProgressReport) -> String {
    format!(
        "Displaying {} template{}.\nPainted {} / {} • Wrong {}",
        format_count(templates_drawn as u64),
        if templates_drawn == 1 { "" } else { "s" },
        format_count(report.painted),
        format_count(report.required),
        format_count(report.wrong),
    )
}
