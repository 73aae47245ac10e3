//! Read-only text rendering of controller state for terminal output.

use crate::controller::LifecycleState;
use crate::core::models::{JobStatus, ResultSet};

/// Status line in the form `Status: running ( 2 / 5 )`. The counter is omitted
/// until the service reports a total.
pub fn status_line(state: &LifecycleState) -> String {
    let status = match state {
        LifecycleState::Idle => return "Status: idle".to_string(),
        LifecycleState::Submitting { .. } => return "Status: uploading".to_string(),
        LifecycleState::Polling { job } => job.status.to_string(),
        LifecycleState::Fetching { .. } => "fetching results".to_string(),
        LifecycleState::Completed { .. } => JobStatus::Done.to_string(),
        LifecycleState::Errored { error, job } => match job {
            Some(job) => format!("{} (error: {})", job.status, error),
            None => format!("error: {}", error),
        },
    };

    match state.job() {
        Some(job) if job.total > 0 => {
            format!("Status: {} ( {} / {} )", status, job.progress, job.total)
        }
        _ => format!("Status: {}", status),
    }
}

/// Plain-text table of results in service order.
pub fn render_table(results: &ResultSet) -> String {
    let headers = ["Email", "Reachable", "Error"];
    let rows: Vec<[String; 3]> = results
        .iter()
        .map(|r| {
            [
                r.email.clone(),
                r.reachable.map(|b| b.to_string()).unwrap_or_default(),
                r.error.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 3]| {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = w))
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(line.trim_end());
        out.push('\n');
    };

    push_row(headers);
    let rule = widths.map(|w| "-".repeat(w));
    push_row([rule[0].as_str(), rule[1].as_str(), rule[2].as_str()]);
    for row in &rows {
        push_row([row[0].as_str(), row[1].as_str(), row[2].as_str()]);
    }
    out
}
