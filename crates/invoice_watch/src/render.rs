use chrono::{DateTime, NaiveDateTime};
use invoice_core::{InvoiceRowView, ProcessingLogEntry, StageState, WatchViewModel};
use invoice_engine::InvoiceRecord;

const BAR_WIDTH: usize = 20;

pub fn render(view: &WatchViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    for row in &view.rows {
        lines.extend(render_row(row));
    }
    lines.push(format!(
        "{} watched, {} in progress",
        view.rows.len(),
        view.active_count
    ));
    lines
}

pub fn render_row(row: &InvoiceRowView) -> Vec<String> {
    let title = match &row.invoice_number {
        Some(number) => format!("{} ({number})", row.invoice_id),
        None => row.invoice_id.clone(),
    };
    let mut lines = vec![format!(
        "{title}  {}  {:>5.1}%  {}",
        progress_bar(row.overall_progress),
        row.overall_progress,
        status_note(row)
    )];
    lines.push(format!("  {}", pipeline_line(row)));
    if let Some(error) = &row.last_error {
        lines.push(format!(
            "  last poll failed ({} in a row): {error}",
            row.consecutive_failures
        ));
    }
    for entry in &row.recent_log {
        lines.push(format!("  {}", log_line(entry)));
    }
    lines
}

fn status_note(row: &InvoiceRowView) -> String {
    if let Some(reason) = row.halted {
        return format!("halted: {reason}");
    }
    if row.stage.is_terminal() {
        return match &row.recommendation {
            Some(recommendation) => format!("completed, recommendation {recommendation}"),
            None => "completed".to_string(),
        };
    }
    if row.loading {
        return "loading...".to_string();
    }
    format!("{} {:.0}%", row.stage, row.stage_progress)
}

pub fn pipeline_line(row: &InvoiceRowView) -> String {
    row.stages
        .iter()
        .map(|view| {
            let marker = match view.state {
                StageState::Complete => "x",
                StageState::Active => ">",
                StageState::Pending => " ",
                StageState::Failed => "!",
            };
            format!("[{marker}] {}", view.stage)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn progress_bar(percent: f32) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f32).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn log_line(entry: &ProcessingLogEntry) -> String {
    format!(
        "{} [{}] {}",
        short_time(&entry.timestamp),
        entry.stage,
        entry.message
    )
}

/// `HH:MM:SS` for the backend's ISO timestamps; anything else is shown as-is.
pub fn short_time(timestamp: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return parsed.format("%H:%M:%S").to_string();
    }
    match NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(parsed) => parsed.format("%H:%M:%S").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

/// One line per invoice for `list`.
pub fn summary_line(record: &InvoiceRecord) -> String {
    let risk = record
        .risk_score
        .map(|score| format!("risk {score:.0}"))
        .unwrap_or_else(|| "risk -".to_string());
    format!(
        "{:<38} {:<14} {:<16} {:<8} {}",
        record.invoice_id,
        record.invoice_number.as_deref().unwrap_or("-"),
        record.status.as_deref().unwrap_or("-"),
        record.recommendation.as_deref().unwrap_or("-"),
        risk
    )
}
