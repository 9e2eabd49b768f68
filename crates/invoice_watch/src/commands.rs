use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use invoice_core::{update, Msg, WatchState};
use invoice_engine::{FeedbackKind, InvoiceClient, InvoiceRecord, UploadFile, UploadReceipt};
use invoice_logging::invoice_info;
use serde_json::Value;

use crate::cli::FeedbackTarget;
use crate::effects::snapshot_of;
use crate::render;

/// Runs one request to completion on a throwaway single-threaded runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building the async runtime")?;
    Ok(runtime.block_on(future))
}

pub fn list(client: &InvoiceClient) -> Result<()> {
    let list = block_on(client.list_invoices())?.context("listing invoices")?;
    for record in &list.invoices {
        println!("{}", render::summary_line(record));
    }
    println!("{} invoice(s)", list.count.max(list.invoices.len()));
    Ok(())
}

pub fn show(client: &InvoiceClient, invoice_id: &str, log_entries: usize) -> Result<()> {
    let record = block_on(client.get_invoice(invoice_id))?
        .with_context(|| format!("fetching invoice {invoice_id}"))?;
    for line in detail_lines(&record, log_entries) {
        println!("{line}");
    }
    Ok(())
}

/// Header fields followed by the same pipeline row the watch view draws.
pub fn detail_lines(record: &InvoiceRecord, log_entries: usize) -> Vec<String> {
    let mut lines = vec![
        format!("invoice id:     {}", record.invoice_id),
        format!("status:         {}", field(&record.status)),
        format!("invoice number: {}", field(&record.invoice_number)),
        format!("vendor:         {}", field(&record.vendor_id)),
        format!("po number:      {}", field(&record.po_number)),
        format!("recommendation: {}", field(&record.recommendation)),
    ];
    if let Some(score) = record.risk_score {
        lines.push(format!("risk score:     {score:.1}"));
    }
    if let Some(uploaded) = &record.uploaded_at {
        lines.push(format!("uploaded:       {uploaded}"));
    }
    if let Some(processed) = &record.processed_at {
        lines.push(format!("processed:      {processed}"));
    }

    let (state, _) = update(
        WatchState::new().with_log_limit(log_entries),
        Msg::Watch {
            invoice_id: record.invoice_id.clone(),
        },
    );
    let (state, _) = update(
        state,
        Msg::PollSucceeded {
            invoice_id: record.invoice_id.clone(),
            seq: 1,
            snapshot: snapshot_of(record),
        },
    );
    if let Some(row) = state.view().row(&record.invoice_id) {
        lines.push(render::pipeline_line(row));
        lines.extend(row.recent_log.iter().map(render::log_line));
    }
    lines
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

pub fn upload(client: &InvoiceClient, path: &Path) -> Result<UploadReceipt> {
    let receipt = block_on(async {
        let file = UploadFile::from_path(path).await?;
        client.upload_invoice(file).await
    })?
    .with_context(|| format!("uploading {}", path.display()))?;
    invoice_info!(
        "Uploaded {} as invoice_id={}",
        path.display(),
        receipt.invoice_id
    );
    if receipt.message.is_empty() {
        println!("{} {}", receipt.invoice_id, receipt.status);
    } else {
        println!("{} {} ({})", receipt.invoice_id, receipt.status, receipt.message);
    }
    Ok(receipt)
}

pub fn delete(client: &InvoiceClient, invoice_id: &str) -> Result<()> {
    let message = block_on(client.delete_invoice(invoice_id))?
        .with_context(|| format!("deleting invoice {invoice_id}"))?;
    if message.is_empty() {
        println!("deleted {invoice_id}");
    } else {
        println!("{message}");
    }
    Ok(())
}

pub fn feedback(client: &InvoiceClient, target: FeedbackTarget, payload: &str) -> Result<()> {
    let body: Value = serde_json::from_str(payload).context("feedback payload is not JSON")?;
    let kind = match target {
        FeedbackTarget::Rl => FeedbackKind::Reinforcement,
        FeedbackTarget::Suggestion => FeedbackKind::Suggestion,
    };
    let response = block_on(client.send_feedback(kind, &body))?.context("sending feedback")?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn detail_lines_show_fields_pipeline_and_newest_log_first() {
        let record: InvoiceRecord = serde_json::from_value(json!({
            "invoice_id": "inv-5",
            "invoice_number": "INV-5",
            "vendor_id": "V-1",
            "status": "FRAUD_CHECK",
            "risk_score": 12.5,
            "processing_log": [
                { "stage": "UPLOAD", "message": "one", "timestamp": "2024-05-01T08:00:00" },
                { "stage": "EXTRACT", "message": "two", "timestamp": "2024-05-01T08:00:05" },
                { "stage": "MATCH", "message": "three", "timestamp": "2024-05-01T08:00:09" }
            ]
        }))
        .unwrap();

        let lines = detail_lines(&record, 2);
        assert_eq!(lines[0], "invoice id:     inv-5");
        assert_eq!(lines[4], "po number:      -");
        assert!(lines.contains(&"risk score:     12.5".to_string()));
        let pipeline = lines
            .iter()
            .position(|line| line.contains("[>] Fraud check"))
            .unwrap();
        assert_eq!(lines[pipeline + 1], "08:00:09 [MATCH] three");
        assert_eq!(lines[pipeline + 2], "08:00:05 [EXTRACT] two");
        assert_eq!(lines.len(), pipeline + 3);
    }
}
