use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use invoice_core::{Effect, InvoiceId, InvoiceSnapshot, Msg, ProcessingLogEntry};
use invoice_engine::{export_record, EngineEvent, InvoiceRecord, PollerHandle};
use invoice_logging::{invoice_info, invoice_warn};

/// Executes core effects against the poller and turns poller events back
/// into messages.
pub struct EffectRunner {
    poller: PollerHandle,
    save_dir: Option<PathBuf>,
    latest: HashMap<InvoiceId, InvoiceRecord>,
}

impl EffectRunner {
    pub fn new(poller: PollerHandle, save_dir: Option<PathBuf>) -> Self {
        Self {
            poller,
            save_dir,
            latest: HashMap::new(),
        }
    }

    /// Runs effects in order and returns user-facing notices.
    pub fn run(&mut self, effects: Vec<Effect>) -> Vec<String> {
        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                Effect::StartPolling { invoice_id } => {
                    invoice_info!("StartPolling invoice_id={}", invoice_id);
                    self.poller.watch(invoice_id);
                }
                Effect::StopPolling { invoice_id } => {
                    invoice_info!("StopPolling invoice_id={}", invoice_id);
                    self.poller.unwatch(invoice_id);
                }
                Effect::NotifyComplete { invoice_id } => {
                    let recommendation = self
                        .latest
                        .get(&invoice_id)
                        .and_then(|record| record.recommendation.clone());
                    notices.push(match recommendation {
                        Some(recommendation) => format!(
                            "{invoice_id} completed, recommendation {recommendation}"
                        ),
                        None => format!("{invoice_id} completed"),
                    });
                    notices.extend(self.export(&invoice_id));
                }
                Effect::NotifyHalted { invoice_id, reason } => {
                    notices.push(format!("{invoice_id} halted: {reason}"));
                    notices.extend(self.export(&invoice_id));
                }
            }
        }
        notices
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.poller.recv_timeout(timeout)
    }

    /// Maps a poller event to a message, remembering the fetched record.
    pub fn translate(&mut self, event: EngineEvent) -> Msg {
        match event {
            EngineEvent::PollCompleted {
                invoice_id,
                seq,
                result: Ok(record),
            } => {
                let snapshot = snapshot_of(&record);
                self.latest.insert(invoice_id.clone(), record);
                Msg::PollSucceeded {
                    invoice_id,
                    seq,
                    snapshot,
                }
            }
            EngineEvent::PollCompleted {
                invoice_id,
                seq,
                result: Err(error),
            } => Msg::PollFailed {
                invoice_id,
                seq,
                error: error.to_string(),
            },
        }
    }

    fn export(&self, invoice_id: &str) -> Option<String> {
        let dir = self.save_dir.as_ref()?;
        let Some(record) = self.latest.get(invoice_id) else {
            invoice_warn!("No fetched record to export for invoice_id={}", invoice_id);
            return None;
        };
        match export_record(dir, record) {
            Ok(path) => Some(format!("saved {}", path.display())),
            Err(err) => {
                invoice_warn!("Export failed invoice_id={}: {}", invoice_id, err);
                Some(format!("could not save {invoice_id}: {err}"))
            }
        }
    }
}

pub fn snapshot_of(record: &InvoiceRecord) -> InvoiceSnapshot {
    InvoiceSnapshot {
        status: record.status.clone(),
        invoice_number: record.invoice_number.clone(),
        recommendation: record.recommendation.clone(),
        processing_log: record
            .processing_log
            .iter()
            .map(|entry| ProcessingLogEntry {
                stage: entry.stage.clone(),
                message: entry.message.clone(),
                timestamp: entry.timestamp.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use invoice_core::HaltReason;
    use invoice_engine::{ApiError, ApiSettings, InvoiceClient, PollSettings};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn runner(save_dir: Option<PathBuf>) -> EffectRunner {
        let client = InvoiceClient::new(&ApiSettings::default()).unwrap();
        let poller = PollerHandle::new(Arc::new(client), PollSettings::default()).unwrap();
        EffectRunner::new(poller, save_dir)
    }

    fn record(status: &str) -> InvoiceRecord {
        serde_json::from_value(json!({
            "invoice_id": "inv/1",
            "invoice_number": "INV-9",
            "status": status,
            "recommendation": "REVIEW",
            "processing_log": [
                { "stage": "UPLOAD", "message": "received", "timestamp": "2024-05-01T08:00:00" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn successful_poll_becomes_snapshot_message() {
        let mut runner = runner(None);
        let msg = runner.translate(EngineEvent::PollCompleted {
            invoice_id: "inv/1".to_string(),
            seq: 7,
            result: Ok(record("MATCHING")),
        });
        match msg {
            Msg::PollSucceeded {
                invoice_id,
                seq,
                snapshot,
            } => {
                assert_eq!(invoice_id, "inv/1");
                assert_eq!(seq, 7);
                assert_eq!(snapshot.status.as_deref(), Some("MATCHING"));
                assert_eq!(snapshot.processing_log.len(), 1);
                assert_eq!(snapshot.processing_log[0].message, "received");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn failed_poll_carries_error_text() {
        let mut runner = runner(None);
        let error: ApiError = InvoiceClient::new(&ApiSettings {
            base_url: "not a url".to_string(),
            ..ApiSettings::default()
        })
        .err()
        .unwrap();
        let expected = error.to_string();
        let msg = runner.translate(EngineEvent::PollCompleted {
            invoice_id: "inv-2".to_string(),
            seq: 1,
            result: Err(error),
        });
        assert_eq!(
            msg,
            Msg::PollFailed {
                invoice_id: "inv-2".to_string(),
                seq: 1,
                error: expected,
            }
        );
    }

    #[test]
    fn terminal_effects_export_last_record() {
        let temp = TempDir::new().unwrap();
        let mut runner = runner(Some(temp.path().join("out")));
        runner.translate(EngineEvent::PollCompleted {
            invoice_id: "inv/1".to_string(),
            seq: 1,
            result: Ok(record("COMPLETED")),
        });

        let notices = runner.run(vec![Effect::NotifyComplete {
            invoice_id: "inv/1".to_string(),
        }]);
        assert_eq!(notices[0], "inv/1 completed, recommendation REVIEW");
        assert!(notices[1].starts_with("saved "));
        assert!(temp.path().join("out").join("inv_1.json").is_file());
    }

    #[test]
    fn halted_without_record_only_notifies() {
        let temp = TempDir::new().unwrap();
        let mut runner = runner(Some(temp.path().to_path_buf()));
        let notices = runner.run(vec![Effect::NotifyHalted {
            invoice_id: "inv-3".to_string(),
            reason: HaltReason::NoVendorFound,
        }]);
        assert_eq!(notices, vec!["inv-3 halted: vendor not found".to_string()]);
    }
}
