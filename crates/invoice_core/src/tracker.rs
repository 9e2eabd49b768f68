use invoice_logging::invoice_debug;

use crate::{classify_status, HaltReason, Stage, StageProgress, StatusClass};

pub type InvoiceId = String;

/// Sequence number assigned when a poll request is issued. Strictly increasing.
pub type RequestSeq = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingLogEntry {
    pub stage: String,
    pub message: String,
    pub timestamp: String,
}

/// The parts of a fetched invoice record the tracker cares about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvoiceSnapshot {
    pub status: Option<String>,
    pub invoice_number: Option<String>,
    pub recommendation: Option<String>,
    pub processing_log: Vec<ProcessingLogEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Stale,
    Unchanged,
    StageChanged,
    Completed,
    Halted(HaltReason),
}

/// Per-invoice reconciliation state shared by every watcher of that invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tracker {
    pub(crate) watchers: usize,
    pub(crate) progress: StageProgress,
    pub(crate) halted: Option<HaltReason>,
    pub(crate) raw_status: Option<String>,
    pub(crate) invoice_number: Option<String>,
    pub(crate) recommendation: Option<String>,
    pub(crate) log: Vec<ProcessingLogEntry>,
    pub(crate) loading: bool,
    pub(crate) consecutive_failures: u32,
    pub(crate) last_error: Option<String>,
    last_seq: Option<RequestSeq>,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        Self {
            watchers: 1,
            progress: StageProgress::new(Stage::Uploaded),
            halted: None,
            raw_status: None,
            invoice_number: None,
            recommendation: None,
            log: Vec::new(),
            loading: true,
            consecutive_failures: 0,
            last_error: None,
            last_seq: None,
        }
    }

    pub(crate) fn stage(&self) -> Stage {
        self.progress.stage()
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.halted.is_some() || self.stage().is_terminal()
    }

    pub(crate) fn apply_snapshot(
        &mut self,
        invoice_id: &str,
        seq: RequestSeq,
        snapshot: InvoiceSnapshot,
    ) -> Applied {
        if let Some(last) = self.last_seq {
            if seq <= last {
                invoice_debug!(
                    "Dropping stale response invoice_id={} seq={} last_applied={}",
                    invoice_id,
                    seq,
                    last
                );
                return Applied::Stale;
            }
        }
        self.last_seq = Some(seq);
        self.loading = false;
        self.consecutive_failures = 0;
        self.last_error = None;

        let InvoiceSnapshot {
            status,
            invoice_number,
            recommendation,
            processing_log,
        } = snapshot;
        let class = classify_status(status.as_deref());
        self.raw_status = status;
        if invoice_number.is_some() {
            self.invoice_number = invoice_number;
        }
        if recommendation.is_some() {
            self.recommendation = recommendation;
        }
        self.log = processing_log;

        if self.is_terminal() {
            return Applied::Unchanged;
        }

        match class {
            StatusClass::Stage(stage) => {
                if stage < self.stage() {
                    invoice_debug!(
                        "Ignoring stage regression invoice_id={} shown={:?} reported={:?}",
                        invoice_id,
                        self.stage(),
                        stage
                    );
                    return Applied::Unchanged;
                }
                let changed = self.progress.enter(stage);
                if stage.is_terminal() {
                    Applied::Completed
                } else if changed {
                    Applied::StageChanged
                } else {
                    Applied::Unchanged
                }
            }
            StatusClass::Halted(reason) => {
                self.halted = Some(reason);
                self.progress.freeze();
                Applied::Halted(reason)
            }
        }
    }

    /// Records a failed poll. Returns false when the failure is older than the
    /// newest applied response or the tracker is already terminal.
    pub(crate) fn apply_failure(
        &mut self,
        invoice_id: &str,
        seq: RequestSeq,
        error: String,
    ) -> bool {
        if self.is_terminal() || self.last_seq.is_some_and(|last| seq <= last) {
            invoice_debug!(
                "Dropping stale failure invoice_id={} seq={} last_applied={:?}",
                invoice_id,
                seq,
                self.last_seq
            );
            return false;
        }
        self.loading = false;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error);
        true
    }

    /// Newest `limit` log entries, newest first.
    pub(crate) fn recent_log(&self, limit: usize) -> Vec<ProcessingLogEntry> {
        self.log.iter().rev().take(limit).cloned().collect()
    }
}
