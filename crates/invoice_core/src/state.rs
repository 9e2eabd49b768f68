use std::collections::BTreeMap;
use std::time::Duration;

use crate::tracker::{Applied, Tracker};
use crate::view_model::{InvoiceRowView, StageState, StageView, WatchViewModel};
use crate::{InvoiceId, InvoiceSnapshot, RequestSeq, Stage};

pub const DEFAULT_LOG_LIMIT: usize = 5;

/// Store of trackers keyed by invoice id. Every view of one invoice shares
/// the same tracker, so they can never disagree about its stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState {
    trackers: BTreeMap<InvoiceId, Tracker>,
    log_limit: usize,
    dirty: bool,
}

impl Default for WatchState {
    fn default() -> Self {
        Self {
            trackers: BTreeMap::new(),
            log_limit: DEFAULT_LOG_LIMIT,
            dirty: false,
        }
    }
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of processing log entries each row carries in the view.
    pub fn with_log_limit(mut self, log_limit: usize) -> Self {
        self.log_limit = log_limit;
        self
    }

    pub fn is_watching(&self, invoice_id: &str) -> bool {
        self.trackers.contains_key(invoice_id)
    }

    pub fn watcher_count(&self, invoice_id: &str) -> usize {
        self.trackers
            .get(invoice_id)
            .map(|tracker| tracker.watchers)
            .unwrap_or(0)
    }

    pub fn stage_of(&self, invoice_id: &str) -> Option<Stage> {
        self.trackers.get(invoice_id).map(Tracker::stage)
    }

    pub fn stage_progress_of(&self, invoice_id: &str) -> Option<f32> {
        self.trackers
            .get(invoice_id)
            .map(|tracker| tracker.progress.percent())
    }

    /// True once nothing watched still needs polling.
    pub fn all_terminal(&self) -> bool {
        self.trackers.values().all(Tracker::is_terminal)
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn view(&self) -> WatchViewModel {
        let rows: Vec<InvoiceRowView> = self
            .trackers
            .iter()
            .map(|(invoice_id, tracker)| self.row_view(invoice_id, tracker))
            .collect();
        let active_count = rows.iter().filter(|row| !row.is_terminal()).count();
        WatchViewModel {
            rows,
            active_count,
            dirty: self.dirty,
        }
    }

    fn row_view(&self, invoice_id: &str, tracker: &Tracker) -> InvoiceRowView {
        let current = tracker.stage();
        let stages = Stage::ALL
            .iter()
            .map(|&stage| {
                let state = if stage < current || (stage == current && stage.is_terminal()) {
                    StageState::Complete
                } else if stage == current && tracker.halted.is_some() {
                    StageState::Failed
                } else if stage == current {
                    StageState::Active
                } else {
                    StageState::Pending
                };
                StageView { stage, state }
            })
            .collect();

        InvoiceRowView {
            invoice_id: invoice_id.to_string(),
            invoice_number: tracker.invoice_number.clone(),
            raw_status: tracker.raw_status.clone(),
            stage: current,
            stages,
            stage_progress: tracker.progress.percent(),
            overall_progress: tracker.progress.overall_percent(),
            halted: tracker.halted,
            loading: tracker.loading,
            consecutive_failures: tracker.consecutive_failures,
            last_error: tracker.last_error.clone(),
            recommendation: tracker.recommendation.clone(),
            recent_log: tracker.recent_log(self.log_limit),
            watchers: tracker.watchers,
        }
    }

    /// Registers a watcher. Returns true when this is the first watcher.
    pub(crate) fn watch(&mut self, invoice_id: &str) -> bool {
        self.dirty = true;
        match self.trackers.get_mut(invoice_id) {
            Some(tracker) => {
                tracker.watchers += 1;
                false
            }
            None => {
                self.trackers.insert(invoice_id.to_string(), Tracker::new());
                true
            }
        }
    }

    /// Drops a watcher. Returns `Some(still_polling)` when the tracker itself
    /// was discarded, `None` otherwise.
    pub(crate) fn unwatch(&mut self, invoice_id: &str) -> Option<bool> {
        let tracker = self.trackers.get_mut(invoice_id)?;
        tracker.watchers = tracker.watchers.saturating_sub(1);
        if tracker.watchers > 0 {
            return None;
        }
        let still_polling = !tracker.is_terminal();
        self.trackers.remove(invoice_id);
        self.dirty = true;
        Some(still_polling)
    }

    pub(crate) fn apply_snapshot(
        &mut self,
        invoice_id: &str,
        seq: RequestSeq,
        snapshot: InvoiceSnapshot,
    ) -> Option<Applied> {
        let tracker = self.trackers.get_mut(invoice_id)?;
        let applied = tracker.apply_snapshot(invoice_id, seq, snapshot);
        if applied != Applied::Stale {
            self.dirty = true;
        }
        Some(applied)
    }

    /// Returns true when the failure was recorded.
    pub(crate) fn apply_failure(
        &mut self,
        invoice_id: &str,
        seq: RequestSeq,
        error: String,
    ) -> bool {
        let Some(tracker) = self.trackers.get_mut(invoice_id) else {
            return false;
        };
        let recorded = tracker.apply_failure(invoice_id, seq, error);
        if recorded {
            self.dirty = true;
        }
        recorded
    }

    pub(crate) fn tick(&mut self, elapsed: Duration) {
        for tracker in self.trackers.values_mut() {
            let before = tracker.progress.percent();
            tracker.progress.advance(elapsed);
            if tracker.progress.percent() != before {
                self.dirty = true;
            }
        }
    }
}
