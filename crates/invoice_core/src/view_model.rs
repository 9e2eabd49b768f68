use crate::{HaltReason, InvoiceId, ProcessingLogEntry, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Complete,
    Active,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageView {
    pub stage: Stage,
    pub state: StageState,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WatchViewModel {
    pub rows: Vec<InvoiceRowView>,
    pub active_count: usize,
    pub dirty: bool,
}

impl WatchViewModel {
    pub fn row(&self, invoice_id: &str) -> Option<&InvoiceRowView> {
        self.rows.iter().find(|row| row.invoice_id == invoice_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRowView {
    pub invoice_id: InvoiceId,
    pub invoice_number: Option<String>,
    pub raw_status: Option<String>,
    pub stage: Stage,
    pub stages: Vec<StageView>,
    pub stage_progress: f32,
    pub overall_progress: f32,
    pub halted: Option<HaltReason>,
    pub loading: bool,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub recommendation: Option<String>,
    /// Newest first.
    pub recent_log: Vec<ProcessingLogEntry>,
    pub watchers: usize,
}

impl InvoiceRowView {
    pub fn is_terminal(&self) -> bool {
        self.halted.is_some() || self.stage.is_terminal()
    }
}
