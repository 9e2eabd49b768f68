use crate::{HaltReason, InvoiceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartPolling { invoice_id: InvoiceId },
    StopPolling { invoice_id: InvoiceId },
    /// Completion hook; emitted once per transition into the terminal stage.
    NotifyComplete { invoice_id: InvoiceId },
    NotifyHalted {
        invoice_id: InvoiceId,
        reason: HaltReason,
    },
}
