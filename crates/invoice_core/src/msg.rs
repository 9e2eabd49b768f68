use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A view started watching an invoice.
    Watch { invoice_id: crate::InvoiceId },
    /// A view stopped watching an invoice.
    Unwatch { invoice_id: crate::InvoiceId },
    /// A poll response arrived for the request issued as `seq`.
    PollSucceeded {
        invoice_id: crate::InvoiceId,
        seq: crate::RequestSeq,
        snapshot: crate::InvoiceSnapshot,
    },
    /// A poll request failed. Polling carries on at the same cadence.
    PollFailed {
        invoice_id: crate::InvoiceId,
        seq: crate::RequestSeq,
        error: String,
    },
    /// Wall-clock time passed; advances simulated stage progress.
    Tick { elapsed: Duration },
}
