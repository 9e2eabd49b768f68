//! Invoice engine: REST client, status poller and record export.
mod client;
mod export;
mod poller;
mod types;
mod upload;

pub use client::{ApiSettings, InvoiceClient, InvoiceSource, DEFAULT_BASE_URL};
pub use export::{
    ensure_output_dir, export_record, record_filename, AtomicFileWriter, PersistError,
};
pub use poller::{PollSettings, PollerHandle, DEFAULT_POLL_INTERVAL};
pub use types::{
    ApiError, EngineEvent, FailureKind, FeedbackKind, InvoiceId, InvoiceList, InvoiceRecord,
    ProcessingLogRecord, RequestSeq, UploadReceipt,
};
pub use upload::{mime_for_file_name, UploadFile};
