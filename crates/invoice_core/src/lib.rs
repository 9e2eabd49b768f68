//! Invoice watch core: pure pipeline tracker state machine and view-model helpers.
mod effect;
mod msg;
mod progress;
mod stage;
mod state;
mod tracker;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use progress::{StageProgress, PROGRESS_CEILING};
pub use stage::{classify_status, HaltReason, Stage, StatusClass};
pub use state::{WatchState, DEFAULT_LOG_LIMIT};
pub use tracker::{InvoiceId, InvoiceSnapshot, ProcessingLogEntry, RequestSeq};
pub use update::update;
pub use view_model::{InvoiceRowView, StageState, StageView, WatchViewModel};
