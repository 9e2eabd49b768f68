use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type InvoiceId = String;
pub type RequestSeq = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingLogRecord {
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Invoice detail as served by `GET /api/invoices/{id}`. Nested results are
/// owned by the backend and kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_id: InvoiceId,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub po_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub extracted_data: Option<Value>,
    #[serde(default)]
    pub matching_result: Option<Value>,
    #[serde(default)]
    pub fraud_result: Option<Value>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub processed_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub processing_log: Vec<ProcessingLogRecord>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ProcessingLogRecord>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ProcessingLogRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceList {
    #[serde(default)]
    pub invoices: Vec<InvoiceRecord>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub invoice_id: InvoiceId,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// `POST /api/rl/feedback`
    Reinforcement,
    /// `POST /api/feedback/suggestion`
    Suggestion,
}

impl FeedbackKind {
    pub fn path(self) -> &'static str {
        match self {
            FeedbackKind::Reinforcement => "api/rl/feedback",
            FeedbackKind::Suggestion => "api/feedback/suggestion",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PollCompleted {
        invoice_id: InvoiceId,
        seq: RequestSeq,
        result: Result<InvoiceRecord, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    UnsupportedFileType { extension: String },
    EmptyFile,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "invalid response body"),
            FailureKind::UnsupportedFileType { extension } => {
                write!(f, "unsupported file type {extension:?}")
            }
            FailureKind::EmptyFile => write!(f, "empty file"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}
