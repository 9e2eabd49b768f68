use std::fmt;
use std::time::Duration;

/// Ordered backend processing stages, as shown in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    Uploaded,
    Extracting,
    Matching,
    FraudCheck,
    Completed,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Uploaded,
        Stage::Extracting,
        Stage::Matching,
        Stage::FraudCheck,
        Stage::Completed,
    ];

    pub const TERMINAL: Stage = Stage::Completed;

    pub fn index(self) -> usize {
        match self {
            Stage::Uploaded => 0,
            Stage::Extracting => 1,
            Stage::Matching => 2,
            Stage::FraudCheck => 3,
            Stage::Completed => 4,
        }
    }

    /// Rough wall-clock time the backend spends in this stage.
    pub fn estimated_duration(self) -> Duration {
        match self {
            Stage::Uploaded => Duration::from_secs(2),
            Stage::Extracting => Duration::from_secs(20),
            Stage::Matching => Duration::from_secs(5),
            Stage::FraudCheck => Duration::from_secs(3),
            Stage::Completed => Duration::ZERO,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Uploaded => "Uploaded",
            Stage::Extracting => "Extracting",
            Stage::Matching => "Matching",
            Stage::FraudCheck => "Fraud check",
            Stage::Completed => "Completed",
        }
    }

    /// Strict stage mapping: any string that is not a stage name lands on
    /// `Uploaded`, failure statuses included.
    pub fn from_status(raw: Option<&str>) -> Stage {
        match classify_status(raw) {
            StatusClass::Stage(stage) => stage,
            StatusClass::Halted(_) => Stage::Uploaded,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure terminals reported by the backend. Processing never resumes after one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HaltReason {
    Failed,
    NoPoNumber,
    NoPoFound,
    NoGrnFound,
    NoVendorFound,
}

impl HaltReason {
    pub fn as_status(self) -> &'static str {
        match self {
            HaltReason::Failed => "FAILED",
            HaltReason::NoPoNumber => "NO_PO_NUMBER",
            HaltReason::NoPoFound => "NO_PO_FOUND",
            HaltReason::NoGrnFound => "NO_GRN_FOUND",
            HaltReason::NoVendorFound => "NO_VENDOR_FOUND",
        }
    }
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::Failed => write!(f, "processing failed"),
            HaltReason::NoPoNumber => write!(f, "no PO number on invoice"),
            HaltReason::NoPoFound => write!(f, "purchase order not found"),
            HaltReason::NoGrnFound => write!(f, "goods receipt not found"),
            HaltReason::NoVendorFound => write!(f, "vendor not found"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Stage(Stage),
    Halted(HaltReason),
}

impl StatusClass {
    pub fn is_terminal(self) -> bool {
        match self {
            StatusClass::Stage(stage) => stage.is_terminal(),
            StatusClass::Halted(_) => true,
        }
    }
}

/// Normalizes a raw backend status. Case and surrounding whitespace are
/// ignored; unknown or missing values fall back to `Uploaded`.
pub fn classify_status(raw: Option<&str>) -> StatusClass {
    let normalized = raw.map(str::trim).unwrap_or_default().to_ascii_lowercase();
    match normalized.as_str() {
        "uploaded" => StatusClass::Stage(Stage::Uploaded),
        "processing" | "extracting" => StatusClass::Stage(Stage::Extracting),
        "matching" => StatusClass::Stage(Stage::Matching),
        "fraud_check" | "fraudcheck" => StatusClass::Stage(Stage::FraudCheck),
        "completed" => StatusClass::Stage(Stage::Completed),
        "failed" => StatusClass::Halted(HaltReason::Failed),
        "no_po_number" => StatusClass::Halted(HaltReason::NoPoNumber),
        "no_po_found" => StatusClass::Halted(HaltReason::NoPoFound),
        "no_grn_found" => StatusClass::Halted(HaltReason::NoGrnFound),
        "no_vendor_found" => StatusClass::Halted(HaltReason::NoVendorFound),
        _ => StatusClass::Stage(Stage::Uploaded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_declaration_order() {
        for (expected, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), expected);
        }
    }

    #[test]
    fn halt_statuses_round_trip_through_classifier() {
        for reason in [
            HaltReason::Failed,
            HaltReason::NoPoNumber,
            HaltReason::NoPoFound,
            HaltReason::NoGrnFound,
            HaltReason::NoVendorFound,
        ] {
            assert_eq!(
                classify_status(Some(reason.as_status())),
                StatusClass::Halted(reason)
            );
        }
    }
}
