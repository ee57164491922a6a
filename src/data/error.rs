use thiserror::Error;

/// A record failed structural validation and cannot enter the pipeline.
///
/// `position` is the zero-based index of the offending row in the order it
/// was supplied (file order for loaded tables).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("malformed record at position {position}: field '{field}' {reason}")]
pub struct MalformedRecordError {
    pub position: usize,
    pub field: &'static str,
    pub reason: MalformedReason,
}

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedReason {
    #[error("is missing")]
    Missing,
    #[error("has non-numeric value '{0}'")]
    NotNumeric(String),
    #[error("has non-finite value {0}")]
    NotFinite(f64),
}

impl MalformedRecordError {
    pub fn new(position: usize, field: &'static str, reason: MalformedReason) -> Self {
        Self {
            position,
            field,
            reason,
        }
    }
}
