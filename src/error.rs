use thiserror::Error;

/// Errors surfaced by the onset detector.
///
/// Every variant is a precondition failure: the offending call is rejected
/// and the detector state is left as it was.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectorError {
    #[error("spectrum has {actual} bins, detector expects {expected}")]
    SpectrumLength { expected: usize, actual: usize },

    #[error("filter window [{start}, {start}+{len}) reads past {available} available samples")]
    FilterWindow {
        start: usize,
        len: usize,
        available: usize,
    },

    #[error("invalid detector config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DetectorError>;
