//! Online spectral-flux onset detection.
//!
//! Feed one magnitude spectrum per audio frame into [`OnsetDetector::analyze`]
//! together with its playback time, then ask [`OnsetDetector::is_next_peak`]
//! once per update tick whether the current time lines up with a detected beat.

pub mod error;
pub mod onset;

pub use error::DetectorError;
pub use onset::{DetectorConfig, FilteredSample, FluxSample, OnsetDetector, PeakEvent, ThresholdWindow};
