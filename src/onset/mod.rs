//! Spectral-flux onset detection
//!
//! Rectified spectral flux per frame, an adaptive moving-average threshold,
//! delayed strict local-maximum peak picking, and a playback-time peak query.

pub mod config;
pub mod detector;
pub mod flux;
pub mod query;
pub mod sample;

pub use config::DetectorConfig;
pub use detector::{OnsetDetector, ThresholdWindow};
pub use sample::{FilteredSample, FluxSample, PeakEvent};
