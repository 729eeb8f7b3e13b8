use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};

/// Tuning knobs for [`OnsetDetector`](super::OnsetDetector), fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Magnitude bins per spectrum frame
    #[serde(default = "default_bin_count")]
    pub bin_count: usize,
    /// Sensitivity: a sample must exceed this many times its local mean flux
    #[serde(default = "default_threshold_multiplier")]
    pub threshold_multiplier: f32,
    /// Samples averaged around each flux sample (must be even)
    #[serde(default = "default_threshold_window_size")]
    pub threshold_window_size: usize,
    /// Raw samples per diagnostic filtered sample
    #[serde(default = "default_filter_window_size")]
    pub filter_window_size: usize,
    /// Latency offset and debounce interval for peak queries, in seconds.
    /// Must be a whole number of `query_resolution` steps.
    #[serde(default = "default_time_filter")]
    pub time_filter: f32,
    /// Bucket width used to match query times against peak times, in seconds
    #[serde(default = "default_query_resolution")]
    pub query_resolution: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            bin_count: default_bin_count(),
            threshold_multiplier: default_threshold_multiplier(),
            threshold_window_size: default_threshold_window_size(),
            filter_window_size: default_filter_window_size(),
            time_filter: default_time_filter(),
            query_resolution: default_query_resolution(),
        }
    }
}

fn default_bin_count() -> usize { 1024 }
fn default_threshold_multiplier() -> f32 { 1.7 }
fn default_threshold_window_size() -> usize { 50 }
fn default_filter_window_size() -> usize { 14 }
fn default_time_filter() -> f32 { 0.20 }
fn default_query_resolution() -> f32 { 0.1 }

impl DetectorConfig {
    /// Half the threshold window; also the detection lag in samples.
    pub fn half_window(&self) -> usize {
        self.threshold_window_size / 2
    }

    pub fn validate(&self) -> Result<()> {
        if self.bin_count == 0 {
            return Err(invalid("bin_count must be at least 1"));
        }
        let window = self.threshold_window_size;
        if window < 4 || window % 2 != 0 {
            return Err(invalid(format!(
                "threshold_window_size must be even and at least 4, got {}",
                window
            )));
        }
        // The filtered trace reads [p, p + F) while only p + W/2 samples exist.
        if self.filter_window_size == 0 || self.filter_window_size > self.half_window() {
            return Err(invalid(format!(
                "filter_window_size must be in 1..={}, got {}",
                self.half_window(),
                self.filter_window_size
            )));
        }
        if !self.threshold_multiplier.is_finite() || self.threshold_multiplier < 0.0 {
            return Err(invalid(format!(
                "threshold_multiplier must be finite and non-negative, got {}",
                self.threshold_multiplier
            )));
        }
        if !self.time_filter.is_finite() || self.time_filter < 0.0 {
            return Err(invalid(format!(
                "time_filter must be finite and non-negative, got {}",
                self.time_filter
            )));
        }
        if !self.query_resolution.is_finite() || self.query_resolution <= 0.0 {
            return Err(invalid(format!(
                "query_resolution must be finite and positive, got {}",
                self.query_resolution
            )));
        }
        let steps = self.time_filter / self.query_resolution;
        if (steps - steps.round()).abs() > 1e-3 {
            return Err(invalid(format!(
                "time_filter {} is not a multiple of query_resolution {}",
                self.time_filter, self.query_resolution
            )));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> DetectorError {
    DetectorError::InvalidConfig(msg.into())
}
