use serde::Serialize;

/// One flux measurement per ingested spectrum frame.
///
/// Fields are finalized in stages: `time` and `raw_flux` on ingestion,
/// `threshold` and `pruned_flux` once the threshold window is available,
/// `is_peak` once both neighbours have been thresholded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluxSample {
    time: f32,
    raw_flux: f32,
    threshold: f32,
    pruned_flux: f32,
    is_peak: bool,
    #[serde(skip)]
    thresholded: bool,
}

impl FluxSample {
    pub(crate) fn new(time: f32, raw_flux: f32) -> Self {
        Self {
            time,
            raw_flux,
            threshold: 0.0,
            pruned_flux: 0.0,
            is_peak: false,
            thresholded: false,
        }
    }

    /// Writes `threshold` and the clamped `pruned_flux`. Only the first call has effect.
    pub(crate) fn finalize_threshold(&mut self, threshold: f32) {
        if self.thresholded {
            return;
        }
        self.threshold = threshold;
        self.pruned_flux = (self.raw_flux - threshold).max(0.0);
        self.thresholded = true;
    }

    /// Returns true only on the call that flips `is_peak`.
    pub(crate) fn mark_peak(&mut self) -> bool {
        debug_assert!(self.thresholded, "peak marked before threshold");
        if self.is_peak {
            return false;
        }
        self.is_peak = true;
        true
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn raw_flux(&self) -> f32 {
        self.raw_flux
    }

    /// Adaptive threshold, 0 until the sample has window context.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// `max(0, raw_flux - threshold)`, 0 until thresholded.
    pub fn pruned_flux(&self) -> f32 {
        self.pruned_flux
    }

    pub fn is_peak(&self) -> bool {
        self.is_peak
    }

    pub fn is_thresholded(&self) -> bool {
        self.thresholded
    }
}

/// Downsampled diagnostic sample, one every `filter_window_size` raw samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredSample {
    pub time: f32,
    /// Mean raw flux over the filter window
    pub avg_flux: f32,
    /// Window mean around the anchor sample, before the multiplier
    pub threshold: f32,
    /// `avg_flux - threshold`, unclamped
    pub pruned_flux: f32,
}

/// Snapshot of a raw sample taken when it was identified as a peak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakEvent {
    /// Arrival index of the source sample
    pub index: usize,
    pub sample: FluxSample,
}

impl PeakEvent {
    pub fn time(&self) -> f32 {
        self.sample.time()
    }
}
