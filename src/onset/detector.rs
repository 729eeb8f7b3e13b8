use crate::error::{DetectorError, Result};

use super::config::DetectorConfig;
use super::flux::SpectrumHistory;
use super::sample::{FilteredSample, FluxSample, PeakEvent};

/// Span of raw samples averaged into one sample's threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdWindow {
    /// First index in the window
    pub start: usize,
    /// Right boundary index; the sample here is not averaged
    pub end: usize,
    pub start_time: f32,
    pub end_time: f32,
    /// `end_time - start_time` in seconds
    pub span: f32,
    /// Number of samples averaged
    pub len: usize,
}

/// Online spectral-flux onset detector for one audio track.
///
/// Detection runs `threshold_window_size / 2 + 1` samples behind ingestion:
/// a sample is thresholded once half a window of later samples exists, and
/// peak-picked one step after that when its right neighbour is thresholded.
#[derive(Debug, Clone)]
pub struct OnsetDetector {
    pub(super) config: DetectorConfig,
    spectra: SpectrumHistory,
    pub(super) samples: Vec<FluxSample>,
    pub(super) filtered: Vec<FilteredSample>,
    pub(super) peaks: Vec<PeakEvent>,
    /// Next sample eligible for thresholding
    process_cursor: usize,
    /// A filtered sample is emitted when `process_cursor == filter_cursor + W/2`
    filter_cursor: usize,
    /// Time of the last positive query answer
    pub(super) last_detection: Option<f32>,
}

impl OnsetDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            spectra: SpectrumHistory::new(config.bin_count),
            samples: Vec::new(),
            filtered: Vec::new(),
            peaks: Vec::new(),
            process_cursor: config.half_window(),
            filter_cursor: config.filter_window_size * 2,
            last_detection: None,
            config,
        })
    }

    /// Ingests one magnitude spectrum taken at playback `time`.
    ///
    /// Appends a flux sample and, once a full threshold window exists,
    /// advances detection by exactly one sample. On error nothing is changed.
    pub fn analyze(&mut self, spectrum: &[f32], time: f32) -> Result<()> {
        self.check_filter_window(self.samples.len() + 1)?;
        self.spectra.push(spectrum)?;

        let raw_flux = self.spectra.rectified_flux();
        self.samples.push(FluxSample::new(time, raw_flux));

        if self.samples.len() < self.config.threshold_window_size {
            log::trace!(
                "Warming up: {} of {} flux samples",
                self.samples.len(),
                self.config.threshold_window_size
            );
            return Ok(());
        }

        self.detect_step(time)
    }

    fn detect_step(&mut self, time: f32) -> Result<()> {
        let index = self.process_cursor;

        let mean = self.window_mean(index);
        self.samples[index].finalize_threshold(mean * self.config.threshold_multiplier);

        // index - 1 now has both neighbours thresholded
        self.pick_peak(index - 1);

        if self.filter_due() {
            self.emit_filtered(index, mean, time)?;
        }

        self.process_cursor += 1;
        Ok(())
    }

    fn pick_peak(&mut self, index: usize) {
        if index < 1 {
            return;
        }
        let pruned = self.samples[index].pruned_flux();
        let is_local_max = pruned > self.samples[index - 1].pruned_flux()
            && pruned > self.samples[index + 1].pruned_flux();
        if !is_local_max || !self.samples[index].mark_peak() {
            return;
        }

        let sample = self.samples[index].clone();
        log::debug!(
            "Peak at {:.3}s: pruned flux {:.4} (raw {:.4}, threshold {:.4})",
            sample.time(),
            sample.pruned_flux(),
            sample.raw_flux(),
            sample.threshold()
        );
        self.peaks.push(PeakEvent { index, sample });
    }

    fn filter_due(&self) -> bool {
        self.filter_cursor + self.config.half_window() == self.process_cursor
    }

    /// Rejects a call that would make the filtered trace read past `available` samples.
    ///
    /// `DetectorConfig::validate` already requires `filter_window_size <= W/2`,
    /// and every detection step holds `count == process_cursor + W/2`, so this
    /// only trips if that invariant is broken.
    fn check_filter_window(&self, available: usize) -> Result<()> {
        if available < self.config.threshold_window_size || !self.filter_due() {
            return Ok(());
        }
        let start = self.process_cursor;
        let len = self.config.filter_window_size;
        if start + len > available {
            return Err(DetectorError::FilterWindow {
                start,
                len,
                available,
            });
        }
        Ok(())
    }

    /// `threshold` is the anchor's unscaled window mean, not its multiplied threshold.
    fn emit_filtered(&mut self, anchor: usize, threshold: f32, time: f32) -> Result<()> {
        self.check_filter_window(self.samples.len())?;

        let len = self.config.filter_window_size;
        let sum: f32 = self.samples[anchor..anchor + len]
            .iter()
            .map(FluxSample::raw_flux)
            .sum();
        let avg_flux = sum / len as f32;

        self.filtered.push(FilteredSample {
            time,
            avg_flux,
            threshold,
            pruned_flux: avg_flux - threshold,
        });
        self.filter_cursor += len;
        Ok(())
    }

    /// `[max(0, i - W/2), min(count - 1, i + W/2))`
    fn window_bounds(&self, index: usize) -> (usize, usize) {
        let half = self.config.half_window();
        let start = index.saturating_sub(half);
        let end = self.samples.len().saturating_sub(1).min(index + half);
        (start, end)
    }

    fn window_mean(&self, index: usize) -> f32 {
        let (start, end) = self.window_bounds(index);
        if end <= start {
            return 0.0;
        }
        let sum: f32 = self.samples[start..end]
            .iter()
            .map(FluxSample::raw_flux)
            .sum();
        sum / (end - start) as f32
    }

    /// Threshold window for the sample at `index` given the samples ingested so far.
    pub fn threshold_window(&self, index: usize) -> Option<ThresholdWindow> {
        if index >= self.samples.len() {
            return None;
        }
        let (start, end) = self.window_bounds(index);
        let start_time = self.samples[start].time();
        let end_time = self.samples[end].time();
        Some(ThresholdWindow {
            start,
            end,
            start_time,
            end_time,
            span: end_time - start_time,
            len: end - start,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn samples(&self) -> &[FluxSample] {
        &self.samples
    }

    pub fn filtered(&self) -> &[FilteredSample] {
        &self.filtered
    }

    pub fn peaks(&self) -> &[PeakEvent] {
        &self.peaks
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True once a full threshold window has been ingested.
    pub fn is_warmed_up(&self) -> bool {
        self.samples.len() >= self.config.threshold_window_size
    }

    /// Number of raw samples marked as peaks.
    pub fn peak_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_peak()).count()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const FRAME_TIME: f32 = 0.1;

    /// Single-bin detector fed with a bin level that rises by `flux[i]` each frame,
    /// so the raw flux sequence equals `flux`.
    pub(crate) fn feed(config: DetectorConfig, flux: &[f32]) -> OnsetDetector {
        let mut detector = OnsetDetector::new(DetectorConfig {
            bin_count: 1,
            ..config
        })
        .unwrap();
        let mut level = 0.0f32;
        for (i, &f) in flux.iter().enumerate() {
            level += f;
            detector.analyze(&[level], i as f32 * FRAME_TIME).unwrap();
        }
        detector
    }

    pub(crate) fn spikes(len: usize, at: &[usize]) -> Vec<f32> {
        (0..len)
            .map(|i| if at.contains(&i) { 50.0 } else { 1.0 })
            .collect()
    }

    fn pseudo_random_flux(len: usize) -> Vec<f32> {
        let mut state = 0x2545_f491u32;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 * 10.0
            })
            .collect()
    }

    #[test]
    fn single_spike_yields_one_peak() {
        let detector = feed(DetectorConfig::default(), &spikes(200, &[100]));

        assert_eq!(detector.peaks().len(), 1);
        let peak = &detector.peaks()[0];
        assert_eq!(peak.index, 100);
        assert!(peak.sample.is_peak());
        assert!((peak.sample.threshold() - 3.4).abs() < 1e-4);
        assert!((peak.sample.pruned_flux() - 46.6).abs() < 1e-3);
        assert_eq!(detector.peak_count(), 1);
    }

    #[test]
    fn flat_flux_has_no_peaks() {
        for level in [0.0, 1.0, 7.5] {
            let detector = feed(DetectorConfig::default(), &vec![level; 300]);
            assert!(detector.peaks().is_empty());
            assert_eq!(detector.peak_count(), 0);
        }
    }

    #[test]
    fn warm_up_never_detects() {
        let config = DetectorConfig::default();
        let detector = feed(config.clone(), &spikes(config.threshold_window_size - 1, &[10, 30]));

        assert!(!detector.is_warmed_up());
        assert!(detector.peaks().is_empty());
        assert!(detector.filtered().is_empty());
        assert!(detector.samples().iter().all(|s| !s.is_thresholded()));
    }

    #[test]
    fn detection_lags_ingestion_by_half_window() {
        let detector = feed(DetectorConfig::default(), &spikes(120, &[]));
        let thresholded: Vec<usize> = detector
            .samples()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_thresholded())
            .map(|(i, _)| i)
            .collect();

        assert_eq!(thresholded.first(), Some(&25));
        assert_eq!(thresholded.last(), Some(&(120 - 25)));
        assert_eq!(thresholded.len(), 120 - 50 + 1);
    }

    #[test]
    fn threshold_window_excludes_right_boundary() {
        let config = DetectorConfig {
            threshold_multiplier: 1.0,
            threshold_window_size: 4,
            filter_window_size: 1,
            ..Default::default()
        };
        let detector = feed(config, &[1.0, 2.0, 3.0, 4.0]);

        // window for index 2 is [0, 3): samples 0, 1, 2
        assert_eq!(detector.samples()[2].threshold(), 2.0);
        assert_eq!(detector.samples()[2].pruned_flux(), 1.0);

        let window = detector.threshold_window(2).unwrap();
        assert_eq!((window.start, window.end, window.len), (0, 3, 3));
        assert!((window.span - 0.3).abs() < 1e-6);
    }

    #[test]
    fn flux_invariants_hold_on_noisy_input() {
        let detector = feed(DetectorConfig::default(), &pseudo_random_flux(500));
        let samples = detector.samples();

        assert!(samples.iter().all(|s| s.raw_flux() >= 0.0));
        assert!(samples.iter().all(|s| s.pruned_flux() >= 0.0));
        assert!(!detector.peaks().is_empty());

        for pair in detector.peaks().windows(2) {
            assert!(pair[0].index < pair[1].index);
            assert!(pair[0].time() <= pair[1].time());
        }
        for peak in detector.peaks() {
            let sample = &samples[peak.index];
            assert!(sample.is_peak());
            assert!(sample.is_thresholded());
            assert!(samples[peak.index + 1].is_thresholded());
            assert_eq!(&peak.sample, sample);
        }
        assert_eq!(detector.peak_count(), detector.peaks().len());
    }

    #[test]
    fn filtered_threshold_is_unscaled_mean() {
        let detector = feed(DetectorConfig::default(), &spikes(200, &[]));
        let filtered = detector.filtered();

        // anchors at 53, 67, ... while the cursor reaches 174
        assert_eq!(filtered.len(), 9);
        assert_eq!(filtered[0].time, detector.samples()[77].time());
        for sample in filtered {
            assert!((sample.avg_flux - 1.0).abs() < 1e-6);
            // window mean, without the multiplier
            assert!((sample.threshold - 1.0).abs() < 1e-6);
            assert!(sample.pruned_flux.abs() < 1e-6);
        }
        assert!((detector.samples()[53].threshold() - 1.7).abs() < 1e-5);
    }

    #[test]
    fn filtered_pruned_flux_goes_negative() {
        // spike at 45 sits in the threshold window of anchor 53 but not in [53, 67)
        let detector = feed(DetectorConfig::default(), &spikes(120, &[45]));
        let first = &detector.filtered()[0];

        assert!((first.avg_flux - 1.0).abs() < 1e-6);
        assert!((first.threshold - 2.0).abs() < 1e-5);
        assert!((first.pruned_flux + 1.0).abs() < 1e-5);
        assert!(detector.samples().iter().all(|s| s.pruned_flux() >= 0.0));
    }

    #[test]
    fn filtered_sample_averages_forward_window() {
        let mut flux = spikes(120, &[]);
        for f in &mut flux[53..67] {
            *f = 3.0;
        }
        let detector = feed(DetectorConfig::default(), &flux);
        let first = &detector.filtered()[0];
        assert!((first.avg_flux - 3.0).abs() < 1e-6);
        // window [28, 77) holds fourteen 3.0s and thirty-five 1.0s
        assert!((first.threshold - 77.0 / 49.0).abs() < 1e-5);
        assert!((first.pruned_flux - (3.0 - 77.0 / 49.0)).abs() < 1e-5);
    }

    #[test]
    fn wrong_spectrum_length_is_rejected() {
        let mut detector = OnsetDetector::new(DetectorConfig {
            bin_count: 8,
            ..Default::default()
        })
        .unwrap();
        detector.analyze(&[1.0; 8], 0.0).unwrap();

        let err = detector.analyze(&[1.0; 7], 0.1).unwrap_err();
        assert_eq!(err, DetectorError::SpectrumLength { expected: 8, actual: 7 });
        assert_eq!(detector.len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = OnsetDetector::new(DetectorConfig {
            threshold_window_size: 7,
            ..Default::default()
        });
        assert!(matches!(result, Err(DetectorError::InvalidConfig(_))));
    }

    #[test]
    fn identical_input_gives_identical_history() {
        let flux = pseudo_random_flux(300);
        let a = feed(DetectorConfig::default(), &flux);
        let b = feed(DetectorConfig::default(), &flux);

        assert_eq!(a.samples(), b.samples());
        assert_eq!(a.filtered(), b.filtered());
        assert_eq!(a.peaks(), b.peaks());
    }
}
