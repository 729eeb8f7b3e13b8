use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use beatflux::{DetectorConfig, FilteredSample, FluxSample, OnsetDetector, PeakEvent};

use crate::playback::Trigger;

#[derive(Serialize)]
pub struct Report<'a> {
    pub track: String,
    pub duration: f32,
    pub fps: u32,
    pub config: &'a DetectorConfig,
    pub samples: &'a [FluxSample],
    pub filtered: &'a [FilteredSample],
    pub peaks: &'a [PeakEvent],
    pub triggers: &'a [Trigger],
}

impl<'a> Report<'a> {
    pub fn new(
        track: &Path,
        duration: f32,
        fps: u32,
        detector: &'a OnsetDetector,
        triggers: &'a [Trigger],
    ) -> Self {
        Self {
            track: track.display().to_string(),
            duration,
            fps,
            config: detector.config(),
            samples: detector.samples(),
            filtered: detector.filtered(),
            peaks: detector.peaks(),
            triggers,
        }
    }
}

pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report: {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), report)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    log::info!("Report written to {}", path.display());
    Ok(())
}

/// One line per peak: flux values plus the window its threshold was averaged over.
pub fn describe_peak(detector: &OnsetDetector, peak: &PeakEvent) -> String {
    let sample = &peak.sample;
    let mut line = format!(
        "Peak at {:.2}s: pruned flux {:.4} ({:.4} over threshold {:.4})",
        sample.time(),
        sample.pruned_flux(),
        sample.raw_flux(),
        sample.threshold()
    );
    if let Some(window) = detector.threshold_window(peak.index) {
        line.push_str(&format!(
            ", window {:.2}-{:.2}s ({:.2}s, {} samples)",
            window.start_time, window.end_time, window.span, window.len
        ));
    }
    line
}

pub fn log_peaks(detector: &OnsetDetector) {
    for peak in detector.peaks() {
        log::info!("{}", describe_peak(detector, peak));
    }
}
