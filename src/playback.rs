use anyhow::{Context, Result};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use beatflux::OnsetDetector;

use crate::audio::spectrum::SpectrumFrame;

/// How spectra reach the detector relative to the playback clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Analyze the whole track first, then play it back querying peaks
    #[default]
    Offline,
    /// Ingest and query on the same tick, as a live audio source would
    Live,
}

/// A playback tick at which the detector reported a beat.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trigger {
    pub tick: usize,
    pub time: f32,
}

pub fn run(
    detector: &mut OnsetDetector,
    frames: &[SpectrumFrame],
    mode: PlaybackMode,
    show_progress: bool,
) -> Result<Vec<Trigger>> {
    let pb = progress_bar(frames.len(), show_progress)?;

    let triggers = match mode {
        PlaybackMode::Offline => {
            pb.set_message("analyzing");
            for frame in frames {
                detector.analyze(&frame.magnitudes, frame.time)?;
                pb.inc(1);
            }
            pb.reset();
            pb.set_message("playing");
            tick_queries(detector, frames.iter().map(|f| f.time), &pb)
        }
        PlaybackMode::Live => {
            pb.set_message("live");
            let mut triggers = Vec::new();
            for (tick, frame) in frames.iter().enumerate() {
                detector.analyze(&frame.magnitudes, frame.time)?;
                if detector.is_next_peak(frame.time) {
                    triggers.push(Trigger { tick, time: frame.time });
                }
                pb.inc(1);
            }
            triggers
        }
    };

    pb.finish_and_clear();
    log::info!(
        "Playback done: {} peaks detected, {} triggers fired",
        detector.peaks().len(),
        triggers.len()
    );
    Ok(triggers)
}

fn tick_queries(
    detector: &mut OnsetDetector,
    times: impl Iterator<Item = f32>,
    pb: &ProgressBar,
) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    for (tick, time) in times.enumerate() {
        if detector.is_next_peak(time) {
            log::debug!("Trigger at tick {} ({:.2}s)", tick, time);
            triggers.push(Trigger { tick, time });
        }
        pb.inc(1);
    }
    triggers
}

fn progress_bar(len: usize, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {msg:>9} {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatflux::DetectorConfig;

    const FPS: f32 = 10.0;

    /// Two-bin frames whose first bin rises by 1.0 per tick and by 50.0 on `spike`.
    fn frames_with_spike(len: usize, spike: usize) -> Vec<SpectrumFrame> {
        let mut level = 0.0f32;
        (0..len)
            .map(|i| {
                level += if i == spike { 50.0 } else { 1.0 };
                SpectrumFrame {
                    time: i as f32 / FPS,
                    magnitudes: vec![level, 0.0],
                }
            })
            .collect()
    }

    fn detector(window: usize) -> OnsetDetector {
        OnsetDetector::new(DetectorConfig {
            bin_count: 2,
            threshold_window_size: window,
            filter_window_size: 2,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn offline_fires_time_filter_after_peak() {
        let mut detector = detector(50);
        let frames = frames_with_spike(200, 100);

        let triggers = run(&mut detector, &frames, PlaybackMode::Offline, false).unwrap();

        assert_eq!(detector.peaks().len(), 1);
        assert_eq!(triggers, vec![Trigger { tick: 102, time: frames[102].time }]);
    }

    #[test]
    fn live_misses_peaks_when_lag_exceeds_time_filter() {
        // peak at 100 is found at tick 125, long after its 10.2s query bucket
        let mut detector = detector(50);
        let frames = frames_with_spike(200, 100);

        let triggers = run(&mut detector, &frames, PlaybackMode::Live, false).unwrap();

        assert_eq!(detector.peaks().len(), 1);
        assert!(triggers.is_empty());
    }

    #[test]
    fn live_fires_with_short_window() {
        // window 4 confirms the peak at tick 102, the tick its query bucket comes up
        let mut detector = detector(4);
        let frames = frames_with_spike(200, 100);

        let triggers = run(&mut detector, &frames, PlaybackMode::Live, false).unwrap();

        assert_eq!(triggers, vec![Trigger { tick: 102, time: frames[102].time }]);
    }

    #[test]
    fn wrong_bin_count_aborts_playback() {
        let mut detector = detector(50);
        let mut frames = frames_with_spike(60, 30);
        frames[10].magnitudes.push(0.0);

        assert!(run(&mut detector, &frames, PlaybackMode::Offline, false).is_err());
        assert_eq!(detector.len(), 10);
    }
}
