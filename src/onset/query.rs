//! Playback-time queries against detected peaks.
//!
//! Times are compared as integer buckets of `query_resolution` seconds,
//! rounded half to even. All positive answers share one debounce: a query
//! only succeeds if the last success was more than `time_filter` seconds ago.

use super::detector::OnsetDetector;

impl OnsetDetector {
    /// Whether a detected peak lines up with playback `time`.
    ///
    /// Peaks are found with a lag, so each one is shifted forward by
    /// `time_filter` before matching.
    pub fn is_next_peak(&mut self, time: f32) -> bool {
        if !self.debounce_elapsed(time) {
            return false;
        }
        let target = self.bucket(time);
        let offset = self.bucket(self.config.time_filter);
        let hit = self
            .peaks
            .iter()
            .any(|peak| self.bucket(peak.time()) + offset == target);
        if hit {
            self.last_detection = Some(time);
        }
        hit
    }

    /// Index of the first peak sample whose own time falls in `time`'s bucket.
    pub fn real_time_peak(&mut self, time: f32) -> Option<usize> {
        if !self.debounce_elapsed(time) {
            return None;
        }
        let target = self.bucket(time);
        let found = self
            .samples
            .iter()
            .position(|s| s.is_peak() && self.bucket(s.time()) == target)?;
        self.last_detection = Some(time);
        Some(found)
    }

    /// Index of the first filtered sample in `time`'s bucket.
    pub fn real_time_filtered(&mut self, time: f32) -> Option<usize> {
        if !self.debounce_elapsed(time) {
            return None;
        }
        let target = self.bucket(time);
        let found = self
            .filtered
            .iter()
            .position(|s| self.bucket(s.time) == target)?;
        self.last_detection = Some(time);
        Some(found)
    }

    /// Time of the last positive query answer, if any.
    pub fn last_detection(&self) -> Option<f32> {
        self.last_detection
    }

    fn debounce_elapsed(&self, time: f32) -> bool {
        self.last_detection
            .map_or(true, |last| last + self.config.time_filter < time)
    }

    fn bucket(&self, time: f32) -> i64 {
        (time * self.config.query_resolution.recip()).round_ties_even() as i64
    }
}
