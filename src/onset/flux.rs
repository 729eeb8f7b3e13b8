use crate::error::{DetectorError, Result};

/// The two most recent magnitude spectra. Older frames are not kept.
#[derive(Debug, Clone)]
pub struct SpectrumHistory {
    current: Vec<f32>,
    previous: Vec<f32>,
}

impl SpectrumHistory {
    pub fn new(bin_count: usize) -> Self {
        Self {
            current: vec![0.0; bin_count],
            previous: vec![0.0; bin_count],
        }
    }

    pub fn bin_count(&self) -> usize {
        self.current.len()
    }

    /// Shifts current into previous and stores `spectrum` as current.
    pub fn push(&mut self, spectrum: &[f32]) -> Result<()> {
        if spectrum.len() != self.current.len() {
            return Err(DetectorError::SpectrumLength {
                expected: self.current.len(),
                actual: spectrum.len(),
            });
        }
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.copy_from_slice(spectrum);
        Ok(())
    }

    /// Sum of positive bin-wise changes between previous and current.
    pub fn rectified_flux(&self) -> f32 {
        self.current
            .iter()
            .zip(self.previous.iter())
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum()
    }
}
