use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

use super::decode::Track;

/// Magnitude spectrum of the audio around one playback tick.
#[derive(Clone, Debug)]
pub struct SpectrumFrame {
    pub time: f32,
    pub magnitudes: Vec<f32>,
}

/// One Hann-windowed spectrum per tick at `fps`, each `bin_count` bins wide.
///
/// The FFT is `2 * bin_count` samples long and centred on the tick time.
pub fn compute_spectra(track: &Track, fps: u32, bin_count: usize) -> Vec<SpectrumFrame> {
    let fft_size = bin_count * 2;
    let total_frames = (track.duration() * fps as f32).ceil() as usize;
    let samples_per_frame = track.sample_rate as f32 / fps as f32;

    let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
    let hann = hann_window(fft_size);
    let scale = 2.0 / fft_size as f32;

    log::info!(
        "Computing {} spectra ({} bins, {} fps)...",
        total_frames,
        bin_count,
        fps
    );

    (0..total_frames)
        .into_par_iter()
        .map(|frame_idx| {
            let center = (frame_idx as f32 * samples_per_frame) as usize;
            let start = center.saturating_sub(fft_size / 2);
            let end = (start + fft_size).min(track.samples.len());

            let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];
            for (i, slot) in buffer.iter_mut().enumerate().take(end.saturating_sub(start)) {
                *slot = Complex::new(track.samples[start + i] * hann[i], 0.0);
            }
            fft.process(&mut buffer);

            SpectrumFrame {
                time: frame_idx as f32 / fps as f32,
                magnitudes: buffer[..bin_count].iter().map(|c| c.norm() * scale).collect(),
            }
        })
        .collect()
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
