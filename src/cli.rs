use clap::Parser;
use std::path::PathBuf;

use crate::playback::PlaybackMode;

#[derive(Parser, Debug)]
#[command(name = "beatflux", about = "Spectral-flux beat detection synced to playback time")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Config file (defaults to ./beatflux.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Playback ticks per second; one spectrum is analyzed per tick
    #[arg(long)]
    pub fps: Option<u32>,

    /// Spectrum bins per frame
    #[arg(long)]
    pub bins: Option<usize>,

    /// Threshold sensitivity multiplier
    #[arg(short, long)]
    pub multiplier: Option<f32>,

    /// Threshold window size in frames (even)
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Filtered trace window size in frames
    #[arg(long)]
    pub filter_window: Option<usize>,

    /// Peak query offset and debounce, in seconds
    #[arg(long)]
    pub time_filter: Option<f32>,

    /// Analyze everything before playback, or ingest and query tick by tick
    #[arg(long, value_enum)]
    pub mode: Option<PlaybackMode>,

    /// Write samples, filtered trace, peaks and triggers as JSON
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Log every detected peak with its threshold window
    #[arg(long)]
    pub list_peaks: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}
