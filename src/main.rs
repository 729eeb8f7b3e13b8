mod audio;
mod cli;
mod config;
mod playback;
mod report;

use anyhow::{Context, Result};
use clap::Parser;

use beatflux::OnsetDetector;
use cli::Cli;
use config::Config;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut config = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            // an explicitly requested config must load
            Err(err) if cli.config.is_some() => return Err(err),
            Err(err) => {
                log::warn!("{:#}", err);
                Config::default()
            }
        },
        None => Config::default(),
    };
    config.apply_cli(&cli);

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }
    if config.playback.fps == 0 {
        anyhow::bail!("fps must be at least 1");
    }

    log::info!("beatflux - spectral flux beat detection");
    log::info!("Input: {}", cli.input.display());
    log::info!(
        "Detector: {} bins, multiplier {:.2}, window {}, filter {}, time filter {:.2}s",
        config.detector.bin_count,
        config.detector.threshold_multiplier,
        config.detector.threshold_window_size,
        config.detector.filter_window_size,
        config.detector.time_filter
    );

    let mut detector =
        OnsetDetector::new(config.detector.clone()).context("Invalid detector configuration")?;

    // 1. Decode
    let track = audio::decode::decode_track(&cli.input)?;

    // 2. Spectra, one per playback tick
    let frames =
        audio::spectrum::compute_spectra(&track, config.playback.fps, config.detector.bin_count);

    // 3. Feed the detector and query it the way a spawner would
    log::info!("Playback mode: {:?} at {} fps", config.playback.mode, config.playback.fps);
    let triggers = playback::run(&mut detector, &frames, config.playback.mode, !cli.quiet)?;

    log::info!(
        "{} flux samples, {} filtered, {} peaks",
        detector.len(),
        detector.filtered().len(),
        detector.peak_count()
    );
    if cli.list_peaks {
        report::log_peaks(&detector);
    }

    // 4. Optional JSON dump
    if let Some(ref path) = cli.report {
        let report = report::Report::new(
            &cli.input,
            track.duration(),
            config.playback.fps,
            &detector,
            &triggers,
        );
        report::write_report(path, &report)?;
    }

    Ok(())
}
