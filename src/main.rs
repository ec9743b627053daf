//! Plays the channels an emulator writes into a directory.
//!
//! Run with: cargo run --release -- [channel-dir]
//!
//! The directory defaults to `.channel`. Set `RUST_LOG` to change verbosity.

use std::env;
use std::sync::mpsc::channel;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wavesync::{CpalEngine, DirSource, SyncConfig, Synchronizer};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = SyncConfig::default();
    if let Some(dir) = env::args().nth(1) {
        config = config.with_channel_dir(dir);
    }

    let (tx, rx) = channel();
    ctrlc::set_handler(move || _ = tx.send(())).context("unable to install interrupt handler")?;

    let engine = CpalEngine::default_output().context("unable to open the default output device")?;
    let device = engine.device();
    info!(
        device = device.name(),
        channels = device.channels(),
        "using audio output at {} Hz (device prefers {} Hz)",
        config.sample_rate(),
        device.sample_rate()
    );

    let source = DirSource::new(config.channel_dir());
    info!(dir = %source.root().display(), "watching channel directory");

    let mut sync = Synchronizer::new(source, engine, &config);
    sync.run(&rx).context("synchronization aborted")?;

    println!("\nStopped.");
    Ok(())
}
