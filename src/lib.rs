//! wavesync - keep live audio in step with per-channel wave snapshots
//!
//! An external emulator writes one small binary blob per sound channel into a
//! directory. This crate polls that directory, decodes each blob into a
//! [`WaveDescriptor`], notices which channels changed, and keeps exactly one
//! real-time rendering session per renderable channel running on the audio
//! device.
//!
//! ```no_run
//! # #[cfg(feature = "cpal_output")]
//! # fn main() -> anyhow::Result<()> {
//! use std::sync::mpsc::channel;
//! use wavesync::{CpalEngine, DirSource, SyncConfig, Synchronizer};
//!
//! let config = SyncConfig::default();
//! let engine = CpalEngine::default_output()?;
//! let mut sync = Synchronizer::new(DirSource::new(config.channel_dir()), engine, &config);
//!
//! let (_stop, shutdown) = channel();
//! sync.run(&shutdown)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "cpal_output"))]
//! # fn main() {}
//! ```

mod config;
#[cfg(feature = "cpal_output")]
mod device;
mod error;
mod fingerprint;
mod registry;
pub mod render;
mod store;
mod sync;
pub mod wave;

pub use config::{RetriggerPolicy, SyncConfig};
#[cfg(feature = "cpal_output")]
pub use device::OutputDevice;
pub use error::{DecodeError, RenderError, StoreError, SyncError};
pub use fingerprint::{fingerprint, has_changed, Fingerprint};
pub use registry::{ChannelEntry, ChannelRegistry, Transition};
pub use render::{OfflineEngine, OfflineProbe, RenderSession, RenderingEngine, Session};
#[cfg(feature = "cpal_output")]
pub use render::CpalEngine;
pub use store::{parse_channel_name, ChannelBlob, ChannelId, ChannelSource, DirSource};
pub use sync::{ChannelFailure, Synchronizer, TickReport};
pub use wave::{WaveDescriptor, WaveKind};
