//! The synchronization loop.
//!
//! Each tick scans the channel source, drops channels that disappeared, then
//! walks the remaining channels in ascending order: unchanged blobs are
//! skipped, changed ones are decoded and pushed into the registry. Failures
//! stay with their channel; only a broken source stops the loop.

use std::collections::BTreeSet;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use tracing::{error, info, trace, warn};

use crate::config::SyncConfig;
use crate::error::{DecodeError, RenderError, SyncError};
use crate::fingerprint::{fingerprint, has_changed, Fingerprint};
use crate::registry::{ChannelRegistry, Transition};
use crate::render::RenderingEngine;
use crate::store::{ChannelId, ChannelSource};
use crate::wave::WaveDescriptor;

/// A per-channel failure during one tick. The channel keeps its prior state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFailure {
    Decode { channel: ChannelId, error: DecodeError },
    Render { channel: ChannelId, error: RenderError },
}

impl ChannelFailure {
    pub fn channel(&self) -> ChannelId {
        match self {
            ChannelFailure::Decode { channel, .. } | ChannelFailure::Render { channel, .. } => *channel,
        }
    }
}

/// Everything one tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub transitions: Vec<(ChannelId, Transition)>,
    pub failures: Vec<ChannelFailure>,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.transitions.is_empty() && self.failures.is_empty()
    }
}

pub struct Synchronizer<S: ChannelSource, E: RenderingEngine> {
    source: S,
    registry: ChannelRegistry<E>,
    poll_interval: Duration,
    /// Fingerprint of the last blob that failed to decode, per channel, so the
    /// same bad bytes are reported once rather than every tick.
    rejected: HashMap<ChannelId, Fingerprint>,
}

impl<S: ChannelSource, E: RenderingEngine> Synchronizer<S, E> {
    pub fn new(source: S, engine: E, config: &SyncConfig) -> Self {
        Self {
            source,
            registry: ChannelRegistry::new(engine, config.sample_rate()).with_policy(config.retrigger()),
            poll_interval: config.poll_interval(),
            rejected: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &ChannelRegistry<E> {
        &self.registry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run one scan-reconcile pass.
    pub fn tick(&mut self) -> Result<TickReport, SyncError> {
        let blobs = self.source.list_channels()?;
        let mut report = TickReport::default();

        let present: BTreeSet<ChannelId> = blobs.iter().map(|b| b.id).collect();
        for id in self.registry.active_channel_ids().difference(&present) {
            self.registry.remove(*id);
            info!(channel = %id, "[Channel {}] {}", id, Transition::Removed);
            report.transitions.push((*id, Transition::Removed));
        }
        self.rejected.retain(|id, _| present.contains(id));

        for blob in blobs {
            let id = blob.id;
            let digest = fingerprint(&blob.bytes);

            if !has_changed(id, &digest, &self.registry) {
                self.rejected.remove(&id);
                trace!(channel = %id, "unchanged");
                continue;
            }
            if self.rejected.get(&id) == Some(&digest) {
                continue;
            }

            let descriptor = match WaveDescriptor::decode(&blob.bytes) {
                Ok(descriptor) => descriptor,
                Err(error) => {
                    warn!(channel = %id, stage = "decode", fingerprint = %digest, "update skipped: {}", error);
                    self.rejected.insert(id, digest);
                    report.failures.push(ChannelFailure::Decode { channel: id, error });
                    continue;
                }
            };
            self.rejected.remove(&id);

            let kind = descriptor.kind();
            match self.registry.upsert(id, descriptor, digest) {
                Ok(transition) => {
                    info!(channel = %id, %kind, "[Channel {}] updated → {}: {}", id, kind, transition);
                    report.transitions.push((id, transition));
                }
                Err(error) => {
                    warn!(channel = %id, stage = "render", %kind, "could not start playback: {}", error);
                    report.failures.push(ChannelFailure::Render { channel: id, error });
                }
            }
        }

        Ok(report)
    }

    /// Tick at the configured interval until `shutdown` fires or its sender is
    /// dropped. Every session is stopped before returning, including when a
    /// fatal source error ends the loop.
    pub fn run(&mut self, shutdown: &Receiver<()>) -> Result<(), SyncError> {
        info!(interval = ?self.poll_interval, "synchronizing channels");

        let result = loop {
            let started = Instant::now();
            if let Err(e) = self.tick() {
                error!("channel source failed: {}", e);
                break Err(e);
            }

            let wait = self.poll_interval.saturating_sub(started.elapsed());
            match shutdown.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break Ok(()),
            }
        };

        self.shutdown();
        result
    }

    /// Stop every session and empty the registry.
    pub fn shutdown(&mut self) -> Vec<ChannelId> {
        let stopped = self.registry.shutdown();
        for id in &stopped {
            info!(channel = %id, "[Channel {}] stopped for shutdown", id);
        }
        self.rejected.clear();
        stopped
    }
}
