//! The channel registry.
//!
//! One entry per known channel holding its descriptor, the fingerprint of the
//! blob it came from, and its rendering session. The registry is the only
//! owner of sessions: every start and stop goes through it, and an old
//! session is always stopped before a new one is started for the same channel.

use core::fmt;
use std::collections::BTreeSet;

use hashbrown::HashMap;
use tracing::debug;

use crate::config::RetriggerPolicy;
use crate::error::RenderError;
use crate::fingerprint::Fingerprint;
use crate::render::{RenderingEngine, Session};
use crate::store::ChannelId;
use crate::wave::WaveDescriptor;

/// What an update did to a channel's session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// A session was started where none ran before.
    Started,
    /// The running session was stopped and a fresh one started.
    Restarted,
    /// The running session took the new parameters in place.
    Retuned,
    /// The running session was stopped; the new descriptor does not render.
    Silenced,
    /// Descriptor stored; nothing renders before or after.
    Recorded,
    /// The channel is gone and its session, if any, stopped.
    Removed,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Transition::Started => "started playback",
            Transition::Restarted => "restarted playback",
            Transition::Retuned => "retuned playback",
            Transition::Silenced => "stopped playback (not renderable)",
            Transition::Recorded => "recorded (not renderable)",
            Transition::Removed => "removed, playback stopped",
        };
        f.write_str(s)
    }
}

pub struct ChannelEntry<S> {
    channel: ChannelId,
    fingerprint: Fingerprint,
    descriptor: WaveDescriptor,
    session: Session<S>,
}

impl<S> ChannelEntry<S> {
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn descriptor(&self) -> &WaveDescriptor {
        &self.descriptor
    }

    /// Whether a session is currently producing audio for this channel.
    pub fn is_rendering(&self) -> bool {
        self.session.is_live()
    }
}

pub struct ChannelRegistry<E: RenderingEngine> {
    engine: E,
    sample_rate: u32,
    policy: RetriggerPolicy,
    entries: HashMap<ChannelId, ChannelEntry<E::Stream>>,
}

impl<E: RenderingEngine> ChannelRegistry<E> {
    pub fn new(engine: E, sample_rate: u32) -> Self {
        Self {
            engine,
            sample_rate,
            policy: RetriggerPolicy::default(),
            entries: HashMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: RetriggerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetriggerPolicy {
        self.policy
    }

    pub fn entry(&self, channel: ChannelId) -> Option<&ChannelEntry<E::Stream>> {
        self.entries.get(&channel)
    }

    /// Every channel that currently has an entry.
    pub fn active_channel_ids(&self) -> BTreeSet<ChannelId> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of channels with a live session.
    pub fn rendering_count(&self) -> usize {
        self.entries.values().filter(|e| e.session.is_live()).count()
    }

    /// Record a new descriptor for `channel` and bring its session in line.
    ///
    /// The descriptor and fingerprint are stored even when an error is
    /// returned; the channel then sits without a session until its bytes
    /// change again.
    pub fn upsert(
        &mut self,
        channel: ChannelId,
        descriptor: WaveDescriptor,
        fingerprint: Fingerprint,
    ) -> Result<Transition, RenderError> {
        let previous = self
            .entries
            .remove(&channel)
            .map_or(Session::Inert, |entry| entry.session);

        let (session, result) = self.reconcile(channel, previous, &descriptor);
        self.entries.insert(
            channel,
            ChannelEntry {
                channel,
                fingerprint,
                descriptor,
                session,
            },
        );
        result
    }

    fn reconcile(
        &mut self,
        channel: ChannelId,
        previous: Session<E::Stream>,
        descriptor: &WaveDescriptor,
    ) -> (Session<E::Stream>, Result<Transition, RenderError>) {
        let renderable = descriptor.as_renderable();
        let was_live = previous.is_live();

        let previous = match (previous, renderable) {
            (Session::Live(mut live), Some(r))
                if self.policy == RetriggerPolicy::Retune && live.kind == descriptor.kind() =>
            {
                match live.control.retune(r) {
                    Ok(()) => return (Session::Live(live), Ok(Transition::Retuned)),
                    Err(_) => {
                        debug!(channel = %channel, "control queue full, restarting session");
                        Session::Live(live)
                    }
                }
            }
            (previous, _) => previous,
        };

        // the old session is fully stopped before anything new opens
        self.engine.stop(channel, previous);

        if renderable.is_none() {
            let transition = if was_live {
                Transition::Silenced
            } else {
                Transition::Recorded
            };
            return (Session::Inert, Ok(transition));
        }

        match self.engine.start(channel, descriptor, self.sample_rate) {
            Ok(session) => {
                let transition = if was_live {
                    Transition::Restarted
                } else {
                    Transition::Started
                };
                (session, Ok(transition))
            }
            Err(e) => (Session::Inert, Err(e)),
        }
    }

    /// Stop the channel's session and forget it. Returns whether it existed.
    pub fn remove(&mut self, channel: ChannelId) -> bool {
        match self.entries.remove(&channel) {
            Some(entry) => {
                self.engine.stop(channel, entry.session);
                true
            }
            None => false,
        }
    }

    /// Remove every channel in ascending order, returning the ids removed.
    pub fn shutdown(&mut self) -> Vec<ChannelId> {
        let ids: Vec<ChannelId> = self.active_channel_ids().into_iter().collect();
        for &id in &ids {
            self.remove(id);
        }
        ids
    }
}

impl<E: RenderingEngine> Drop for ChannelRegistry<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
