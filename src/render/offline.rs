//! Device-less rendering engine.
//!
//! Sessions are parked in memory and only produce samples when asked through
//! an [`OfflineProbe`]. Useful for headless runs and for tests that need to
//! look at exactly what a channel would have played.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;

use crate::error::RenderError;
use crate::render::{RenderSession, RenderingEngine};
use crate::store::ChannelId;

/// Something an [`OfflineEngine`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    Opened(ChannelId),
    Closed(ChannelId),
    /// An open was refused because the engine was marked unavailable.
    Refused(ChannelId),
}

#[derive(Default)]
struct Shared {
    sessions: HashMap<ChannelId, RenderSession>,
    events: Vec<EngineEvent>,
}

/// Opaque handle to a parked session.
#[derive(Debug)]
pub struct OfflineStream {
    channel: ChannelId,
}

pub struct OfflineEngine {
    shared: Arc<Mutex<Shared>>,
    available: Arc<AtomicBool>,
}

impl OfflineEngine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A second view onto this engine that stays usable after the engine has
    /// been moved into a registry.
    pub fn probe(&self) -> OfflineProbe {
        OfflineProbe {
            shared: Arc::clone(&self.shared),
            available: Arc::clone(&self.available),
        }
    }
}

impl Default for OfflineEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RenderingEngine for OfflineEngine {
    type Stream = OfflineStream;

    fn open(&mut self, channel: ChannelId, session: RenderSession) -> Result<OfflineStream, RenderError> {
        let mut shared = lock(&self.shared);
        if !self.available.load(Ordering::Acquire) {
            shared.events.push(EngineEvent::Refused(channel));
            return Err(RenderError::DeviceUnavailable("offline engine marked unavailable".into()));
        }

        shared.sessions.insert(channel, session);
        shared.events.push(EngineEvent::Opened(channel));
        Ok(OfflineStream { channel })
    }

    fn close(&mut self, channel: ChannelId, stream: OfflineStream) {
        debug_assert_eq!(channel, stream.channel);
        let mut shared = lock(&self.shared);
        shared.sessions.remove(&stream.channel);
        shared.events.push(EngineEvent::Closed(stream.channel));
    }
}

/// Drives and inspects the sessions of an [`OfflineEngine`].
#[derive(Clone)]
pub struct OfflineProbe {
    shared: Arc<Mutex<Shared>>,
    available: Arc<AtomicBool>,
}

impl OfflineProbe {
    /// Pull one buffer from the channel's session, as an audio callback would.
    /// `None` once the session has been closed.
    pub fn render_buffer(&self, channel: ChannelId, frame_count: usize) -> Option<Vec<f32>> {
        lock(&self.shared)
            .sessions
            .get_mut(&channel)
            .map(|session| session.render_buffer(frame_count))
    }

    pub fn phase(&self, channel: ChannelId) -> Option<f64> {
        lock(&self.shared).sessions.get(&channel).map(RenderSession::phase)
    }

    pub fn is_open(&self, channel: ChannelId) -> bool {
        lock(&self.shared).sessions.contains_key(&channel)
    }

    pub fn open_count(&self) -> usize {
        lock(&self.shared).sessions.len()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        lock(&self.shared).events.clone()
    }

    /// Drain the recorded events.
    pub fn take_events(&self) -> Vec<EngineEvent> {
        core::mem::take(&mut lock(&self.shared).events)
    }

    /// Make every following open fail with `DeviceUnavailable`, or succeed again.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }
}
