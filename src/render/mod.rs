//! Real-time rendering sessions.
//!
//! A [`RenderSession`] owns one [`Voice`] and its phase. Whatever drives the
//! audio device calls [`RenderSession::render_into`] once per hardware buffer;
//! nothing else touches the voice. The polling side only ever holds a
//! [`SessionControl`], which pushes parameter updates through a lock-free
//! queue that the session drains at the start of the next buffer.
//!
//! Engines decide where sessions run:
//! - [`OfflineEngine`] keeps them in memory and renders on demand
//! - `CpalEngine` gives each session its own output stream (requires the
//!   `cpal_output` feature)

mod offline;
mod sine;

#[cfg(feature = "cpal_output")]
mod cpal_output;

pub use offline::{EngineEvent, OfflineEngine, OfflineProbe, OfflineStream};
pub use sine::SineVoice;

#[cfg(feature = "cpal_output")]
pub use cpal_output::{CpalEngine, CpalStream};

use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::RenderError;
use crate::store::ChannelId;
use crate::wave::{WaveDescriptor, WaveKind};

/// Pending parameter updates a session can hold between two buffers.
const CONTROL_QUEUE_SIZE: usize = 16;

/// Information available while rendering one buffer.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Frames requested by this call
    pub buffer_size: usize,
}

/// Synthesis parameters shared by every renderable kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceParams {
    /// Hz
    pub frequency: f32,
    /// Linear gain in `[0, 1]`
    pub amplitude: f32,
}

/// Messages accepted by a running voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VoiceMessage {
    /// Replace frequency and amplitude without touching phase.
    Retune(VoiceParams),
}

/// A mono oscillator driven by the audio callback.
pub trait Voice: Send + 'static {
    /// Apply one parameter update. Called before [`process`](Self::process).
    fn handle(&mut self, msg: VoiceMessage);

    /// Fill `out` with the next `out.len()` samples.
    fn process(&mut self, ctx: &ProcessContext, out: &mut [f32]);

    /// Total phase travelled so far, in cycles. Never decreases.
    fn phase(&self) -> f64;
}

/// Descriptors that know how to synthesize themselves.
///
/// Implemented by [`Sign`](crate::wave::Sign) only. Other kinds are decoded
/// and tracked but have no voice yet.
pub trait Renderable {
    fn params(&self) -> VoiceParams;

    fn voice(&self) -> Box<dyn Voice>;
}

/// One live audio-producing unit, owned by whatever runs the audio callback.
pub struct RenderSession {
    voice: Box<dyn Voice>,
    messages: Consumer<VoiceMessage>,
    sample_rate: u32,
}

impl RenderSession {
    /// Wrap a voice, returning the session and the control half that stays on
    /// the polling side.
    pub fn new(voice: Box<dyn Voice>, sample_rate: u32) -> (Self, SessionControl) {
        let (sender, messages) = RingBuffer::new(CONTROL_QUEUE_SIZE);
        let session = Self {
            voice,
            messages,
            sample_rate,
        };
        (session, SessionControl { sender })
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn phase(&self) -> f64 {
        self.voice.phase()
    }

    /// Render one buffer in place. Does not allocate.
    pub fn render_into(&mut self, out: &mut [f32]) {
        while let Ok(msg) = self.messages.pop() {
            self.voice.handle(msg);
        }

        let ctx = ProcessContext {
            sample_rate: self.sample_rate,
            buffer_size: out.len(),
        };
        self.voice.process(&ctx, out);
    }

    /// Render `frame_count` samples into a fresh buffer.
    pub fn render_buffer(&mut self, frame_count: usize) -> Vec<f32> {
        let mut out = vec![0.0; frame_count];
        self.render_into(&mut out);
        out
    }
}

/// Polling-side half of a session.
pub struct SessionControl {
    sender: Producer<VoiceMessage>,
}

impl SessionControl {
    /// Queue a message for the next buffer. Returns it back if the queue is full.
    pub fn send(&mut self, msg: VoiceMessage) -> Result<(), VoiceMessage> {
        self.sender.push(msg).map_err(|rtrb::PushError::Full(m)| m)
    }

    pub fn retune(&mut self, renderable: &dyn Renderable) -> Result<(), VoiceMessage> {
        self.send(VoiceMessage::Retune(renderable.params()))
    }
}

/// A session that an engine is currently running.
pub struct LiveSession<S> {
    pub(crate) stream: S,
    pub(crate) control: SessionControl,
    pub(crate) kind: WaveKind,
}

impl<S> LiveSession<S> {
    pub fn kind(&self) -> WaveKind {
        self.kind
    }
}

/// The rendering state of a channel.
///
/// `Inert` is what non-renderable descriptors get: decoded, tracked, silent.
pub enum Session<S> {
    Inert,
    Live(LiveSession<S>),
}

impl<S> Session<S> {
    pub fn is_live(&self) -> bool {
        matches!(self, Session::Live(_))
    }
}

/// Opens and closes device streams for sessions.
pub trait RenderingEngine {
    /// Opaque handle to a running stream.
    type Stream;

    /// Start running `session` for `channel`.
    fn open(&mut self, channel: ChannelId, session: RenderSession) -> Result<Self::Stream, RenderError>;

    /// Stop a stream. Must not return until the session can never render
    /// again and every device resource it held is released.
    fn close(&mut self, channel: ChannelId, stream: Self::Stream);

    /// Start rendering `descriptor`, or return [`Session::Inert`] when its
    /// kind has no voice.
    fn start(
        &mut self,
        channel: ChannelId,
        descriptor: &WaveDescriptor,
        sample_rate: u32,
    ) -> Result<Session<Self::Stream>, RenderError> {
        let Some(renderable) = descriptor.as_renderable() else {
            return Ok(Session::Inert);
        };

        let (session, control) = RenderSession::new(renderable.voice(), sample_rate);
        let stream = self.open(channel, session)?;
        Ok(Session::Live(LiveSession {
            stream,
            control,
            kind: descriptor.kind(),
        }))
    }

    fn stop(&mut self, channel: ChannelId, session: Session<Self::Stream>) {
        if let Session::Live(live) = session {
            self.close(channel, live.stream);
        }
    }
}
