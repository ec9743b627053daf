//! CPAL-backed rendering engine

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use tracing::{debug, warn};

use crate::device::OutputDevice;
use crate::error::RenderError;
use crate::render::{RenderSession, RenderingEngine};
use crate::store::ChannelId;

/// Frames of scratch space per stream; larger callbacks are rendered in blocks.
const SCRATCH_FRAMES: usize = 4096;

/// Opens one output stream per session on a single device.
pub struct CpalEngine {
    device: OutputDevice,
}

impl CpalEngine {
    pub fn new(device: OutputDevice) -> Self {
        Self { device }
    }

    /// Engine on the system default output device.
    pub fn default_output() -> Result<Self, RenderError> {
        OutputDevice::default_output()
            .map(Self::new)
            .ok_or_else(|| RenderError::DeviceUnavailable("no default output device".into()))
    }

    pub fn device(&self) -> &OutputDevice {
        &self.device
    }
}

/// A running output stream.
///
/// The cpal stream lives on a dedicated thread so it can be built, played and
/// dropped in one place. Dropping this handle stops the stream and joins that
/// thread, so once it is gone the callback has run for the last time and the
/// device stream is closed.
pub struct CpalStream {
    stop: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        // dropping the sender wakes the stream thread even if the send is lost
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("audio stream thread panicked during shutdown");
            }
        }
    }
}

impl RenderingEngine for CpalEngine {
    type Stream = CpalStream;

    fn open(&mut self, channel: ChannelId, session: RenderSession) -> Result<CpalStream, RenderError> {
        let device = self.device.device().clone();
        let format = self.device.sample_format();
        let config = self.device.stream_config(session.sample_rate());

        let stream_config = config.clone();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), RenderError>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name(format!("wavesync-channel-{}", channel))
            .spawn(move || {
                let stream = match build_stream(&device, format, &stream_config, channel, session) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(RenderError::DeviceUnavailable(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Parked until the handle is closed or dropped.
                let _ = stop_rx.recv();
                if let Err(e) = stream.pause() {
                    debug!(channel = %channel, "pause before close failed: {}", e);
                }
                drop(stream);
            })
            .map_err(|e| RenderError::DeviceUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                debug!(channel = %channel, channels = config.channels, rate = config.sample_rate.0, "output stream open");
                Ok(CpalStream {
                    stop: Some(stop_tx),
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(RenderError::DeviceUnavailable(
                    "audio thread exited before the stream started".into(),
                ))
            }
        }
    }

    fn close(&mut self, channel: ChannelId, stream: CpalStream) {
        drop(stream);
        debug!(channel = %channel, "output stream closed");
    }
}

fn build_stream(
    device: &cpal::Device,
    format: SampleFormat,
    config: &StreamConfig,
    channel: ChannelId,
    session: RenderSession,
) -> Result<cpal::Stream, RenderError> {
    match format {
        SampleFormat::F32 => build_typed::<f32>(device, config, channel, session),
        SampleFormat::I16 => build_typed::<i16>(device, config, channel, session),
        SampleFormat::U16 => build_typed::<u16>(device, config, channel, session),
        other => Err(RenderError::UnsupportedFormat(format!("{:?}", other))),
    }
}

fn build_typed<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    channel: ChannelId,
    mut session: RenderSession,
) -> Result<cpal::Stream, RenderError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = (config.channels as usize).max(1);
    let mut scratch = vec![0.0f32; SCRATCH_FRAMES];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for block in data.chunks_mut(channels * SCRATCH_FRAMES) {
                    let mono = &mut scratch[..block.len().div_ceil(channels)];
                    session.render_into(mono);
                    spread_mono(mono, block, channels);
                }
            },
            move |err| warn!(channel = %channel, "audio stream error: {}", err),
            None,
        )
        .map_err(|e| RenderError::DeviceUnavailable(e.to_string()))
}

/// Copy each mono sample onto every channel of its interleaved frame.
/// A trailing partial frame gets the next sample on the channels it has.
fn spread_mono<T>(mono: &[f32], interleaved: &mut [T], channels: usize)
where
    T: SizedSample + FromSample<f32>,
{
    for (frame, &s) in interleaved.chunks_mut(channels).zip(mono) {
        frame.fill(T::from_sample(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_frames_repeat_the_mono_sample() {
        let mono = [0.25, -0.5, 1.0];
        let mut out = [0.0f32; 6];
        spread_mono(&mono, &mut out, 2);
        assert_eq!(out, [0.25, 0.25, -0.5, -0.5, 1.0, 1.0]);
    }

    #[test]
    fn partial_last_frame_is_filled() {
        let mono = [0.5, -0.5];
        let mut out = [0i16; 5];
        spread_mono(&mono, &mut out, 3);
        assert_eq!(out, [16384, 16384, 16384, -16384, -16384]);
    }

    #[test]
    fn mono_device_is_a_straight_copy() {
        let mono = [0.1, 0.2, 0.3, 0.4];
        let mut out = [0.0f32; 4];
        spread_mono(&mono, &mut out, 1);
        assert_eq!(out, mono);
    }
}
