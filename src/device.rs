//! CPAL output device discovery.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedStreamConfig};

/// An audio output device and its preferred configuration.
///
/// Every rendering session opens its own stream on this device. Sessions are
/// mono; the sample is copied to every device channel.
pub struct OutputDevice {
    device: cpal::Device,
    config: SupportedStreamConfig,
    name: String,
}

impl OutputDevice {
    /// The system's default output device, or `None` if there is none.
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;
        let config = device.default_output_config().ok()?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());

        Some(Self {
            device,
            config,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device's preferred sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels()
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.config.sample_format()
    }

    pub(crate) fn device(&self) -> &cpal::Device {
        &self.device
    }

    /// Stream configuration for a session at `sample_rate`.
    pub(crate) fn stream_config(&self, sample_rate: u32) -> StreamConfig {
        StreamConfig {
            channels: self.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: BufferSize::Default,
        }
    }
}
