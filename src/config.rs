//! Runtime settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a channel does when its bytes change but its wave kind stays renderable
/// and the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RetriggerPolicy {
    /// Stop the session and start a new one. Phase restarts at zero, which is
    /// audible as a click on every update.
    Restart,
    /// Push the new frequency and volume to the running session. Phase carries on.
    #[default]
    Retune,
}

/// Settings for a [`Synchronizer`](crate::Synchronizer).
///
/// ```
/// use std::time::Duration;
/// use wavesync::{RetriggerPolicy, SyncConfig};
///
/// let config = SyncConfig::default()
///     .with_channel_dir("/tmp/emu/.channel")
///     .with_poll_interval(Duration::from_millis(10))
///     .with_retrigger(RetriggerPolicy::Restart);
/// assert_eq!(config.sample_rate(), 44_100);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    channel_dir: PathBuf,
    poll_interval: Duration,
    sample_rate: u32,
    retrigger: RetriggerPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_dir: PathBuf::from(".channel"),
            poll_interval: Duration::from_millis(16),
            sample_rate: 44_100,
            retrigger: RetriggerPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn with_channel_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.channel_dir = dir.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_retrigger(mut self, policy: RetriggerPolicy) -> Self {
        self.retrigger = policy;
        self
    }

    pub fn channel_dir(&self) -> &Path {
        &self.channel_dir
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn retrigger(&self) -> RetriggerPolicy {
        self.retrigger
    }
}
