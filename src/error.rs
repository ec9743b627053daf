//! Error types for every stage of the pipeline.
//!
//! Decode and render errors are per-channel and never stop the loop.
//! Store errors mean the deployment is broken and are fatal.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::ChannelId;

/// Failure to turn a raw blob into a [`WaveDescriptor`](crate::WaveDescriptor).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("wave descriptor is empty")]
    EmptyInput,

    #[error("unknown wave type tag {0}")]
    UnknownTag(u8),

    /// Fewer bytes than the fixed header of the given tag.
    #[error("truncated header for tag {tag}: need {needed} bytes, have {available}")]
    TruncatedHeader {
        tag: u8,
        needed: usize,
        available: usize,
    },

    /// The declared sample payload runs past the end of the blob.
    #[error("truncated payload: declared {declared} bytes, have {available}")]
    TruncatedPayload { declared: usize, available: usize },
}

/// Failure of the channel snapshot source itself.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("channel directory {path:?} is inaccessible: {source}")]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("channel blob name {0:?} does not start with a channel number")]
    MalformedName(String),

    #[error("more than one blob maps to channel {0}")]
    DuplicateChannel(ChannelId),

    #[error("failed to read channel blob {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to open a rendering session for a channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("audio output device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("unsupported output sample format: {0}")]
    UnsupportedFormat(String),
}

/// Errors that abort the synchronization loop.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display() {
        assert_eq!(DecodeError::UnknownTag(9).to_string(), "unknown wave type tag 9");
        let err = DecodeError::TruncatedPayload {
            declared: 16,
            available: 3,
        };
        assert_eq!(err.to_string(), "truncated payload: declared 16 bytes, have 3");
    }

    #[test]
    fn store_error_converts_into_sync_error() {
        let err = StoreError::MalformedName("left.bin".to_string());
        let sync: SyncError = err.into();
        assert!(matches!(sync, SyncError::Store(StoreError::MalformedName(_))));
    }
}
