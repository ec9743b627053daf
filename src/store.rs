//! Channel snapshot sources.
//!
//! The producing process writes one blob per channel into a directory,
//! named by the decimal channel number (anything after the first `.` is
//! ignored, so `3` and `3.bin` both name channel 3). An empty blob means the
//! channel has not been written yet and is skipped.

use core::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::debug;

use crate::error::StoreError;

/// A numbered channel slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ChannelId(pub u32);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The current raw state of one channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelBlob {
    pub id: ChannelId,
    pub bytes: Vec<u8>,
}

/// Anything that can produce the current set of channel blobs.
pub trait ChannelSource {
    /// Every non-empty channel blob, in ascending channel order.
    fn list_channels(&self) -> Result<Vec<ChannelBlob>, StoreError>;
}

/// A directory of channel blobs.
#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Parse the channel number out of a blob's file name.
pub fn parse_channel_name(name: &str) -> Result<ChannelId, StoreError> {
    let malformed = || StoreError::MalformedName(name.to_string());
    let stem = name.split('.').next().unwrap_or_default();
    // `u32::from_str` would also take a leading '+'
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    stem.parse::<u32>().map(ChannelId).map_err(|_| malformed())
}

impl ChannelSource for DirSource {
    fn list_channels(&self) -> Result<Vec<ChannelBlob>, StoreError> {
        let inaccessible = |source: io::Error| StoreError::Inaccessible {
            path: self.root.clone(),
            source,
        };

        let mut blobs = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(inaccessible)? {
            let entry = entry.map_err(inaccessible)?;
            let name = entry.file_name();
            let name = name.to_string_lossy();

            // hidden files are never channels
            if name.starts_with('.') {
                continue;
            }
            match entry.file_type() {
                Ok(ty) if ty.is_file() => {}
                Ok(_) => continue,
                // gone since read_dir
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => return Err(StoreError::Read { path: entry.path(), source }),
            }

            let id = parse_channel_name(&name)?;
            let path = entry.path();
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(channel = %id, "blob vanished before it could be read");
                    continue;
                }
                Err(source) => return Err(StoreError::Read { path, source }),
            };

            if bytes.is_empty() {
                continue;
            }
            blobs.push(ChannelBlob { id, bytes });
        }

        let blobs: Vec<ChannelBlob> = blobs.into_iter().sorted_by_key(|b| b.id).collect();
        if let Some((a, _)) = blobs.iter().tuple_windows().find(|(a, b)| a.id == b.id) {
            return Err(StoreError::DuplicateChannel(a.id));
        }

        Ok(blobs)
    }
}
