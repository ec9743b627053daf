//! Change detection for channel blobs.

use core::fmt;

use sha2::{Digest, Sha256};

use crate::registry::ChannelRegistry;
use crate::render::RenderingEngine;
use crate::store::ChannelId;

/// Digest of a channel blob. Only used to notice byte-level changes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // eight bytes are plenty to tell blobs apart in a log line
        for b in &self.0[..8] {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    Fingerprint::of(bytes)
}

/// True when the registry has never seen `channel`, or saw different bytes.
///
/// Never touches the registry; the caller records the new fingerprint once it
/// has acted on the change.
pub fn has_changed<E: RenderingEngine>(
    channel: ChannelId,
    digest: &Fingerprint,
    registry: &ChannelRegistry<E>,
) -> bool {
    registry
        .entry(channel)
        .map_or(true, |entry| entry.fingerprint() != digest)
}
