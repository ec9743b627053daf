//! Wave descriptors and their little-endian wire format.
//!
//! Every blob starts with a one-byte type tag followed by the common
//! envelope header:
//!
//! | offset | size | field    |
//! |--------|------|----------|
//! | 0      | 1    | tag      |
//! | 1      | 4    | age      |
//! | 5      | 4    | life     |
//! | 9      | 1    | volume   |
//! | 10     | 1    | envelope |
//!
//! Kind-specific fields follow in declaration order. [`Memory`] and [`Dpcm`]
//! carry a `u32` payload length (before `freq` for DPCM) and the payload
//! bytes come last. Trailing bytes after a complete descriptor are ignored.
//!
//! Decoding is purely structural: nothing is clamped or range-checked.

use core::fmt;

use crate::error::DecodeError;
use crate::render::Renderable;

/// Size of the tag plus the common envelope header.
const COMMON_LEN: usize = 1 + 4 + 4 + 1 + 1;

/// The six wave kinds, numbered by their wire tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WaveKind {
    Sign = 0,
    Pulse = 1,
    Triangle = 2,
    Noise = 3,
    Memory = 4,
    Dpcm = 5,
}

impl WaveKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => WaveKind::Sign,
            1 => WaveKind::Pulse,
            2 => WaveKind::Triangle,
            3 => WaveKind::Noise,
            4 => WaveKind::Memory,
            5 => WaveKind::Dpcm,
            _ => return None,
        })
    }

    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Bytes needed before any variable-length payload.
    pub fn header_len(self) -> usize {
        COMMON_LEN
            + match self {
                WaveKind::Sign | WaveKind::Triangle => 4,
                WaveKind::Pulse => 8,
                WaveKind::Noise => 1,
                WaveKind::Memory => 4,
                WaveKind::Dpcm => 8,
            }
    }
}

impl fmt::Display for WaveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaveKind::Sign => "Sign",
            WaveKind::Pulse => "Pulse",
            WaveKind::Triangle => "Triangle",
            WaveKind::Noise => "Noise",
            WaveKind::Memory => "Memory",
            WaveKind::Dpcm => "Dpcm",
        };
        f.write_str(name)
    }
}

/// Fields shared by every wave kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Envelope {
    pub age: u32,
    pub life: u32,
    /// Linear gain, 0 to 255.
    pub volume: u8,
    pub envelope: u8,
}

impl Envelope {
    /// Volume scaled to `[0, 1]`.
    #[inline]
    pub fn gain(&self) -> f32 {
        self.volume as f32 / 255.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sign {
    pub env: Envelope,
    pub freq: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pulse {
    pub env: Envelope,
    pub duty: f32,
    pub sweep: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Triangle {
    pub env: Envelope,
    pub freq: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Noise {
    pub env: Envelope,
    pub short_mode: bool,
}

/// Raw sample memory. The payload is fixed once decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct Memory {
    pub env: Envelope,
    pub data: Box<[u8]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dpcm {
    pub env: Envelope,
    pub data: Box<[u8]>,
    pub freq: f32,
}

/// Decoded state of one channel.
#[derive(Clone, Debug, PartialEq)]
pub enum WaveDescriptor {
    Sign(Sign),
    Pulse(Pulse),
    Triangle(Triangle),
    Noise(Noise),
    Memory(Memory),
    Dpcm(Dpcm),
}

impl WaveDescriptor {
    pub fn kind(&self) -> WaveKind {
        match self {
            WaveDescriptor::Sign(_) => WaveKind::Sign,
            WaveDescriptor::Pulse(_) => WaveKind::Pulse,
            WaveDescriptor::Triangle(_) => WaveKind::Triangle,
            WaveDescriptor::Noise(_) => WaveKind::Noise,
            WaveDescriptor::Memory(_) => WaveKind::Memory,
            WaveDescriptor::Dpcm(_) => WaveKind::Dpcm,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        match self {
            WaveDescriptor::Sign(w) => &w.env,
            WaveDescriptor::Pulse(w) => &w.env,
            WaveDescriptor::Triangle(w) => &w.env,
            WaveDescriptor::Noise(w) => &w.env,
            WaveDescriptor::Memory(w) => &w.env,
            WaveDescriptor::Dpcm(w) => &w.env,
        }
    }

    /// The synthesis capability of this descriptor, if its kind has one.
    ///
    /// Only [`Sign`] renders for now; every other kind decodes but stays silent.
    pub fn as_renderable(&self) -> Option<&dyn Renderable> {
        match self {
            WaveDescriptor::Sign(w) => Some(w),
            _ => None,
        }
    }

    /// Decode one blob.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (&tag, fields) = bytes.split_first().ok_or(DecodeError::EmptyInput)?;
        let kind = WaveKind::from_tag(tag).ok_or(DecodeError::UnknownTag(tag))?;

        let mut r = Reader::new(kind, fields, bytes.len());
        let env = r.envelope()?;

        let descriptor = match kind {
            WaveKind::Sign => WaveDescriptor::Sign(Sign { env, freq: r.f32()? }),
            WaveKind::Pulse => {
                let duty = r.f32()?;
                let sweep = r.f32()?;
                WaveDescriptor::Pulse(Pulse { env, duty, sweep })
            }
            WaveKind::Triangle => WaveDescriptor::Triangle(Triangle { env, freq: r.f32()? }),
            WaveKind::Noise => WaveDescriptor::Noise(Noise {
                env,
                short_mode: r.u8()? != 0,
            }),
            WaveKind::Memory => {
                let len = r.u32()? as usize;
                let data = r.payload(len)?;
                WaveDescriptor::Memory(Memory { env, data })
            }
            WaveKind::Dpcm => {
                let len = r.u32()? as usize;
                let freq = r.f32()?;
                let data = r.payload(len)?;
                WaveDescriptor::Dpcm(Dpcm { env, data, freq })
            }
        };

        Ok(descriptor)
    }

    /// Encode into the wire format accepted by [`decode`](Self::decode).
    pub fn encode(&self) -> Vec<u8> {
        let payload = match self {
            WaveDescriptor::Memory(w) => w.data.len(),
            WaveDescriptor::Dpcm(w) => w.data.len(),
            _ => 0,
        };
        let mut out = Vec::with_capacity(self.kind().header_len() + payload);

        out.push(self.kind().tag());
        let env = self.envelope();
        out.extend_from_slice(&env.age.to_le_bytes());
        out.extend_from_slice(&env.life.to_le_bytes());
        out.push(env.volume);
        out.push(env.envelope);

        match self {
            WaveDescriptor::Sign(w) => out.extend_from_slice(&w.freq.to_le_bytes()),
            WaveDescriptor::Pulse(w) => {
                out.extend_from_slice(&w.duty.to_le_bytes());
                out.extend_from_slice(&w.sweep.to_le_bytes());
            }
            WaveDescriptor::Triangle(w) => out.extend_from_slice(&w.freq.to_le_bytes()),
            WaveDescriptor::Noise(w) => out.push(w.short_mode as u8),
            WaveDescriptor::Memory(w) => {
                out.extend_from_slice(&(w.data.len() as u32).to_le_bytes());
                out.extend_from_slice(&w.data);
            }
            WaveDescriptor::Dpcm(w) => {
                out.extend_from_slice(&(w.data.len() as u32).to_le_bytes());
                out.extend_from_slice(&w.freq.to_le_bytes());
                out.extend_from_slice(&w.data);
            }
        }

        out
    }
}

/// Forward-only cursor over a descriptor body. Reads past the end yield `None`.
struct Reader<'a> {
    kind: WaveKind,
    total: usize,
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    /// `total` is the whole blob length, tag included, for error reports.
    fn new(kind: WaveKind, bytes: &'a [u8], total: usize) -> Self {
        Self { kind, total, bytes }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let (head, rest) = self
            .bytes
            .split_first_chunk::<N>()
            .ok_or(DecodeError::TruncatedHeader {
                tag: self.kind.tag(),
                needed: self.kind.header_len(),
                available: self.total,
            })?;
        self.bytes = rest;
        Ok(*head)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        self.take::<1>().map(|[b]| b)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        self.take().map(u32::from_le_bytes)
    }

    fn f32(&mut self) -> Result<f32, DecodeError> {
        self.take().map(f32::from_le_bytes)
    }

    fn envelope(&mut self) -> Result<Envelope, DecodeError> {
        Ok(Envelope {
            age: self.u32()?,
            life: self.u32()?,
            volume: self.u8()?,
            envelope: self.u8()?,
        })
    }

    fn payload(&mut self, declared: usize) -> Result<Box<[u8]>, DecodeError> {
        if self.bytes.len() < declared {
            return Err(DecodeError::TruncatedPayload {
                declared,
                available: self.bytes.len(),
            });
        }
        let (data, rest) = self.bytes.split_at(declared);
        self.bytes = rest;
        Ok(data.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Envelope {
        Envelope {
            age: 3,
            life: 60,
            volume: 128,
            envelope: 7,
        }
    }

    fn one_of_each() -> Vec<WaveDescriptor> {
        vec![
            WaveDescriptor::Sign(Sign { env: env(), freq: 440.0 }),
            WaveDescriptor::Pulse(Pulse {
                env: env(),
                duty: 1.5, // out of range on purpose, must survive decoding
                sweep: -0.25,
            }),
            WaveDescriptor::Triangle(Triangle { env: env(), freq: 220.0 }),
            WaveDescriptor::Noise(Noise {
                env: env(),
                short_mode: true,
            }),
            WaveDescriptor::Memory(Memory {
                env: env(),
                data: vec![1, 2, 3, 4, 5].into(),
            }),
            WaveDescriptor::Dpcm(Dpcm {
                env: env(),
                data: vec![0xff; 17].into(),
                freq: 33.0,
            }),
        ]
    }

    #[test]
    fn every_kind_survives_the_wire() {
        for wave in one_of_each() {
            let bytes = wave.encode();
            assert_eq!(bytes[0], wave.kind().tag());
            assert_eq!(WaveDescriptor::decode(&bytes).unwrap(), wave);
        }
    }

    #[test]
    fn sign_layout_is_little_endian() {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[200, 9]);
        bytes.extend_from_slice(&440.0f32.to_le_bytes());

        let wave = WaveDescriptor::decode(&bytes).unwrap();
        assert_eq!(
            wave,
            WaveDescriptor::Sign(Sign {
                env: Envelope {
                    age: 1,
                    life: 2,
                    volume: 200,
                    envelope: 9
                },
                freq: 440.0,
            })
        );
    }

    #[test]
    fn dpcm_length_precedes_freq() {
        let mut bytes = vec![5u8];
        bytes.extend_from_slice(&[0; 10]);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&100.0f32.to_le_bytes());
        bytes.extend_from_slice(&[0xaa, 0xbb]);

        match WaveDescriptor::decode(&bytes).unwrap() {
            WaveDescriptor::Dpcm(d) => {
                assert_eq!(d.freq, 100.0);
                assert_eq!(&*d.data, &[0xaa, 0xbb]);
            }
            other => panic!("expected dpcm, got {:?}", other),
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(WaveDescriptor::decode(&[]), Err(DecodeError::EmptyInput));
    }

    #[test]
    fn unknown_tag() {
        assert_eq!(WaveDescriptor::decode(&[9, 0, 0]), Err(DecodeError::UnknownTag(9)));
        assert_eq!(WaveDescriptor::decode(&[6]), Err(DecodeError::UnknownTag(6)));
    }

    #[test]
    fn every_short_header_is_rejected() {
        for wave in one_of_each() {
            let bytes = wave.encode();
            let needed = wave.kind().header_len();
            for len in 1..needed {
                assert_eq!(
                    WaveDescriptor::decode(&bytes[..len]),
                    Err(DecodeError::TruncatedHeader {
                        tag: wave.kind().tag(),
                        needed,
                        available: len,
                    }),
                    "{} cut at {}",
                    wave.kind(),
                    len
                );
            }
        }
    }

    #[test]
    fn short_payload_is_rejected() {
        let wave = WaveDescriptor::Memory(Memory {
            env: env(),
            data: vec![7; 8].into(),
        });
        let bytes = wave.encode();
        let cut = &bytes[..bytes.len() - 3];
        assert_eq!(
            WaveDescriptor::decode(cut),
            Err(DecodeError::TruncatedPayload {
                declared: 8,
                available: 5
            })
        );
    }

    #[test]
    fn huge_declared_length_does_not_allocate_or_panic() {
        let mut bytes = vec![4u8];
        bytes.extend_from_slice(&[0; 10]);
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            WaveDescriptor::decode(&bytes),
            Err(DecodeError::TruncatedPayload { available: 0, .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let wave = WaveDescriptor::Triangle(Triangle { env: env(), freq: 55.0 });
        let mut bytes = wave.encode();
        bytes.extend_from_slice(&[1, 2, 3]);
        assert_eq!(WaveDescriptor::decode(&bytes).unwrap(), wave);
    }

    #[test]
    fn any_nonzero_byte_is_short_mode() {
        let mut bytes = WaveDescriptor::Noise(Noise {
            env: env(),
            short_mode: false,
        })
        .encode();
        *bytes.last_mut().unwrap() = 0x80;
        match WaveDescriptor::decode(&bytes).unwrap() {
            WaveDescriptor::Noise(n) => assert!(n.short_mode),
            other => panic!("expected noise, got {:?}", other),
        }
    }

    #[test]
    fn only_sign_is_renderable() {
        for wave in one_of_each() {
            assert_eq!(wave.as_renderable().is_some(), wave.kind() == WaveKind::Sign);
        }
    }
}
