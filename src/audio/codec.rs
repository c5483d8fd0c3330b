// G.711 μ-law codec for 8kHz telephony audio
//
// Every byte expands to exactly one 16-bit linear sample, so decoding is a
// table lookup with no state carried between frames.

use crate::error::CodecError;

/// Sample rate of narrowband telephony audio
pub const TELEPHONY_SAMPLE_RATE: u32 = 8000;

const BIAS: i32 = 0x84;
const CLIP: i32 = 32635;

/// Decode table for all 256 μ-law byte values
static DECODE_TABLE: [i16; 256] = build_decode_table();

const fn build_decode_table() -> [i16; 256] {
    let mut table = [0i16; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = expand(i as u8);
        i += 1;
    }
    table
}

const fn expand(byte: u8) -> i16 {
    let u = !byte;
    let exponent = (u >> 4) & 0x07;
    let mantissa = (u & 0x0F) as i32;
    let magnitude = (((mantissa << 3) + BIAS) << exponent) - BIAS;

    if u & 0x80 != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Encoding names a media stream may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    MuLaw,
}

impl AudioEncoding {
    /// Match a declared encoding name (e.g. `audio/x-mulaw`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "audio/x-mulaw" | "mulaw" | "ulaw" | "mu-law" | "pcmu" => Some(Self::MuLaw),
            _ => None,
        }
    }

    /// Bytes per encoded sample
    pub fn unit_size(&self) -> usize {
        match self {
            Self::MuLaw => 1,
        }
    }
}

/// Decode a single μ-law byte
#[inline]
pub fn decode_sample(byte: u8) -> i16 {
    DECODE_TABLE[byte as usize]
}

/// Encode a single linear sample as μ-law
pub fn encode_sample(sample: i16) -> u8 {
    let mut value = sample as i32;
    let sign = if value < 0 {
        value = -value;
        0x80
    } else {
        0x00
    };

    value = value.min(CLIP) + BIAS;

    // Position of the highest set bit above the mantissa selects the segment
    let mut exponent = 7;
    let mut mask = 0x4000;
    while exponent > 0 && value & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = (value >> (exponent + 3)) & 0x0F;
    !((sign | (exponent << 4) | mantissa) as u8)
}

/// Decode a μ-law frame into PCM16 samples
pub fn decode(frame: &[u8]) -> Result<Vec<i16>, CodecError> {
    if frame.is_empty() {
        return Err(CodecError::EmptyFrame);
    }

    Ok(frame.iter().map(|&b| decode_sample(b)).collect())
}

/// Decode a frame carrying `channels` interleaved streams
///
/// The frame must hold whole sample frames: its length has to be a multiple
/// of `unit_size() * channels`. A channel count of zero is treated as mono.
pub fn decode_interleaved(
    encoding: AudioEncoding,
    frame: &[u8],
    channels: u16,
) -> Result<Vec<i16>, CodecError> {
    let unit = encoding.unit_size() * usize::from(channels.max(1));
    if frame.len() % unit != 0 {
        return Err(CodecError::InvalidLength {
            len: frame.len(),
            unit,
        });
    }

    match encoding {
        AudioEncoding::MuLaw => decode(frame),
    }
}

/// Encode PCM16 samples as a μ-law frame
pub fn encode(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| encode_sample(s)).collect()
}

/// Serialize samples as little-endian PCM16 bytes
pub fn pcm_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
