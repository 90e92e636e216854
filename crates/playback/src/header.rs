//! 44-byte RIFF/WAVE container header.
//!
//! The header is decoded field by field from an owned byte buffer at fixed
//! little-endian offsets. Nothing here reinterprets memory, so alignment of
//! the source bytes never matters.
//!
//! | Offset | Size | Field             |
//! |--------|------|-------------------|
//! | 0      | 4    | `"RIFF"`          |
//! | 4      | 4    | RIFF chunk size   |
//! | 8      | 4    | `"WAVE"`          |
//! | 12     | 4    | `"fmt "`          |
//! | 16     | 4    | fmt chunk size    |
//! | 20     | 2    | format code       |
//! | 22     | 2    | channel count     |
//! | 24     | 4    | sample rate       |
//! | 28     | 4    | byte rate         |
//! | 32     | 2    | block align       |
//! | 34     | 2    | bits per sample   |
//! | 36     | 4    | `"data"`          |
//! | 40     | 4    | data size         |

use core::fmt;
use core::ops::Range;

/// Size of the container header in bytes.
pub const HEADER_LEN: usize = 44;

/// Format code for uncompressed linear PCM.
pub const FORMAT_PCM: u16 = 1;

/// Size of the canonical PCM `fmt ` chunk body.
pub const PCM_FMT_CHUNK_LEN: u32 = 16;

mod layout {
    use core::ops::Range;

    pub const RIFF: Range<usize> = 0..4;
    pub const RIFF_SIZE: Range<usize> = 4..8;
    pub const WAVE: Range<usize> = 8..12;
    pub const FMT: Range<usize> = 12..16;
    pub const FMT_SIZE: Range<usize> = 16..20;
    pub const FORMAT: Range<usize> = 20..22;
    pub const CHANNELS: Range<usize> = 22..24;
    pub const SAMPLE_RATE: Range<usize> = 24..28;
    pub const BYTE_RATE: Range<usize> = 28..32;
    pub const BLOCK_ALIGN: Range<usize> = 32..34;
    pub const BITS: Range<usize> = 34..36;
    pub const DATA: Range<usize> = 36..40;
    pub const DATA_SIZE: Range<usize> = 40..44;
}

/// One of the four magic tags in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tag {
    /// `"RIFF"` at offset 0.
    Riff,
    /// `"WAVE"` at offset 8.
    Wave,
    /// `"fmt "` at offset 12.
    Fmt,
    /// `"data"` at offset 36.
    Data,
}

impl Tag {
    /// Tags in the order they are validated.
    pub const ALL: [Self; 4] = [Self::Riff, Self::Wave, Self::Fmt, Self::Data];

    /// The exact bytes this tag must hold.
    pub const fn expected(self) -> [u8; 4] {
        match self {
            Self::Riff => *b"RIFF",
            Self::Wave => *b"WAVE",
            Self::Fmt => *b"fmt ",
            Self::Data => *b"data",
        }
    }

    /// Byte range of the tag within the header.
    pub fn range(self) -> Range<usize> {
        match self {
            Self::Riff => layout::RIFF,
            Self::Wave => layout::WAVE,
            Self::Fmt => layout::FMT,
            Self::Data => layout::DATA,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", FourCc(self.expected()))
    }
}

/// Displays four tag bytes as text, escaping anything outside printable ASCII.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCc(pub [u8; 4]);

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", char::from(b))?;
            } else {
                write!(f, "\\x{b:02X}")?;
            }
        }
        f.write_str("\"")
    }
}

/// Decoded container header.
///
/// Plain data: every field is exactly what the bytes said. Validation lives
/// in [`crate::loader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WavHeader {
    /// Bytes 0..4, expected `"RIFF"`.
    pub riff: [u8; 4],
    /// RIFF chunk size (file length − 8). Informational.
    pub riff_size: u32,
    /// Bytes 8..12, expected `"WAVE"`.
    pub wave: [u8; 4],
    /// Bytes 12..16, expected `"fmt "`.
    pub fmt: [u8; 4],
    /// `fmt ` chunk size. Informational.
    pub fmt_size: u32,
    /// Format code; [`FORMAT_PCM`] is the only accepted value.
    pub format: u16,
    /// Channel count; only mono is accepted.
    pub channels: u16,
    /// Sample rate in Hz. Informational.
    pub sample_rate: u32,
    /// Byte rate. Informational.
    pub byte_rate: u32,
    /// Block alignment. Informational.
    pub block_align: u16,
    /// Bits per sample; 16 or 32 are accepted.
    pub bits_per_sample: u16,
    /// Bytes 36..40, expected `"data"`.
    pub data: [u8; 4],
    /// Declared payload length in bytes.
    pub data_size: u32,
}

fn field<const N: usize>(bytes: &[u8; HEADER_LEN], at: Range<usize>) -> [u8; N] {
    // Every layout range lies inside the 44-byte buffer.
    bytes
        .get(at)
        .and_then(|s| <[u8; N]>::try_from(s).ok())
        .unwrap_or([0; N])
}

fn put(out: &mut [u8; HEADER_LEN], at: Range<usize>, value: &[u8]) {
    if let Some(dst) = out.get_mut(at) {
        dst.copy_from_slice(value);
    }
}

impl WavHeader {
    /// Decode a header from its 44 raw bytes.
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            riff: field(bytes, layout::RIFF),
            riff_size: u32::from_le_bytes(field(bytes, layout::RIFF_SIZE)),
            wave: field(bytes, layout::WAVE),
            fmt: field(bytes, layout::FMT),
            fmt_size: u32::from_le_bytes(field(bytes, layout::FMT_SIZE)),
            format: u16::from_le_bytes(field(bytes, layout::FORMAT)),
            channels: u16::from_le_bytes(field(bytes, layout::CHANNELS)),
            sample_rate: u32::from_le_bytes(field(bytes, layout::SAMPLE_RATE)),
            byte_rate: u32::from_le_bytes(field(bytes, layout::BYTE_RATE)),
            block_align: u16::from_le_bytes(field(bytes, layout::BLOCK_ALIGN)),
            bits_per_sample: u16::from_le_bytes(field(bytes, layout::BITS)),
            data: field(bytes, layout::DATA),
            data_size: u32::from_le_bytes(field(bytes, layout::DATA_SIZE)),
        }
    }

    /// Encode the header back into its 44-byte wire form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        put(&mut out, layout::RIFF, &self.riff);
        put(&mut out, layout::RIFF_SIZE, &self.riff_size.to_le_bytes());
        put(&mut out, layout::WAVE, &self.wave);
        put(&mut out, layout::FMT, &self.fmt);
        put(&mut out, layout::FMT_SIZE, &self.fmt_size.to_le_bytes());
        put(&mut out, layout::FORMAT, &self.format.to_le_bytes());
        put(&mut out, layout::CHANNELS, &self.channels.to_le_bytes());
        put(&mut out, layout::SAMPLE_RATE, &self.sample_rate.to_le_bytes());
        put(&mut out, layout::BYTE_RATE, &self.byte_rate.to_le_bytes());
        put(&mut out, layout::BLOCK_ALIGN, &self.block_align.to_le_bytes());
        put(&mut out, layout::BITS, &self.bits_per_sample.to_le_bytes());
        put(&mut out, layout::DATA, &self.data);
        put(&mut out, layout::DATA_SIZE, &self.data_size.to_le_bytes());
        out
    }

    /// Canonical mono PCM header for a payload of `data_size` bytes.
    ///
    /// Derived fields (`byte_rate`, `block_align`, `riff_size`) are filled in
    /// the way common writers do; the loader does not check them.
    pub fn pcm_mono(sample_rate: u32, bits_per_sample: u16, data_size: u32) -> Self {
        let bytes_per_sample = bits_per_sample / 8;
        Self {
            riff: Tag::Riff.expected(),
            riff_size: data_size.saturating_add(36),
            wave: Tag::Wave.expected(),
            fmt: Tag::Fmt.expected(),
            fmt_size: PCM_FMT_CHUNK_LEN,
            format: FORMAT_PCM,
            channels: 1,
            sample_rate,
            byte_rate: sample_rate.saturating_mul(u32::from(bytes_per_sample)),
            block_align: bytes_per_sample,
            bits_per_sample,
            data: Tag::Data.expected(),
            data_size,
        }
    }

    /// The bytes currently held in the slot of `tag`.
    pub fn tag(&self, tag: Tag) -> [u8; 4] {
        match tag {
            Tag::Riff => self.riff,
            Tag::Wave => self.wave,
            Tag::Fmt => self.fmt,
            Tag::Data => self.data,
        }
    }

    /// Overwrite the slot of `tag`.
    pub fn set_tag(&mut self, tag: Tag, bytes: [u8; 4]) {
        match tag {
            Tag::Riff => self.riff = bytes,
            Tag::Wave => self.wave = bytes,
            Tag::Fmt => self.fmt = bytes,
            Tag::Data => self.data = bytes,
        }
    }
}
