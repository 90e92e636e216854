//! Container parser and validator.
//!
//! Runs once at boot. Reads the 44-byte header through the flash region's
//! coherent read, validates it in a fixed order and, on success, maps the
//! payload into a [`PlaybackBinding`] that the streaming converter owns for
//! the rest of the run.
//!
//! Validation order (first failure wins, nothing after it runs):
//!
//! 1. tags `"RIFF"`, `"WAVE"`, `"fmt "`, `"data"`
//! 2. format code == 1 (PCM)
//! 3. channel count == 1
//! 4. bits per sample ∈ {16, 32}
//!
//! `data_size` is trusted as declared. The only bound applied is the one the
//! flash region itself enforces: a payload running past the end of the
//! mapped window is reported as [`LoadError::Flash`].

use platform::flash::len_u32;
use platform::FlashRegion;

use crate::diagnostics::{Diagnostics, LoadEvent, LoadSummary};
use crate::error::LoadError;
use crate::header::{Tag, WavHeader, FORMAT_PCM, HEADER_LEN};

/// Sample encoding of an accepted payload.
///
/// Only the two accepted depths exist, so the converter can never meet an
/// unknown encoding at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleFormat {
    /// Signed 16-bit little-endian.
    S16,
    /// Signed 32-bit little-endian.
    S32,
}

impl SampleFormat {
    /// Map a header bit depth to a format.
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            16 => Some(Self::S16),
            32 => Some(Self::S32),
            _ => None,
        }
    }

    /// Bytes per sample.
    pub const fn bytes(self) -> usize {
        match self {
            Self::S16 => 2,
            Self::S32 => 4,
        }
    }

    /// Bits per sample.
    pub const fn bits(self) -> u16 {
        match self {
            Self::S16 => 16,
            Self::S32 => 32,
        }
    }
}

/// Validated payload window. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackBinding<'f> {
    payload: &'f [u8],
    format: SampleFormat,
    sample_rate: u32,
    payload_offset: u32,
}

impl<'f> PlaybackBinding<'f> {
    /// Bind a payload directly, without a header (tests, tone tables).
    pub fn new(payload: &'f [u8], format: SampleFormat, sample_rate: u32) -> Self {
        Self {
            payload,
            format,
            sample_rate,
            payload_offset: 0,
        }
    }

    /// Raw payload bytes.
    pub fn payload(&self) -> &'f [u8] {
        self.payload
    }

    /// Sample encoding.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Sample rate declared by the header. Informational only.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Flash offset of the first payload byte.
    pub fn payload_offset(&self) -> u32 {
        self.payload_offset
    }

    /// Whole samples in the payload; a trailing partial sample is ignored.
    pub fn sample_count(&self) -> usize {
        self.payload
            .len()
            .checked_div(self.format.bytes())
            .unwrap_or(0)
    }

    /// Normalized value of sample `index`, or `None` past the end.
    pub fn sample(&self, index: usize) -> Option<f32> {
        let width = self.format.bytes();
        let start = index.checked_mul(width)?;
        let bytes = self.payload.get(start..start.checked_add(width)?)?;
        match self.format {
            SampleFormat::S16 => {
                let raw = <[u8; 2]>::try_from(bytes).ok()?;
                Some(crate::converter::normalize_s16(i16::from_le_bytes(raw)))
            }
            SampleFormat::S32 => {
                let raw = <[u8; 4]>::try_from(bytes).ok()?;
                Some(crate::converter::normalize_s32(i32::from_le_bytes(raw)))
            }
        }
    }
}

fn reject<D: Diagnostics>(diag: &mut D, err: LoadError) -> LoadError {
    diag.record(&LoadEvent::Rejected(err));
    err
}

/// Check a decoded header and return its sample format.
///
/// Emits `TagOk` per tag and `Fields` once all tags pass; on failure emits
/// `Rejected` and returns the matching error.
///
/// # Errors
///
/// The first failing check, as a [`LoadError`].
pub fn validate<D: Diagnostics>(header: &WavHeader, diag: &mut D) -> Result<SampleFormat, LoadError> {
    for tag in Tag::ALL {
        let found = header.tag(tag);
        if found != tag.expected() {
            return Err(reject(
                diag,
                LoadError::BadTag {
                    field: tag,
                    expected: tag.expected(),
                    found,
                },
            ));
        }
        diag.record(&LoadEvent::TagOk(tag));
    }
    diag.record(&LoadEvent::Fields(*header));

    if header.format != FORMAT_PCM {
        return Err(reject(diag, LoadError::UnsupportedFormat(header.format)));
    }
    if header.channels != 1 {
        return Err(reject(diag, LoadError::UnsupportedChannels(header.channels)));
    }
    SampleFormat::from_bits(header.bits_per_sample)
        .ok_or_else(|| reject(diag, LoadError::UnsupportedBitDepth(header.bits_per_sample)))
}

/// Read, validate and bind the sample image whose header starts at
/// `header_offset` within `flash`.
///
/// # Errors
///
/// Returns [`LoadError`] for a malformed or unsupported header, or when the
/// flash region cannot serve the header or payload range. A `Rejected` event
/// naming the cause has been recorded by then.
pub fn load_sample<'f, F, D>(
    flash: &mut F,
    header_offset: u32,
    diag: &mut D,
) -> Result<PlaybackBinding<'f>, LoadError>
where
    F: FlashRegion<'f>,
    D: Diagnostics,
{
    diag.record(&LoadEvent::Reading {
        offset: header_offset,
    });

    let mut raw = [0u8; HEADER_LEN];
    flash
        .read_coherent(header_offset, &mut raw)
        .map_err(|e| reject(diag, e.into()))?;

    for (row, chunk) in raw.chunks_exact(4).enumerate() {
        if let Ok(bytes) = <[u8; 4]>::try_from(chunk) {
            let offset = u8::try_from(row.saturating_mul(4)).unwrap_or(u8::MAX);
            diag.record(&LoadEvent::HeaderRow { offset, bytes });
        }
    }

    let header = WavHeader::decode(&raw);
    let format = validate(&header, diag)?;

    let payload_offset = header_offset
        .checked_add(len_u32(HEADER_LEN))
        .ok_or_else(|| {
            reject(
                diag,
                LoadError::Flash(platform::FlashError::OutOfBounds {
                    offset: header_offset,
                    len: len_u32(HEADER_LEN),
                    capacity: flash.capacity(),
                }),
            )
        })?;
    let payload = flash
        .map_coherent(payload_offset, header.data_size)
        .map_err(|e| reject(diag, e.into()))?;

    diag.record(&LoadEvent::Accepted(LoadSummary {
        sample_rate: header.sample_rate,
        channels: header.channels,
        bits_per_sample: format.bits(),
        data_size: header.data_size,
    }));

    Ok(PlaybackBinding {
        payload,
        format,
        sample_rate: header.sample_rate,
        payload_offset,
    })
}
