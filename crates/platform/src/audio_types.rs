//! Audio domain newtypes for compile-time safety.
//!
//! These zero-cost abstractions prevent common errors:
//! - `SampleRateHz`: validates the 8000–192000 Hz range the SAI output supports
//! - `BlockFrames`: the engine's callback block size, bounded by the DMA buffer

use crate::dma_safety::{DEFAULT_BLOCK_FRAMES, MAX_BLOCK_FRAMES};

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

/// Output sample rate in Hz.
///
/// Valid range: 8000–192000 Hz. The sample image's own rate is recorded for
/// diagnostics only; no sample-rate conversion is performed, so a mismatched
/// image simply plays at the engine rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct SampleRateHz(u32);

impl SampleRateHz {
    /// Minimum supported sample rate: 8000 Hz (telephony).
    pub const MIN_HZ: u32 = 8_000;

    /// Maximum supported sample rate: 192000 Hz.
    pub const MAX_HZ: u32 = 192_000;

    /// 48 kHz, the rate the SAI master clock is derived for.
    pub const HZ_48000: Self = Self(48_000);

    /// Create a `SampleRateHz`, returning an error if out of 8000–192000 Hz.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `hz < 8000` or `hz > 192000`.
    pub fn new(hz: u32) -> Result<Self, OutOfRangeError> {
        if (Self::MIN_HZ..=Self::MAX_HZ).contains(&hz) {
            Ok(Self(hz))
        } else {
            Err(OutOfRangeError {
                value: hz,
                min: Self::MIN_HZ,
                max: Self::MAX_HZ,
            })
        }
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

// ── BlockFrames ──────────────────────────────────────────────────────────────

/// Number of stereo frames the engine asks for per callback.
///
/// Bounded to `1..=MAX_BLOCK_FRAMES` so a block always fits one half of the
/// SAI ping-pong DMA buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct BlockFrames(u16);

impl BlockFrames {
    /// The engine's default block: [`DEFAULT_BLOCK_FRAMES`] frames.
    pub const DEFAULT: Self = Self(DEFAULT_BLOCK_FRAMES);

    /// Create a `BlockFrames`, returning an error outside `1..=MAX_BLOCK_FRAMES`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `frames == 0` or `frames > MAX_BLOCK_FRAMES`.
    pub fn new(frames: u16) -> Result<Self, OutOfRangeError> {
        if frames == 0 || usize::from(frames) > MAX_BLOCK_FRAMES {
            Err(OutOfRangeError {
                value: u32::from(frames),
                min: 1,
                max: crate::flash::len_u32(MAX_BLOCK_FRAMES),
            })
        } else {
            Ok(Self(frames))
        }
    }

    /// Return the block size in frames.
    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}
