//! Audio engine abstraction
//!
//! The audio engine (SAI + DMA on hardware) owns the output timing. It calls
//! back into application code once per block with one `f32` buffer per
//! output channel. The callback must finish before the next DMA half-transfer
//! completes: no allocation, no blocking, no waiting on locks.

use crate::audio_types::{BlockFrames, OutOfRangeError, SampleRateHz};

/// Block callback driven by the audio engine.
///
/// The engine hands over non-interleaved channel buffers of equal length,
/// with samples in `[-1.0, 1.0)`. Implementations are owned by the audio
/// task for the whole run, so `&mut self` state needs no synchronization.
pub trait AudioCallback {
    /// Fill `left` and `right` with the next block of output frames.
    fn process(&mut self, left: &mut [f32], right: &mut [f32]);
}

impl<T: AudioCallback + ?Sized> AudioCallback for &mut T {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        (**self).process(left, right);
    }
}

/// Calling contract fixed by the audio engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// Output sample rate.
    pub sample_rate: SampleRateHz,
    /// Frames per callback block.
    pub block_frames: BlockFrames,
}

impl EngineConfig {
    /// Build a config from raw values.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if either value is out of range.
    pub fn new(sample_rate_hz: u32, block_frames: u16) -> Result<Self, OutOfRangeError> {
        Ok(Self {
            sample_rate: SampleRateHz::new(sample_rate_hz)?,
            block_frames: BlockFrames::new(block_frames)?,
        })
    }

    /// Block length as a `usize`, for slicing scratch buffers.
    pub fn block_len(&self) -> usize {
        usize::from(self.block_frames.get())
    }

    /// Duration of one block in microseconds (the callback deadline).
    pub fn block_period_us(&self) -> u32 {
        u32::from(self.block_frames.get())
            .saturating_mul(1_000_000)
            .checked_div(self.sample_rate.get())
            .unwrap_or(0)
    }
}

impl Default for EngineConfig {
    /// 48 kHz, 48-frame blocks (1 ms callback period).
    fn default() -> Self {
        Self {
            sample_rate: SampleRateHz::HZ_48000,
            block_frames: BlockFrames::DEFAULT,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_48khz_48_frames() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.sample_rate.get(), 48_000);
        assert_eq!(cfg.block_len(), 48);
    }

    #[test]
    fn default_block_period_is_one_millisecond() {
        assert_eq!(EngineConfig::default().block_period_us(), 1_000);
    }

    #[test]
    fn config_rejects_zero_block() {
        assert!(EngineConfig::new(48_000, 0).is_err());
        assert!(EngineConfig::new(48_000, 4096).is_err());
        assert!(EngineConfig::new(1_000, 48).is_err());
        assert!(EngineConfig::new(44_100, 64).is_ok());
    }
}
