//! Streaming sample converter: the real-time block callback.
//!
//! Owns the [`PlaybackBinding`] and the playback cursor. Each frame reads
//! one mono sample, normalizes it to `f32` and writes it to both output
//! channels, looping at the exact sample-count boundary. With no binding
//! every frame is `0.0`.
//!
//! No allocation, no locks, no panics: every payload access is a checked
//! `get`, and an unreadable sample plays as silence.

use platform::AudioCallback;

use crate::loader::PlaybackBinding;

/// Divisor for signed 16-bit samples (2^15).
const S16_FULL_SCALE: f32 = 32_768.0;

/// Divisor for signed 32-bit samples (2^31).
const S32_FULL_SCALE: f64 = 2_147_483_648.0;

/// Largest `f32` strictly below 1.0.
const BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0;

/// Normalize a signed 16-bit sample into `[-1.0, 1.0)`.
///
/// Exact: −32768 → −1.0, 32767 → 32767/32768.
pub fn normalize_s16(sample: i16) -> f32 {
    f32::from(sample) / S16_FULL_SCALE
}

/// Normalize a signed 32-bit sample into `[-1.0, 1.0)`.
///
/// The quotient is formed in `f64`. Values within 2^-25 of full scale would
/// round up to 1.0 in `f32`, so the result is capped just below it.
#[allow(clippy::cast_possible_truncation)] // f64 → f32 narrowing is the point
pub fn normalize_s32(sample: i32) -> f32 {
    ((f64::from(sample) / S32_FULL_SCALE) as f32).min(BELOW_ONE)
}

/// Block callback that loops a bound payload, or plays silence.
#[derive(Debug, Clone)]
pub struct StreamingConverter<'f> {
    binding: Option<PlaybackBinding<'f>>,
    cursor: usize,
}

impl<'f> StreamingConverter<'f> {
    /// Create a converter; `None` selects the silence fallback for good.
    pub fn new(binding: Option<PlaybackBinding<'f>>) -> Self {
        Self { binding, cursor: 0 }
    }

    /// Converter with no binding.
    pub fn silent() -> Self {
        Self::new(None)
    }

    /// Index of the next sample to be played.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The bound payload, if loading succeeded.
    pub fn binding(&self) -> Option<&PlaybackBinding<'f>> {
        self.binding.as_ref()
    }

    /// Produce the next mono value and advance the cursor.
    pub fn next_sample(&mut self) -> f32 {
        let Some(binding) = &self.binding else {
            return 0.0;
        };
        let count = binding.sample_count();
        if count == 0 {
            return 0.0;
        }
        if self.cursor >= count {
            self.cursor = 0;
        }
        let value = binding.sample(self.cursor).unwrap_or(0.0);
        self.cursor = match self.cursor.checked_add(1) {
            Some(next) if next < count => next,
            _ => 0,
        };
        value
    }
}

impl AudioCallback for StreamingConverter<'_> {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let value = self.next_sample();
            *l = value;
            *r = value;
        }
    }
}
