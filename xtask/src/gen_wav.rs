//! xtask gen-wav - synthesize the mono test tone.
//!
//! The default is the demo sample the board expects out of the box:
//! 220 Hz, 48 kHz, mono, 0.5 amplitude, 1 second.

use std::f64::consts::TAU;
use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use hound::{SampleFormat, WavSpec, WavWriter};

/// Parameters of a pure sine tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: f64,
    pub sample_rate: u32,
    pub amplitude: f64,
    pub seconds: f64,
}

impl ToneSpec {
    pub const DEFAULT: Self = Self {
        frequency_hz: 220.0,
        sample_rate: 48_000,
        amplitude: 0.5,
        seconds: 1.0,
    };

    /// Number of samples the tone spans.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample_count(&self) -> usize {
        (f64::from(self.sample_rate) * self.seconds).max(0.0) as usize
    }

    /// Normalized samples in `[-amplitude, amplitude]`.
    #[allow(clippy::cast_precision_loss, clippy::arithmetic_side_effects)]
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        let step = TAU * self.frequency_hz / f64::from(self.sample_rate);
        (0..self.sample_count()).map(move |n| self.amplitude * (step * n as f64).sin())
    }
}

/// Scale a normalized sample to a signed integer of `bits` width.
#[allow(clippy::cast_possible_truncation, clippy::arithmetic_side_effects)]
pub fn quantize(sample: f64, bits: u16) -> i32 {
    let full_scale = match bits {
        16 => f64::from(i16::MAX),
        _ => f64::from(i32::MAX),
    };
    // `as` saturates, so a full-scale 1.0 cannot wrap.
    (sample.clamp(-1.0, 1.0) * full_scale).round() as i32
}

/// Write the tone to `path` as integer PCM.
pub fn write_tone(path: &Path, bits: u16, spec: &ToneSpec) -> Result<usize> {
    if bits != 16 && bits != 32 {
        bail!("unsupported bit depth {bits}: the player reads 16- or 32-bit PCM");
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let wav_spec = WavSpec {
        channels: 1,
        sample_rate: spec.sample_rate,
        bits_per_sample: bits,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, wav_spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut written = 0usize;
    for sample in spec.samples() {
        let value = quantize(sample, bits);
        if bits == 16 {
            writer.write_sample(i16::try_from(value).context("16-bit sample overflow")?)?;
        } else {
            writer.write_sample(value)?;
        }
        written = written.saturating_add(1);
    }
    writer.finalize().context("Failed to finalize WAV")?;

    tracing::debug!(path = %path.display(), samples = written, bits, "tone written");
    Ok(written)
}

pub fn run(out: &Path, bits: u16, spec: &ToneSpec) -> Result<()> {
    println!();
    println!(
        "{}",
        format!(
            "🎵 Generating {} Hz tone ({} Hz, {}-bit, {:.2}s)...",
            spec.frequency_hz, spec.sample_rate, bits, spec.seconds
        )
        .cyan()
        .bold()
    );

    let samples = write_tone(out, bits, spec)?;

    println!(
        "{}",
        format!("✓ Wrote {} ({} samples)", out.display(), samples).green()
    );
    println!(
        "   {}",
        format!("Next: cargo xtask flash-sample {}", out.display()).dimmed()
    );
    println!();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn default_tone_is_one_second_at_48k() {
        let spec = ToneSpec::DEFAULT;
        assert_eq!(spec.sample_count(), 48_000);
        assert_eq!(spec.samples().count(), 48_000);
    }

    #[test]
    fn tone_peaks_at_amplitude() {
        let peak = ToneSpec::DEFAULT
            .samples()
            .fold(0.0f64, |acc, s| acc.max(s.abs()));
        assert!((peak - 0.5).abs() < 1e-3, "peak {peak}");
    }

    #[test]
    fn tone_starts_at_zero_and_rises() {
        let first: Vec<f64> = ToneSpec::DEFAULT.samples().take(2).collect();
        assert_eq!(first[0], 0.0);
        assert!(first[1] > 0.0);
    }

    #[test]
    fn quantize_scales_per_bit_depth() {
        assert_eq!(quantize(0.5, 16), 16_384);
        assert_eq!(quantize(-1.0, 16), -32_767);
        assert_eq!(quantize(1.0, 32), i32::MAX);
        assert_eq!(quantize(2.0, 32), i32::MAX);
    }

    #[test]
    fn write_tone_rejects_other_depths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_tone(&dir.path().join("t.wav"), 24, &ToneSpec::DEFAULT).is_err());
    }

    #[test]
    fn write_tone_round_trips_through_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = ToneSpec {
            seconds: 0.01,
            ..ToneSpec::DEFAULT
        };
        let n = write_tone(&path, 16, &spec).unwrap();
        assert_eq!(n, 480);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len(), 480);
    }
}
