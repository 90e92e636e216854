//! xtask inspect - run a packed image through the firmware's loader on the host.
//!
//! The image is placed at its partition offset in an erased (0xFF) flash
//! buffer and loaded exactly as the board does at boot, so a clean inspect
//! means the board will accept the image.

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use platform::qspi_config::partitions;
use platform::{AudioCallback, SliceFlash};
use playback::{load_sample, Diagnostics, LoadEvent, SampleFormat, StreamingConverter};
use tracing::Level;

use crate::image::ImagePrefix;

/// Forwards load events to `tracing`, mirroring the firmware's defmt levels.
pub struct TracingDiagnostics;

/// Level an event is logged at; the full trace stays visible at `info`.
pub fn event_level(event: &LoadEvent) -> Level {
    if event.is_rejection() {
        Level::ERROR
    } else {
        Level::INFO
    }
}

impl Diagnostics for TracingDiagnostics {
    fn record(&mut self, event: &LoadEvent) {
        if event_level(event) == Level::ERROR {
            tracing::error!("{event}");
        } else {
            tracing::info!("{event}");
        }
    }
}

/// What the loader saw in an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub sample_rate: u32,
    pub format: SampleFormat,
    pub sample_count: usize,
    pub peak: f32,
}

impl Report {
    /// Loop length in seconds at the image's own rate.
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count as f64 / f64::from(self.sample_rate)
    }
}

/// Verify the prefix, then load and play one full loop of `image`.
pub fn inspect_image<D: Diagnostics>(image: &[u8], diag: &mut D) -> Result<Report> {
    let prefix = ImagePrefix::decode(image)?;
    let body = image
        .get(partitions::IMAGE_PREFIX_BYTES as usize..)
        .context("image ends inside its prefix")?;
    prefix.verify(body)?;

    let mut flash_bytes = vec![0xFF; partitions::SAMPLE_IMAGE as usize];
    flash_bytes.extend_from_slice(image);
    let mut flash = SliceFlash::new(&flash_bytes);

    let binding = match load_sample(&mut flash, partitions::SAMPLE_HEADER, diag) {
        Ok(binding) => binding,
        Err(e) => bail!("the firmware would reject this image: {e}"),
    };
    let sample_count = binding.sample_count();
    let sample_rate = binding.sample_rate();
    let format = binding.format();

    // One loop through the real-time path, in engine-sized blocks.
    let mut converter = StreamingConverter::new(Some(binding));
    let mut left = [0.0f32; 48];
    let mut right = [0.0f32; 48];
    let mut peak = 0.0f32;
    let mut remaining = sample_count;
    while remaining > 0 {
        let n = remaining.min(left.len());
        let (Some(l), Some(r)) = (left.get_mut(..n), right.get_mut(..n)) else {
            break;
        };
        converter.process(l, r);
        peak = l.iter().fold(peak, |acc, s| acc.max(s.abs()));
        remaining = remaining.saturating_sub(n);
    }

    Ok(Report {
        sample_rate,
        format,
        sample_count,
        peak,
    })
}

pub fn run(path: &Path) -> Result<()> {
    println!();
    println!("{}", format!("🔍 Inspecting {}...", path.display()).cyan().bold());

    let image = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let report = inspect_image(&image, &mut TracingDiagnostics)?;

    println!("{}", "✓ Image accepted".green().bold());
    println!("   sample rate : {} Hz", report.sample_rate);
    println!("   format      : {}-bit PCM, mono", report.format.bits());
    println!(
        "   loop        : {} samples ({:.3}s)",
        report.sample_count,
        report.seconds()
    );
    println!("   peak        : {:.3}", report.peak);
    println!();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::gen_wav::{quantize, ToneSpec};
    use crate::image::pack_samples;
    use playback::diagnostics::EventLog;
    use playback::NullDiagnostics;

    fn tone_image(bits: u16) -> Vec<u8> {
        let spec = ToneSpec {
            seconds: 0.1,
            ..ToneSpec::DEFAULT
        };
        let samples: Vec<i32> = spec.samples().map(|s| quantize(s, bits)).collect();
        pack_samples(spec.sample_rate, bits, &samples).unwrap()
    }

    #[test]
    fn generated_tone_is_accepted_at_both_depths() {
        for bits in [16, 32] {
            let report = inspect_image(&tone_image(bits), &mut NullDiagnostics).unwrap();
            assert_eq!(report.sample_rate, 48_000);
            assert_eq!(report.format.bits(), bits);
            assert_eq!(report.sample_count, 4_800);
            assert!((report.peak - 0.5).abs() < 1e-3, "peak {}", report.peak);
            assert!((report.seconds() - 0.1).abs() < 1e-9);
        }
    }

    #[test]
    fn loader_events_are_reported() {
        let mut log = EventLog::new();
        inspect_image(&tone_image(16), &mut log).unwrap();
        assert_eq!(log.header_rows(), 11);
        assert!(matches!(log.events.last(), Some(LoadEvent::Accepted(_))));
    }

    #[test]
    fn header_trace_is_visible_at_default_filter() {
        let mut log = EventLog::new();
        inspect_image(&tone_image(32), &mut log).unwrap();
        assert!(log.events.iter().all(|e| event_level(e) == Level::INFO));

        let rejected = LoadEvent::Rejected(playback::LoadError::UnsupportedChannels(2));
        assert_eq!(event_level(&rejected), Level::ERROR);
    }

    #[test]
    fn tampered_header_fails_crc_before_loading() {
        let mut image = tone_image(16);
        image[12 + 12] = b'F'; // "fmt " -> "Fmt "
        let err = inspect_image(&image, &mut NullDiagnostics).unwrap_err();
        assert!(err.to_string().contains("CRC-32"));
    }

    #[test]
    fn bad_tag_with_valid_crc_is_a_loader_rejection() {
        let mut image = tone_image(16);
        image[12 + 12] = b'F';
        let body = image[12..].to_vec();
        image[..12].copy_from_slice(&ImagePrefix::for_body(&body).encode());

        let err = inspect_image(&image, &mut NullDiagnostics).unwrap_err();
        assert!(err.to_string().contains("reject"));
    }
}
