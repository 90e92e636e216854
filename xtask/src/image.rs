//! xtask pack - turn a WAV file into the flash image the firmware reads.
//!
//! ```text
//! +0   "WAVH"
//! +4   u32 LE  body length (header + payload)
//! +8   u32 LE  CRC-32 of the body
//! +12  44-byte canonical PCM header (RIFF / WAVE / "fmt " / "data")
//! +56  payload, little-endian signed samples
//! ```
//!
//! The input is re-headered rather than copied: WAV writers commonly emit
//! `WAVE_FORMAT_EXTENSIBLE`, `LIST` chunks, or odd `fmt ` sizes, none of which
//! the firmware's fixed 44-byte layout accepts.

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use platform::flash::len_u32;
use platform::qspi_config::partitions::IMAGE_PREFIX_BYTES;
use playback::{WavHeader, HEADER_LEN};

/// Magic at the start of every packed image.
pub const IMAGE_MAGIC: [u8; 4] = *b"WAVH";

/// Decoded image prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePrefix {
    pub body_len: u32,
    pub crc32: u32,
}

impl ImagePrefix {
    pub fn for_body(body: &[u8]) -> Self {
        Self {
            body_len: len_u32(body.len()),
            crc32: crc32fast::hash(body),
        }
    }

    pub fn encode(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        for (dst, src) in out.iter_mut().zip(
            IMAGE_MAGIC
                .iter()
                .chain(self.body_len.to_le_bytes().iter())
                .chain(self.crc32.to_le_bytes().iter()),
        ) {
            *dst = *src;
        }
        out
    }

    /// Parse the prefix at the start of `image`.
    pub fn decode(image: &[u8]) -> Result<Self> {
        let Some(prefix) = image.get(..12) else {
            bail!("image is {} bytes, shorter than its 12-byte prefix", image.len());
        };
        let word = |range: std::ops::Range<usize>| -> Result<[u8; 4]> {
            prefix
                .get(range)
                .and_then(|b| <[u8; 4]>::try_from(b).ok())
                .context("truncated prefix")
        };
        if word(0..4)? != IMAGE_MAGIC {
            bail!("missing \"WAVH\" magic, not a packed sample image");
        }
        Ok(Self {
            body_len: u32::from_le_bytes(word(4..8)?),
            crc32: u32::from_le_bytes(word(8..12)?),
        })
    }

    /// Check the prefix against the body that follows it.
    pub fn verify(&self, body: &[u8]) -> Result<()> {
        if len_u32(body.len()) != self.body_len {
            bail!(
                "prefix declares {} body bytes, image holds {}",
                self.body_len,
                body.len()
            );
        }
        let actual = crc32fast::hash(body);
        if actual != self.crc32 {
            bail!(
                "CRC-32 mismatch: prefix 0x{:08X}, body 0x{actual:08X}",
                self.crc32
            );
        }
        Ok(())
    }
}

/// Build an image from decoded samples.
///
/// `samples` are already scaled to `bits`; 16-bit values must fit `i16`.
pub fn pack_samples(sample_rate: u32, bits: u16, samples: &[i32]) -> Result<Vec<u8>> {
    let bytes_per_sample = match bits {
        16 => 2usize,
        32 => 4,
        other => bail!("unsupported bit depth {other}: the player reads 16- or 32-bit PCM"),
    };
    let payload_len = samples
        .len()
        .checked_mul(bytes_per_sample)
        .context("payload too large")?;
    let data_size = u32::try_from(payload_len).context("payload exceeds 4 GiB")?;

    let mut body = Vec::with_capacity(HEADER_LEN.saturating_add(payload_len));
    body.extend_from_slice(&WavHeader::pcm_mono(sample_rate, bits, data_size).encode());
    for &s in samples {
        if bits == 16 {
            let s = i16::try_from(s).with_context(|| format!("sample {s} exceeds 16 bits"))?;
            body.extend_from_slice(&s.to_le_bytes());
        } else {
            body.extend_from_slice(&s.to_le_bytes());
        }
    }

    let mut image = Vec::with_capacity(body.len().saturating_add(12));
    image.extend_from_slice(&ImagePrefix::for_body(&body).encode());
    image.extend_from_slice(&body);
    Ok(image)
}

/// Read a mono integer-PCM WAV file and pack it.
pub fn pack_wav(path: &Path) -> Result<Vec<u8>> {
    let reader =
        hound::WavReader::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        bail!(
            "{} has {} channels; the player loops mono samples only",
            path.display(),
            spec.channels
        );
    }
    if spec.sample_format != hound::SampleFormat::Int {
        bail!("{} holds float samples; export as 16- or 32-bit integer PCM", path.display());
    }
    let samples = reader
        .into_samples::<i32>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    tracing::debug!(
        rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        samples = samples.len(),
        "wav decoded"
    );
    pack_samples(spec.sample_rate, spec.bits_per_sample, &samples)
}

pub fn run(input: &Path, out: &Path) -> Result<()> {
    println!();
    println!("{}", format!("📦 Packing {}...", input.display()).cyan().bold());

    let image = pack_wav(input)?;
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(out, &image).with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "{}",
        format!(
            "✓ Wrote {} ({} bytes: {} prefix + {} header + {} payload)",
            out.display(),
            image.len(),
            IMAGE_PREFIX_BYTES,
            HEADER_LEN,
            image
                .len()
                .saturating_sub(HEADER_LEN)
                .saturating_sub(IMAGE_PREFIX_BYTES as usize)
        )
        .green()
    );
    println!();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn prefix_layout_matches_partition_map() {
        assert_eq!(ImagePrefix::for_body(&[]).encode().len(), IMAGE_PREFIX_BYTES as usize);
    }

    #[test]
    fn packed_image_layout() {
        let image = pack_samples(48_000, 16, &[1, -1]).unwrap();
        assert_eq!(&image[..4], b"WAVH");
        assert_eq!(image.len(), 12 + 44 + 4);
        assert_eq!(u32::from_le_bytes(image[4..8].try_into().unwrap()), 48);
        assert_eq!(&image[12..16], b"RIFF");
        assert_eq!(&image[56..60], &[0x01, 0x00, 0xFF, 0xFF]);

        let prefix = ImagePrefix::decode(&image).unwrap();
        prefix.verify(&image[12..]).unwrap();
    }

    #[test]
    fn corrupted_body_fails_crc() {
        let mut image = pack_samples(48_000, 32, &[5, 6, 7]).unwrap();
        let last = image.len() - 1;
        image[last] ^= 0x01;
        let prefix = ImagePrefix::decode(&image).unwrap();
        let err = prefix.verify(&image[12..]).unwrap_err();
        assert!(err.to_string().contains("CRC-32 mismatch"));
    }

    #[test]
    fn missing_magic_is_rejected() {
        assert!(ImagePrefix::decode(b"RIFF\0\0\0\0\0\0\0\0").is_err());
        assert!(ImagePrefix::decode(b"WAVH").is_err());
    }

    #[test]
    fn out_of_range_16_bit_sample_is_rejected() {
        assert!(pack_samples(48_000, 16, &[40_000]).is_err());
        assert!(pack_samples(48_000, 24, &[0]).is_err());
    }

    #[test]
    fn stereo_wav_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(&path, spec).unwrap();
        w.write_sample(0i16).unwrap();
        w.write_sample(0i16).unwrap();
        w.finalize().unwrap();

        let err = pack_wav(&path).unwrap_err();
        assert!(err.to_string().contains("mono"));
    }

    #[test]
    fn extensible_32_bit_wav_is_reheadered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone32.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(&path, spec).unwrap();
        w.write_sample(i32::MIN).unwrap();
        w.write_sample(0x4000_0000i32).unwrap();
        w.finalize().unwrap();

        let image = pack_wav(&path).unwrap();
        let header = WavHeader::decode(image[12..56].try_into().unwrap());
        assert_eq!(header.format, 1);
        assert_eq!(header.bits_per_sample, 32);
        assert_eq!(header.data_size, 8);
        assert_eq!(&image[56..60], &i32::MIN.to_le_bytes());
    }
}
