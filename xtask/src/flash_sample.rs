//! xtask flash-sample - write a packed sample image into QSPI flash.
//!
//! probe-rs writes external flash through a flash algorithm described in a
//! chip description file (`--chip-description`); the stock STM32H743ZITx
//! target only covers internal flash.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use platform::qspi_config::{partitions, QSPI_BASE_ADDR};

use crate::image;

const PACKED_IMAGE: &str = "target/sample.img";

/// CPU address the image is downloaded to.
pub fn image_address() -> u32 {
    QSPI_BASE_ADDR.saturating_add(partitions::SAMPLE_IMAGE)
}

/// `true` if `path` looks like a WAV file rather than a packed image.
pub fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

/// probe-rs arguments for writing `image` at [`image_address`].
pub fn probe_rs_args(image: &Path, chip_description: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "download".to_string(),
        "--chip".to_string(),
        crate::flash::CHIP.to_string(),
        "--binary-format".to_string(),
        "bin".to_string(),
        "--base-address".to_string(),
        format!("0x{:08X}", image_address()),
    ];
    if let Some(desc) = chip_description {
        args.push("--chip-description-path".to_string());
        args.push(desc.display().to_string());
    }
    args.push(image.display().to_string());
    args
}

pub fn run(input: &Path, chip_description: Option<&Path>) -> Result<()> {
    let image_path: PathBuf = if is_wav(input) {
        let out = PathBuf::from(PACKED_IMAGE);
        image::run(input, &out)?;
        out
    } else {
        input.to_path_buf()
    };

    let bytes = std::fs::read(&image_path)
        .with_context(|| format!("Failed to read {}", image_path.display()))?;
    crate::inspect::inspect_image(&bytes, &mut playback::NullDiagnostics)
        .context("Refusing to flash an image the firmware would reject")?;

    println!();
    println!(
        "{}",
        format!(
            "📡 Writing {} ({} bytes) to QSPI at 0x{:08X}...",
            image_path.display(),
            bytes.len(),
            image_address()
        )
        .cyan()
        .bold()
    );
    if chip_description.is_none() {
        tracing::warn!("no --chip-description given; probe-rs needs a QSPI flash algorithm");
    }

    let start = Instant::now();
    let output = Command::new("probe-rs")
        .args(probe_rs_args(&image_path, chip_description))
        .output()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;

    if !output.status.success() {
        eprintln!("{}", "✗ Sample flash failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Sample flash failed - check the probe and the QSPI flash algorithm");
    }

    println!(
        "{}",
        format!("✓ Sample written in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    println!("   {}", "Reset the board to loop the new sample".dimmed());
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_lands_at_partition_address() {
        assert_eq!(image_address(), 0x9000_1000);
    }

    #[test]
    fn wav_detection_is_case_insensitive() {
        assert!(is_wav(Path::new("tone.WAV")));
        assert!(is_wav(Path::new("target/sine_220hz.wav")));
        assert!(!is_wav(Path::new("target/sample.img")));
        assert!(!is_wav(Path::new("wav")));
    }

    #[test]
    fn probe_rs_args_target_qspi() {
        let args = probe_rs_args(Path::new("s.img"), Some(Path::new("h743-qspi.yaml")));
        assert_eq!(args.first().map(String::as_str), Some("download"));
        assert!(args.windows(2).any(|w| w == ["--base-address", "0x90001000"]));
        assert!(args
            .windows(2)
            .any(|w| w == ["--chip-description-path", "h743-qspi.yaml"]));
        assert_eq!(args.last().map(String::as_str), Some("s.img"));
    }
}
