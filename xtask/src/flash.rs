//! xtask flash - build the firmware and run it on the board via probe-rs.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

pub const TARGET: &str = "thumbv7em-none-eabihf";
pub const CHIP: &str = "STM32H743ZITx";

/// Path of the firmware ELF for a build profile.
pub fn firmware_elf(release: bool) -> String {
    let profile = if release { "release" } else { "debug" };
    format!("target/{TARGET}/{profile}/firmware")
}

/// `cargo build` arguments for the hardware firmware.
pub fn build_args(release: bool) -> Vec<&'static str> {
    let mut args = vec![
        "build",
        "-p",
        "firmware",
        "--target",
        TARGET,
        "--features",
        "hardware",
    ];
    if release {
        args.push("--release");
    }
    args
}

pub fn run(release: bool) -> Result<()> {
    let mode = if release { "release" } else { "debug" };

    println!();
    println!(
        "{}",
        format!("🔨 Building firmware ({mode} mode)...").cyan().bold()
    );

    let build_start = Instant::now();
    let build_output = Command::new("cargo")
        .args(build_args(release))
        .output()
        .context("Failed to run cargo build")?;

    if !build_output.status.success() {
        eprintln!("{}", "✗ Build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&build_output.stderr));
        anyhow::bail!("Build failed");
    }
    println!(
        "{}",
        format!(
            "✓ Build successful in {:.2}s",
            build_start.elapsed().as_secs_f64()
        )
        .green()
    );
    show_binary_size(release);
    println!();

    // `probe-rs run` flashes, resets, then streams defmt RTT until Ctrl-C.
    println!("{}", "📡 Flashing to STM32H7...".cyan().bold());
    println!(
        "   {}",
        "No sample yet? cargo xtask gen-wav && cargo xtask flash-sample target/sine_220hz.wav"
            .dimmed()
    );

    let status = Command::new("probe-rs")
        .args(["run", "--chip", CHIP, "--probe-index", "0"])
        .arg(firmware_elf(release))
        .status()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;

    if !status.success() {
        eprintln!("{}", "✗ Flash failed".red().bold());
        anyhow::bail!("Flash failed - check that the probe is connected and the device is powered");
    }
    Ok(())
}

fn show_binary_size(release: bool) {
    let output = Command::new("rust-size")
        .arg(firmware_elf(release))
        .arg("-A")
        .output();

    match output {
        Ok(out) if out.status.success() => {
            println!("{}", "📊 Binary size:".cyan());
            for line in String::from_utf8_lossy(&out.stdout).lines() {
                println!("   {}", line.dimmed());
            }
        }
        _ => tracing::debug!("rust-size not available, skipping size report"),
    }
}
