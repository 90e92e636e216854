// Desktop/tooling crate: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod flash;
mod flash_sample;
mod gen_wav;
mod image;
mod inspect;
mod test;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Flashloop development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flash firmware to STM32H7 hardware via probe-rs
    Flash {
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
    },
    /// Generate the 220 Hz test tone as a mono WAV file
    GenWav {
        /// Output WAV path
        #[arg(short, long, default_value = "target/sine_220hz.wav")]
        out: PathBuf,
        /// Bits per sample (16 or 32)
        #[arg(long, default_value_t = 32)]
        bits: u16,
        /// Tone frequency in Hz
        #[arg(long, default_value_t = gen_wav::ToneSpec::DEFAULT.frequency_hz)]
        frequency: f64,
        /// Duration in seconds
        #[arg(long, default_value_t = gen_wav::ToneSpec::DEFAULT.seconds)]
        seconds: f64,
    },
    /// Pack a mono PCM WAV into a flash image (prefix + 44-byte header + payload)
    Pack {
        /// Input WAV file
        input: PathBuf,
        /// Output image path
        #[arg(short, long, default_value = "target/sample.img")]
        out: PathBuf,
    },
    /// Verify an image and run it through the firmware's loader
    Inspect {
        /// Image produced by `pack`
        image: PathBuf,
    },
    /// Pack (if given a WAV) and write the sample image into QSPI flash
    FlashSample {
        /// WAV file or packed image
        input: PathBuf,
        /// probe-rs chip description with the QSPI flash algorithm
        #[arg(long)]
        chip_description: Option<PathBuf>,
    },
    /// Check firmware builds for hardware and host targets
    Check,
    /// Run all tests (unit, integration, and doc)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Flash { release } => flash::run(release),
        Commands::GenWav {
            out,
            bits,
            frequency,
            seconds,
        } => {
            let spec = gen_wav::ToneSpec {
                frequency_hz: frequency,
                seconds,
                ..gen_wav::ToneSpec::DEFAULT
            };
            gen_wav::run(&out, bits, &spec)
        }
        Commands::Pack { input, out } => image::run(&input, &out),
        Commands::Inspect { image } => inspect::run(&image),
        Commands::FlashSample {
            input,
            chip_description,
        } => flash_sample::run(&input, chip_description.as_deref()),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
    }
}
