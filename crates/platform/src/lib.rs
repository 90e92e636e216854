//! Hardware Abstraction Layer (HAL) for the Flashloop sample player
//!
//! This crate provides trait-based abstractions for the hardware the sample
//! player touches, enabling development and testing without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate)
//!         ↓
//! Feature Layer (playback: container parser + streaming converter)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (Embassy HAL + PAC)
//! ```
//!
//! # Abstractions
//!
//! - [`FlashRegion`] - cache-coherent reads from memory-mapped QSPI flash
//! - [`AudioCallback`] - the block callback the audio engine drives
//! - [`EngineConfig`] - sample rate and block size fixed by the engine
//! - [`qspi_config`] - QUADSPI register values and flash partition map
//! - [`dma_safety`] - DMA buffer sizing for the SAI output
//! - [`mpu`] - MPU region keeping the SAI buffer out of the D-cache
//!
//! Status-pin and delay seams use the `embedded-hal` 1.0 traits directly.
//!
//! # Features
//!
//! - `std`: Enable standard library support and [`mocks`] (for testing)
//! - `hardware`: Physical hardware marker
//! - `defmt`: Enable defmt derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod audio;
pub mod audio_types;
pub mod config;
pub mod dma_safety;
pub mod flash;
pub mod mocks;
pub mod mpu;
pub mod qspi_config;

// Re-export main high-level traits
pub use audio::{AudioCallback, EngineConfig};
pub use audio_types::{BlockFrames, OutOfRangeError, SampleRateHz};
pub use flash::{check_range, CacheSpan, FlashError, FlashRegion, SliceFlash, CACHE_LINE_BYTES};
