//! Flashloop firmware
//!
//! Loops a mono PCM sample stored in QSPI NOR flash out of SAI1 on an
//! STM32H743ZI.
//!
//! # Architecture
//!
//! ```text
//! main.rs (hardware)
//!    │  boot::build_embassy_config, flash::enable_memory_mapped
//!    ▼
//! boot::load_sample_image ──► playback::load_sample (parser + validator)
//!    │ LoadOutcome { converter, cadence }
//!    ├──► audio::sai_task   owns the StreamingConverter, SAI1 + DMA
//!    └──► status::StatusIndicator   LED blink cadence
//! ```
//!
//! Everything outside `#[cfg(feature = "hardware")]` is pure logic and runs
//! in host tests.
//!
//! # Features
//!
//! - `hardware` - Build for STM32H7 target (embassy, defmt, cortex-m)
//! - `std` - Enable standard library (for host testing)
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod audio;
pub mod boot;
#[cfg(feature = "hardware")]
pub mod diagnostics;
pub mod dma;
pub mod exception_handlers;
pub mod flash;
pub mod status;

pub use boot::{load_sample_image, LoadOutcome};
pub use status::{StatusCadence, StatusIndicator};
