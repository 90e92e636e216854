//! Audio output: SAI1 clocking and the block-streaming task.
//!
//! - `clock_math`: PLL3 dividers for a 12.288 MHz MCLK (48 kHz × 256)
//! - `sai_task`: owns the [`playback::StreamingConverter`], pulls one block
//!   per DMA half-transfer and encodes it into SAI words

pub mod clock_math;
pub mod sai_task;

pub use sai_task::{encode_sample, interleave_block, BlockStreamer};
#[cfg(feature = "hardware")]
pub use sai_task::{audio_task, SaiResources};
