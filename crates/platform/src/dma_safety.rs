//! DMA buffer sizing for the SAI audio output on STM32H743ZI.
//!
//! ## DMA Accessibility on STM32H743ZI
//!
//! | Memory Region | Base Address | Size   | DMA1/2 | Use case |
//! |---------------|-------------|--------|--------|----------|
//! | AXI SRAM      | 0x2400_0000 | 512 KB | YES    | SAI TX ring buffer |
//! | DTCM          | 0x2000_0000 | 128 KB | NO     | CPU-only: stack, converter scratch |
//! | QSPI XiP      | 0x9000_0000 | 16 MB  | read   | Sample image (read by the CPU only) |
//!
//! The SAI ring buffer lives in `.axisram`. The converter's per-block
//! left/right `f32` scratch is CPU-only and stays on the audio task stack.
//!
//! ## Usage
//! ```rust
//! use platform::dma_safety::SAI_DMA_BUFFER_WORDS;
//!
//! #[link_section = ".axisram"]
//! static mut SAI_TX: [u32; SAI_DMA_BUFFER_WORDS] = [0; SAI_DMA_BUFFER_WORDS];
//! ```

// ── Memory region addresses ──────────────────────────────────────────────────

/// Base address of AXI SRAM (DMA1/2/MDMA accessible, D1 domain).
pub const AXI_SRAM_BASE: u32 = 0x2400_0000;

/// Size of AXI SRAM in bytes (512 KB).
pub const AXI_SRAM_SIZE_BYTES: usize = 512 * 1024;

/// True: DTCM is NOT DMA-accessible. Place no DMA buffers here.
pub const DTCM_NOT_DMA_ACCESSIBLE: bool = true;

// ── Audio DMA constants ──────────────────────────────────────────────────────

/// Output channels on the SAI link (the mono sample is duplicated to both).
pub const OUTPUT_CHANNELS: usize = 2;

/// Frames per engine callback block.
///
/// At 48 kHz, 48 frames = 1 ms of audio per callback.
pub const DEFAULT_BLOCK_FRAMES: u16 = 48;

/// Largest block the engine may request.
///
/// Bounds the converter scratch buffers on the audio task stack:
/// 256 frames × 2 channels × 4 bytes = 2 KB.
pub const MAX_BLOCK_FRAMES: usize = 256;

/// SAI TX ring buffer length in 32-bit words.
///
/// Two halves (ping-pong), each holding one maximal interleaved block:
/// 2 × 256 frames × 2 channels = 1024 words = 4 KB.
pub const SAI_DMA_BUFFER_WORDS: usize = 2 * MAX_BLOCK_FRAMES * OUTPUT_CHANNELS;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_block_fits_max() {
        assert!(usize::from(DEFAULT_BLOCK_FRAMES) <= MAX_BLOCK_FRAMES);
    }

    #[test]
    fn sai_buffer_holds_two_interleaved_blocks() {
        assert_eq!(SAI_DMA_BUFFER_WORDS, 1024);
        assert_eq!(SAI_DMA_BUFFER_WORDS * 4, 4096, "SAI ring buffer is 4 KB");
    }

    #[test]
    fn sai_buffer_fits_axi_sram() {
        assert!(SAI_DMA_BUFFER_WORDS * 4 < AXI_SRAM_SIZE_BYTES);
    }
}
