//! DMA buffer alignment for the SAI TX ring buffer.
//!
//! The Cortex-M7 D-cache works on 32-byte lines. The SAI DMA ring buffer
//! lives in AXI SRAM (`.axisram`) and is aligned to a full line so that no
//! CPU-side variable ever shares a cache line with bytes the DMA controller
//! is reading.
//!
//! The QSPI sample image needs the opposite treatment: it is read by the CPU
//! only, through the cache, and is kept coherent by invalidation in
//! [`crate::flash`].
//!
//! # References
//! - ST AN4839: Level 1 cache on STM32F7 Series and STM32H7 Series
//! - ARM DDI0489F §B3.5: Cache coherency

use platform::dma_safety::SAI_DMA_BUFFER_WORDS;

/// A `#[repr(align(32))]` wrapper that enforces 32-byte alignment for
/// Cortex-M7 DMA-accessible buffers.
///
/// ```ignore
/// use firmware::dma::SaiTxBuffer;
///
/// #[link_section = ".axisram"]
/// static mut SAI_TX: SaiTxBuffer = SaiTxBuffer::silent();
/// ```
#[derive(Clone, Copy)]
#[repr(align(32))]
pub struct Align32<T>(
    /// The inner value. Must be public so callers can construct and destructure the wrapper.
    pub T,
);

/// SAI1 TX ring buffer: two halves of one maximal interleaved block each.
pub type SaiTxBuffer = Align32<[u32; SAI_DMA_BUFFER_WORDS]>;

impl SaiTxBuffer {
    /// All-zero buffer (digital silence until the first block is written).
    pub const fn silent() -> Self {
        Align32([0; SAI_DMA_BUFFER_WORDS])
    }
}
