//! MPU (Memory Protection Unit) configuration for STM32H743 / Cortex-M7
//!
//! # Purpose
//!
//! The firmware runs with the Cortex-M7 D-cache enabled. Two memories need
//! care once it is:
//!
//! - **AXI SRAM**, where the SAI TX ring buffer lives. DMA1 reads it behind
//!   the cache's back, so the MPU marks the whole bank non-cacheable before
//!   the cache is switched on.
//! - **QSPI XiP window**, which stays cacheable (the payload is read on every
//!   sample). Coherency there is handled by explicit invalidation, see
//!   [`crate::flash`].
//!
//! # MPU Region Requirements (Cortex-M7, ARM DDI0489F §B3.5)
//!
//! - Minimum region size: **32 bytes** (SIZE field = 4)
//! - Size must be a **power of 2**
//! - Base address must be **aligned to the region size**
//! - SIZE field encoding: `SIZE = log2(size_bytes) − 1`
//!   - 512 KB → SIZE = 18
//!
//! # Memory Attribute Bits
//!
//! Non-cacheable normal memory: **TEX = 001, S = 0, C = 0, B = 0**.
//!
//! # References
//!
//! - ARM Cortex-M7 TRM DDI0489F, MPU Region Attribute and Size Register
//! - ST AN4838, Introduction to MPU Management on STM32 MCUs
//! - ST AN4839, Level 1 cache on STM32F7 and STM32H7

use crate::dma_safety::{AXI_SRAM_BASE, AXI_SRAM_SIZE_BYTES};
use crate::flash::len_u32;

/// MPU configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MpuError {
    /// Region size is zero.
    SizeZero,
    /// Region size is below the 32-byte Cortex-M7 minimum.
    SizeTooSmall,
    /// Region size is not a power of two.
    SizeNotPowerOfTwo,
    /// Base address is not aligned to the region size.
    AddressMisaligned,
}

/// A validated MPU region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpuRegion {
    base: u32,
    size: u32,
}

impl MpuRegion {
    /// Create a region, checking the Cortex-M7 size and alignment rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`MpuError`] the region violates.
    pub fn new(base: u32, size: u32) -> Result<Self, MpuError> {
        if size == 0 {
            return Err(MpuError::SizeZero);
        }
        if size < 32 {
            return Err(MpuError::SizeTooSmall);
        }
        if !size.is_power_of_two() {
            return Err(MpuError::SizeNotPowerOfTwo);
        }
        if !base.is_multiple_of(size) {
            return Err(MpuError::AddressMisaligned);
        }
        Ok(Self { base, size })
    }

    /// ARM MPU `SIZE` field value (`log2(size) − 1`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // trailing_zeros of a u32 is at most 31
    pub fn size_field(&self) -> u8 {
        (self.size.trailing_zeros() as u8).saturating_sub(1)
    }

    /// Base address of this region.
    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Size of this region in bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// `true` if `addr..addr + len` lies inside this region.
    #[must_use]
    pub fn contains(&self, addr: u32, len: u32) -> bool {
        let end = u64::from(addr).saturating_add(u64::from(len));
        let region_end = u64::from(self.base).saturating_add(u64::from(self.size));
        addr >= self.base && end <= region_end
    }
}

/// Attribute bits for non-cacheable normal memory, without SIZE and ENABLE.
///
/// XN=1 (bit 28), AP=0b011 (bits 26:24), TEX=0b001 (bit 19), S=C=B=0.
pub const NON_CACHEABLE_ATTR_MASK: u32 = 0x1308_0000;

/// RASR value for a non-cacheable region with the given SIZE field.
#[must_use]
pub fn non_cacheable_rasr(size_field: u8) -> u32 {
    NON_CACHEABLE_ATTR_MASK | ((u32::from(size_field) & 0x1F) << 1) | 1
}

/// RBAR value with VALID=1 so the REGION field selects the slot.
#[must_use]
pub fn rbar(base: u32, slot: u8) -> u32 {
    base | (1 << 4) | (u32::from(slot) & 0xF)
}

/// The AXI SRAM bank holding the SAI TX ring buffer.
#[must_use]
pub fn sai_buffer_region() -> MpuRegion {
    MpuRegion {
        base: AXI_SRAM_BASE,
        size: len_u32(AXI_SRAM_SIZE_BYTES),
    }
}

/// `(RBAR, RASR)` pairs to program, in slot order.
///
/// | Slot | Region   | Base        | Size   | RBAR        | RASR        |
/// |------|----------|-------------|--------|-------------|-------------|
/// | 0    | AXI SRAM | 0x2400_0000 | 512 KB | 0x2400_0010 | 0x1308_0025 |
///
/// Pure math; firmware boot code writes these before enabling the D-cache.
#[must_use]
pub fn register_pairs() -> [(u32, u32); 1] {
    let axi = sai_buffer_region();
    [(rbar(axi.base(), 0), non_cacheable_rasr(axi.size_field()))]
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_region_rules() {
        assert_eq!(MpuRegion::new(0x2400_0000, 0), Err(MpuError::SizeZero));
        assert_eq!(MpuRegion::new(0x2400_0000, 16), Err(MpuError::SizeTooSmall));
        assert_eq!(
            MpuRegion::new(0x2400_0000, 48),
            Err(MpuError::SizeNotPowerOfTwo)
        );
        assert_eq!(
            MpuRegion::new(0x2400_0020, 64),
            Err(MpuError::AddressMisaligned)
        );
        assert!(MpuRegion::new(0x2400_0000, 512 * 1024).is_ok());
    }

    #[test]
    fn test_sai_buffer_region_is_valid_axi_sram() {
        let region = sai_buffer_region();
        assert_eq!(
            MpuRegion::new(region.base(), region.size()).unwrap(),
            region
        );
        assert_eq!(region.size_field(), 18);
    }

    #[test]
    fn test_axi_sram_register_pair() {
        let pairs = register_pairs();
        assert_eq!(pairs.len(), 1);
        let (rbar, rasr) = pairs[0];
        assert_eq!(rbar, 0x2400_0010);
        assert_eq!(rasr, 0x1308_0025);
        assert_ne!(rasr & (1 << 19), 0, "TEX=001");
        assert_eq!(rasr & (0b111 << 16), 0, "S, C, B clear");
    }

    #[test]
    fn test_qspi_window_is_not_covered() {
        let region = sai_buffer_region();
        assert!(region.contains(0x2400_0000, 4096));
        assert!(!region.contains(crate::qspi_config::QSPI_BASE_ADDR, 44));
    }
}
