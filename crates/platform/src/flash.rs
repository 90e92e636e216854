//! Cache-coherent access to memory-mapped QSPI NOR flash.
//!
//! The sample image is written into QSPI flash by an external tool (probe-rs
//! through the flash loader), which is outside the Cortex-M7 D-cache's
//! coherency domain. Once the QUADSPI controller is in memory-mapped (XiP)
//! mode, reads at `0x9000_0000..` go through the D-cache like any other
//! normal memory. A cache line filled before the image was (re)written would
//! serve stale bytes, so every structured read of flash must be preceded by
//! a D-cache invalidate covering the bytes about to be read.
//!
//! [`FlashRegion`] makes that a single owned operation:
//!
//! - [`FlashRegion::read_coherent`] invalidates, then copies into an owned
//!   buffer (used for the 44-byte container header).
//! - [`FlashRegion::map_coherent`] invalidates, then lends the XiP window
//!   itself (used for the payload read by the real-time path).
//!
//! No caller ever casts a raw flash address to a pointer.
//!
//! # Cache line geometry
//!
//! Cortex-M7 D-cache lines are 32 bytes. `SCB::invalidate_dcache_by_address`
//! operates on whole lines, so the range is rounded outwards with
//! [`CacheSpan::covering`]. Over-invalidating flash lines is harmless: flash
//! is read-only, there is never dirty data to lose.

use core::fmt;

/// Cortex-M7 D-cache line size in bytes (ARM DDI0489F §A1.3).
pub const CACHE_LINE_BYTES: u32 = 32;

/// Error returned by [`FlashRegion`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// `offset + len` lies beyond the end of the region.
    OutOfBounds {
        /// Requested start offset within the region.
        offset: u32,
        /// Requested length in bytes.
        len: u32,
        /// Total size of the region in bytes.
        capacity: u32,
    },
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds {
                offset,
                len,
                capacity,
            } => write!(
                f,
                "flash range 0x{offset:08X}+{len} exceeds region capacity of {capacity} bytes"
            ),
        }
    }
}

/// Read-only, cache-coherent view of a flash region.
///
/// `'f` is the lifetime of the mapped bytes: `'static` for the XiP window on
/// hardware, the lifetime of a host buffer in tests and tooling.
pub trait FlashRegion<'f> {
    /// Size of the region in bytes.
    fn capacity(&self) -> u32;

    /// Invalidate the cache lines covering `offset..offset + buf.len()`, then
    /// copy those bytes into `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`FlashError::OutOfBounds`] if the range does not fit the region.
    fn read_coherent(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), FlashError>;

    /// Invalidate the cache lines covering `offset..offset + len`, then lend
    /// those bytes for zero-copy reads.
    ///
    /// # Errors
    ///
    /// Returns [`FlashError::OutOfBounds`] if the range does not fit the region.
    fn map_coherent(&mut self, offset: u32, len: u32) -> Result<&'f [u8], FlashError>;
}

/// Check that `offset..offset + len` lies within a region of `capacity` bytes.
///
/// # Errors
///
/// Returns [`FlashError::OutOfBounds`] on overflow or when the range ends
/// past `capacity`.
pub fn check_range(offset: u32, len: u32, capacity: u32) -> Result<(), FlashError> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(FlashError::OutOfBounds {
            offset,
            len,
            capacity,
        }),
    }
}

/// Convert a buffer length to the `u32` domain used for flash offsets.
///
/// Buffers longer than 4 GiB cannot fit any flash region, so they saturate
/// and fail the subsequent [`check_range`].
pub fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// A cache-line aligned address span, as required by
/// `SCB::invalidate_dcache_by_address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CacheSpan {
    /// First byte of the first cache line touched (multiple of 32).
    pub start: u32,
    /// Length in bytes (multiple of 32).
    pub len: u32,
}

impl CacheSpan {
    const MASK: u32 = !(CACHE_LINE_BYTES - 1);

    /// Smallest cache-line aligned span covering `addr..addr + len`.
    ///
    /// Returns `None` if the rounded span would overflow the 32-bit address
    /// space. A zero-length range yields a zero-length span.
    pub fn covering(addr: u32, len: u32) -> Option<Self> {
        let start = addr & Self::MASK;
        if len == 0 {
            return Some(Self { start, len: 0 });
        }
        let end = addr.checked_add(len)?;
        let end_aligned = end.checked_add(CACHE_LINE_BYTES - 1)? & Self::MASK;
        Some(Self {
            start,
            len: end_aligned.checked_sub(start)?,
        })
    }

    /// `true` if this span covers every byte of `addr..addr + len`.
    pub fn contains(&self, addr: u32, len: u32) -> bool {
        let Some(end) = addr.checked_add(len) else {
            return false;
        };
        let Some(span_end) = self.start.checked_add(self.len) else {
            return false;
        };
        addr >= self.start && end <= span_end
    }
}

/// Flash region backed by a plain byte slice.
///
/// Used by host tooling (`cargo xtask inspect`) and tests, where there is no
/// D-cache to maintain. The coherency contract is trivially met.
#[derive(Debug, Clone, Copy)]
pub struct SliceFlash<'f> {
    bytes: &'f [u8],
}

impl<'f> SliceFlash<'f> {
    /// Wrap `bytes` as a flash region starting at offset 0.
    pub fn new(bytes: &'f [u8]) -> Self {
        Self { bytes }
    }
}

impl<'f> FlashRegion<'f> for SliceFlash<'f> {
    fn capacity(&self) -> u32 {
        len_u32(self.bytes.len())
    }

    fn read_coherent(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let window = self.map_coherent(offset, len_u32(buf.len()))?;
        buf.copy_from_slice(window);
        Ok(())
    }

    fn map_coherent(&mut self, offset: u32, len: u32) -> Result<&'f [u8], FlashError> {
        check_range(offset, len, self.capacity())?;
        let err = FlashError::OutOfBounds {
            offset,
            len,
            capacity: self.capacity(),
        };
        let start = usize::try_from(offset).map_err(|_| err)?;
        let end = start
            .checked_add(usize::try_from(len).map_err(|_| err)?)
            .ok_or(err)?;
        self.bytes.get(start..end).ok_or(err)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn cache_span_rounds_unaligned_range_outwards() {
        let span = CacheSpan::covering(0x9000_100C, 44).unwrap();
        assert_eq!(span.start, 0x9000_1000);
        // 0x100C + 44 = 0x1038 → rounds up to 0x1040
        assert_eq!(span.len, 0x40);
        assert!(span.contains(0x9000_100C, 44));
    }

    #[test]
    fn cache_span_aligned_range_is_unchanged() {
        let span = CacheSpan::covering(0x9000_0000, 64).unwrap();
        assert_eq!(span, CacheSpan { start: 0x9000_0000, len: 64 });
    }

    #[test]
    fn cache_span_overflow_is_none() {
        assert!(CacheSpan::covering(u32::MAX - 4, 16).is_none());
    }

    #[test]
    fn cache_span_zero_length() {
        let span = CacheSpan::covering(0x9000_0011, 0).unwrap();
        assert_eq!(span.len, 0);
    }

    #[test]
    fn check_range_rejects_overflow_and_overrun() {
        assert!(check_range(0, 16, 16).is_ok());
        assert_eq!(
            check_range(8, 9, 16),
            Err(FlashError::OutOfBounds { offset: 8, len: 9, capacity: 16 })
        );
        assert!(check_range(u32::MAX, 2, u32::MAX).is_err());
    }

    #[test]
    fn slice_flash_reads_and_maps() {
        let bytes = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut flash = SliceFlash::new(&bytes);
        let mut buf = [0u8; 3];
        flash.read_coherent(2, &mut buf).unwrap();
        assert_eq!(buf, [3, 4, 5]);
        assert_eq!(flash.map_coherent(6, 2).unwrap(), &[7, 8]);
        assert!(flash.map_coherent(6, 3).is_err());
    }
}
