//! QUADSPI memory-mapped flash driver.
//!
//! [`enable_memory_mapped`] brings the W25Q128JV up in indirect mode through
//! Embassy (pins, kernel clock, `DCR`), then switches the controller to
//! memory-mapped mode with raw `CCR`/`ABR` writes (embassy-stm32 issue
//! \#3149). The returned [`XipFlash`] is the only way to read the window:
//! it implements [`FlashRegion`] with a D-cache invalidate in front of every
//! read, so no caller ever dereferences `0x9000_0000` itself.
//!
//! Host builds get the pure helpers only; tests drive the loader through
//! `platform::mocks::MockFlash`, which models the same invalidate-then-read
//! contract.

use platform::flash::{check_range, CacheSpan, FlashError};
use platform::qspi_config::QSPI_BASE_ADDR;

/// CPU address span to invalidate before touching `offset..offset + len`
/// of a flash region of `capacity` bytes mapped at `QSPI_BASE_ADDR`.
///
/// # Errors
///
/// [`FlashError::OutOfBounds`] if the range leaves the region.
pub fn invalidate_span(offset: u32, len: u32, capacity: u32) -> Result<CacheSpan, FlashError> {
    check_range(offset, len, capacity)?;
    QSPI_BASE_ADDR
        .checked_add(offset)
        .and_then(|addr| CacheSpan::covering(addr, len))
        .ok_or(FlashError::OutOfBounds {
            offset,
            len,
            capacity,
        })
}

#[cfg(feature = "hardware")]
pub use hardware::{enable_memory_mapped, QspiPins, XipFlash};

#[cfg(feature = "hardware")]
mod hardware {
    use embassy_stm32::dma::NoDma;
    use embassy_stm32::pac;
    use embassy_stm32::peripherals::{PF10, PF6, PF7, PF8, PF9, PG6, QUADSPI};
    use embassy_stm32::qspi::enums::{AddressSize, ChipSelectHighTime, FIFOThresholdLevel, MemorySize};
    use embassy_stm32::qspi::{Config, Qspi};
    use platform::flash::{len_u32, FlashError, FlashRegion};
    use platform::qspi_config::{
        memory_mapped_ccr, QSPI_ALTERNATE_BYTES, QSPI_BASE_ADDR, QSPI_PRESCALER, XIP_WINDOW_BYTES,
    };

    use super::invalidate_span;

    /// Upper bound on `SR.BUSY` polls before memory-mapped mode is forced anyway.
    const BUSY_POLL_LIMIT: u32 = 100_000;

    /// QUADSPI bank 1 pins (NUCLEO-H743ZI2 / board QSPI footprint).
    pub struct QspiPins {
        /// BK1_IO0
        pub d0: PF8,
        /// BK1_IO1
        pub d1: PF9,
        /// BK1_IO2
        pub d2: PF7,
        /// BK1_IO3
        pub d3: PF6,
        /// CLK
        pub sck: PF10,
        /// BK1_NCS
        pub nss: PG6,
    }

    /// The XiP window, readable only through cache-coherent operations.
    pub struct XipFlash {
        // Kept alive so the pins stay in their QUADSPI alternate function.
        _qspi: Qspi<'static, QUADSPI, NoDma>,
        scb: cortex_m::peripheral::SCB,
    }

    /// Configure QUADSPI and switch it into memory-mapped Fast Read Quad I/O.
    pub fn enable_memory_mapped(peri: QUADSPI, pins: QspiPins) -> XipFlash {
        let mut config = Config::default();
        config.memory_size = MemorySize::_16MiB;
        config.address_size = AddressSize::_24bit;
        config.prescaler = QSPI_PRESCALER;
        config.cs_high_time = ChipSelectHighTime::_2Cycle;
        config.fifo_threshold = FIFOThresholdLevel::_4Bytes;

        let qspi = Qspi::new_bk1(
            peri, pins.d0, pins.d1, pins.d2, pins.d3, pins.sck, pins.nss, NoDma, config,
        );

        let regs = pac::QUADSPI;
        let mut polls = 0u32;
        while regs.sr().read().busy() && polls < BUSY_POLL_LIMIT {
            polls = polls.saturating_add(1);
        }
        if polls >= BUSY_POLL_LIMIT {
            defmt::warn!("qspi: controller still busy before XiP switch");
        }
        regs.abr().write_value(pac::quadspi::regs::Abr(QSPI_ALTERNATE_BYTES));
        // Writing CCR with FMODE = memory-mapped starts XiP; no further commands.
        regs.ccr().write_value(pac::quadspi::regs::Ccr(memory_mapped_ccr()));
        defmt::info!(
            "qspi: memory-mapped at {=u32:#010X}, {=u32} bytes",
            QSPI_BASE_ADDR,
            XIP_WINDOW_BYTES
        );

        // SAFETY: only the SCB cache-maintenance registers are used, from the
        // boot thread, before the audio task exists. Caches were enabled by
        // `boot::hardware::configure_memory_system`.
        let cp = unsafe { cortex_m::Peripherals::steal() };
        XipFlash {
            _qspi: qspi,
            scb: cp.SCB,
        }
    }

    impl XipFlash {
        fn window(offset: u32, len: u32) -> Result<&'static [u8], FlashError> {
            let err = FlashError::OutOfBounds {
                offset,
                len,
                capacity: XIP_WINDOW_BYTES,
            };
            // SAFETY: an `XipFlash` exists only after QUADSPI entered
            // memory-mapped mode, so the whole 16 MB window is readable normal
            // memory. Flash is never written while the firmware runs.
            let all: &'static [u8] = unsafe {
                core::slice::from_raw_parts(QSPI_BASE_ADDR as *const u8, XIP_WINDOW_BYTES as usize)
            };
            let start = usize::try_from(offset).map_err(|_| err)?;
            let end = start
                .checked_add(usize::try_from(len).map_err(|_| err)?)
                .ok_or(err)?;
            all.get(start..end).ok_or(err)
        }

        fn invalidate(&mut self, offset: u32, len: u32) -> Result<(), FlashError> {
            let span = invalidate_span(offset, len, XIP_WINDOW_BYTES)?;
            // SAFETY: the span is cache-line aligned and lies in the read-only
            // XiP window; there is never dirty data there to lose.
            unsafe {
                self.scb
                    .invalidate_dcache_by_address(span.start as usize, span.len as usize);
            }
            Ok(())
        }
    }

    impl FlashRegion<'static> for XipFlash {
        fn capacity(&self) -> u32 {
            XIP_WINDOW_BYTES
        }

        fn read_coherent(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), FlashError> {
            let len = len_u32(buf.len());
            self.invalidate(offset, len)?;
            buf.copy_from_slice(Self::window(offset, len)?);
            Ok(())
        }

        fn map_coherent(&mut self, offset: u32, len: u32) -> Result<&'static [u8], FlashError> {
            self.invalidate(offset, len)?;
            Self::window(offset, len)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use platform::qspi_config::{partitions, XIP_WINDOW_BYTES};

    #[test]
    fn header_span_covers_prefix_and_header() {
        let span = invalidate_span(partitions::SAMPLE_HEADER, 44, XIP_WINDOW_BYTES).unwrap();
        assert_eq!(span.start, 0x9000_1000);
        assert_eq!(span.len, 64);
        assert!(span.contains(0x9000_100C, 44));
    }

    #[test]
    fn span_past_window_is_rejected() {
        assert_eq!(
            invalidate_span(XIP_WINDOW_BYTES - 8, 16, XIP_WINDOW_BYTES),
            Err(FlashError::OutOfBounds {
                offset: XIP_WINDOW_BYTES - 8,
                len: 16,
                capacity: XIP_WINDOW_BYTES
            })
        );
    }
}
