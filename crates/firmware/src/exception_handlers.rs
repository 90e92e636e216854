//! Cortex-M exception handlers for the Flashloop firmware.
//!
//! - **HardFault**: memory access violations (MPU fault, bus fault), illegal
//!   instructions, or a read past the end of the QSPI XiP window while the
//!   controller is not in memory-mapped mode.
//!
//! # Hardware-only handler
//!
//! The `#[cortex_m_rt::exception]` attribute requires ARM target intrinsics and
//! is therefore gated behind `#[cfg(feature = "hardware")]`. The fault summary
//! formatting compiles unconditionally so host tests cover it.

#![allow(clippy::doc_markdown)]

/// Memory region a faulting address belongs to, for the fault log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultRegion {
    /// Internal flash (code).
    InternalFlash,
    /// DTCM (stack, statics).
    Dtcm,
    /// AXI SRAM (SAI DMA buffer).
    AxiSram,
    /// QUADSPI XiP window (sample image).
    QspiWindow,
    /// Anything else.
    Other,
}

impl FaultRegion {
    /// Classify an address against the STM32H743 memory map.
    pub fn classify(addr: u32) -> Self {
        match addr {
            0x0800_0000..=0x081F_FFFF => Self::InternalFlash,
            0x2000_0000..=0x2001_FFFF => Self::Dtcm,
            0x2400_0000..=0x2407_FFFF => Self::AxiSram,
            0x9000_0000..=0x9FFF_FFFF => Self::QspiWindow,
            _ => Self::Other,
        }
    }
}

/// HardFault exception handler (hardware target only).
///
/// Logs the stacked PC and the region it lies in, then halts via
/// `defmt::panic!` (panic-probe). Returning from HardFault is undefined
/// behavior; `-> !` enforces that.
#[cfg(feature = "hardware")]
#[cortex_m_rt::exception]
#[allow(unsafe_code)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    let pc = ef.pc();
    defmt::panic!(
        "HardFault at pc={=u32:#010X} ({}), lr={=u32:#010X}",
        pc,
        FaultRegion::classify(pc),
        ef.lr()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_regions() {
        assert_eq!(FaultRegion::classify(0x0800_1234), FaultRegion::InternalFlash);
        assert_eq!(FaultRegion::classify(0x2000_0100), FaultRegion::Dtcm);
        assert_eq!(FaultRegion::classify(0x2400_0000), FaultRegion::AxiSram);
        assert_eq!(FaultRegion::classify(0x9000_100C), FaultRegion::QspiWindow);
        assert_eq!(FaultRegion::classify(0xC000_0000), FaultRegion::Other);
    }

    #[test]
    fn classify_region_edges() {
        assert_eq!(FaultRegion::classify(0x2407_FFFF), FaultRegion::AxiSram);
        assert_eq!(FaultRegion::classify(0x2408_0000), FaultRegion::Other);
        assert_eq!(FaultRegion::classify(0x8FFF_FFFF), FaultRegion::Other);
    }
}
