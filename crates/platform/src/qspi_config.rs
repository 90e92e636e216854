//! QUADSPI configuration for W25Q128JV NOR flash in memory-mapped (XiP) mode.
//!
//! XiP = eXecute in Place: the QUADSPI controller presents the flash as a
//! memory-mapped read-only window at `0x9000_0000`. The sample image is read
//! straight out of that window by the CPU; the audio path never issues
//! explicit SPI transactions.
//!
//! # Hardware
//!
//! **Flash chip:** W25Q128JV (Winbond): 16 MB, 133 MHz max, SOIC-8
//!
//! **Fast Read Quad I/O command (0xEB):**
//! - 8-bit instruction phase (single wire)
//! - 24-bit address phase (quad wires)
//! - 8-bit mode byte (quad wires, sent as alternate bytes = 0xFF so the chip
//!   never enters continuous-read mode)
//! - 4 dummy cycles (quad wires)
//! - N-byte data phase (quad wires)
//!
//! # Embassy / PAC Note
//!
//! Embassy-stm32 issue \#3149: `embassy_stm32::qspi` does **not** implement
//! memory-mapped mode. The firmware lets Embassy configure pins and clocks in
//! indirect mode, then switches to XiP by writing the raw register values
//! computed here ([`memory_mapped_ccr`], [`dcr_value`]).
//!
//! # Sources
//!
//! - W25Q128JV datasheet (Winbond, rev. L 2021): §8.2.14 Fast Read Quad I/O
//! - STM32H743 Reference Manual RM0433: §23.5 QUADSPI registers

/// QUADSPI clock prescaler for target read frequency.
///
/// `QUADSPI_CLK = kernel_clk / (QSPI_PRESCALER + 1)`
///
/// At 200 MHz kernel clock (HCLK3): `prescaler = 1` → 100 MHz.
pub const QSPI_PRESCALER: u8 = 1;

/// Flash size field for `QUADSPI_DCR.FSIZE`.
///
/// Hardware formula: addressable bytes = 2^(`FSIZE` + 1).
/// W25Q128JV = 16 MB = 2^24 → `FSIZE = 23`.
pub const QSPI_FLASH_SIZE: u8 = 23;

/// Chip-select high time field for `QUADSPI_DCR.CSHT` (cycles − 1).
///
/// W25Q128JV tSHSL ≥ 10 ns for reads; 2 cycles at 100 MHz = 20 ns.
pub const QSPI_CS_HIGH_CYCLES: u8 = 1;

/// Number of dummy cycles for Fast Read Quad I/O (command 0xEB).
///
/// W25Q128JV datasheet §8.2.14: 4 dummy clocks follow the mode byte.
pub const QSPI_DUMMY_CYCLES: u8 = 4;

/// Fast Read Quad I/O command byte for W25Q128JV.
pub const QSPI_READ_CMD: u8 = 0xEB;

/// Mode byte sent in the alternate-bytes phase.
///
/// `0xFF` keeps M5-4 ≠ `10`, so the chip expects a full instruction on every
/// access instead of latching continuous-read mode.
pub const QSPI_ALTERNATE_BYTES: u32 = 0xFF;

/// Base address of the QUADSPI memory-mapped region in the STM32H7 memory map.
///
/// Hardware constant from the STM32H743 memory map (RM0433 Table 1).
pub const QSPI_BASE_ADDR: u32 = 0x9000_0000;

/// Size of the memory-mapped window in bytes (whole W25Q128JV, 16 MB).
pub const XIP_WINDOW_BYTES: u32 = 1 << (QSPI_FLASH_SIZE as u32 + 1);

/// W25Q128JV maximum operating frequency (Hz).
pub const QSPI_MAX_FREQ_HZ: u32 = 133_000_000;

/// Partition offsets within QSPI flash (relative to flash start, not to
/// `QSPI_BASE_ADDR`; add `QSPI_BASE_ADDR` to get the CPU address in XiP mode).
///
/// # Partition map (W25Q128JV, 16 MB total)
///
/// ```text
/// Offset       Size    Contents
/// 0x0000_0000   4 KB   Reserved (left erased)
/// 0x0000_1000  rest    Sample image:
///                        +0   12 B  tool prefix ("WAVH", size, CRC-32)
///                        +12  44 B  container header (RIFF/WAVE)
///                        +56   …    PCM payload
/// ```
pub mod partitions {
    /// Reserved first sector, left erased.
    pub const RESERVED: u32 = 0x0000_0000;

    /// Start of the sample image written by `cargo xtask flash-sample`.
    pub const SAMPLE_IMAGE: u32 = 0x0000_1000;

    /// Length of the tool prefix in front of the container header.
    ///
    /// `"WAVH"` magic, `u32` LE file size, `u32` LE CRC-32. The firmware
    /// treats these bytes as opaque padding.
    pub const IMAGE_PREFIX_BYTES: u32 = 12;

    /// Flash offset of the 44-byte container header.
    pub const SAMPLE_HEADER: u32 = SAMPLE_IMAGE + IMAGE_PREFIX_BYTES;
}

// ── Register encodings ───────────────────────────────────────────────────────

/// `QUADSPI_CCR` line-mode encoding: phase skipped.
const MODE_NONE: u32 = 0b00;
/// `QUADSPI_CCR` line-mode encoding: single line.
const MODE_SINGLE: u32 = 0b01;
/// `QUADSPI_CCR` line-mode encoding: four lines.
const MODE_QUAD: u32 = 0b11;
/// `QUADSPI_CCR.ADSIZE` for 24-bit addresses.
const ADSIZE_24: u32 = 0b10;
/// `QUADSPI_CCR.ABSIZE` for one alternate byte.
const ABSIZE_8: u32 = 0b00;
/// `QUADSPI_CCR.FMODE` memory-mapped.
const FMODE_MEMORY_MAPPED: u32 = 0b11;

/// `QUADSPI_CCR` value for memory-mapped Fast Read Quad I/O.
///
/// | Field       | Bits    | Value |
/// |-------------|---------|-------|
/// | INSTRUCTION | [7:0]   | 0xEB  |
/// | IMODE       | [9:8]   | single|
/// | ADMODE      | [11:10] | quad  |
/// | ADSIZE      | [13:12] | 24-bit|
/// | ABMODE      | [15:14] | quad  |
/// | ABSIZE      | [17:16] | 8-bit |
/// | DCYC        | [22:18] | 4     |
/// | DMODE       | [25:24] | quad  |
/// | FMODE       | [27:26] | mmap  |
pub const fn memory_mapped_ccr() -> u32 {
    (QSPI_READ_CMD as u32)
        | (MODE_SINGLE << 8)
        | (MODE_QUAD << 10)
        | (ADSIZE_24 << 12)
        | (MODE_QUAD << 14)
        | (ABSIZE_8 << 16)
        | ((QSPI_DUMMY_CYCLES as u32 & 0x1F) << 18)
        | (MODE_QUAD << 24)
        | (FMODE_MEMORY_MAPPED << 26)
        | (MODE_NONE << 28)
}

/// `QUADSPI_DCR` value: flash size and chip-select high time.
pub const fn dcr_value() -> u32 {
    ((QSPI_FLASH_SIZE as u32 & 0x1F) << 16) | ((QSPI_CS_HIGH_CYCLES as u32 & 0x7) << 8)
}

/// Validate that a QUADSPI prescaler value produces a clock within W25Q128JV limits.
///
/// # Arguments
///
/// * `kernel_hz`: QUADSPI kernel clock in Hz (e.g. `200_000_000` from HCLK3).
/// * `prescaler`: The `QUADSPI_CR.PRESCALER` value (0–255); QSPI clock =
///   `kernel_hz / (prescaler + 1)`.
///
/// # Returns
///
/// `Ok(qspi_hz)`: actual QSPI clock in Hz, if within the 133 MHz datasheet limit.
/// `Err(&'static str)`: human-readable error if the clock exceeds 133 MHz.
///
/// # Example
///
/// ```rust
/// use platform::qspi_config::validate_qspi_prescaler;
/// assert_eq!(validate_qspi_prescaler(200_000_000, 1), Ok(100_000_000));
/// ```
pub fn validate_qspi_prescaler(kernel_hz: u32, prescaler: u8) -> Result<u32, &'static str> {
    let qspi_hz = kernel_hz / (u32::from(prescaler) + 1);
    if qspi_hz > QSPI_MAX_FREQ_HZ {
        return Err("QSPI clock exceeds W25Q128JV maximum of 133 MHz");
    }
    Ok(qspi_hz)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qspi_prescaler_at_200mhz() {
        assert_eq!(
            validate_qspi_prescaler(200_000_000, QSPI_PRESCALER),
            Ok(100_000_000),
            "prescaler=1 at 200 MHz kernel clock must yield 100 MHz QSPI clock"
        );
    }

    /// Prescaler 0 would run the W25Q128JV at 200 MHz and must be rejected.
    #[test]
    fn test_qspi_prescaler_zero_would_exceed_flash_limit() {
        assert!(validate_qspi_prescaler(200_000_000, 0).is_err());
    }

    #[test]
    fn test_qspi_flash_size_field() {
        assert_eq!(XIP_WINDOW_BYTES, 16 * 1024 * 1024);
    }

    #[test]
    fn test_memory_mapped_ccr_fields() {
        let ccr = memory_mapped_ccr();
        assert_eq!(ccr & 0xFF, 0xEB, "instruction");
        assert_eq!((ccr >> 8) & 0b11, 0b01, "instruction on one line");
        assert_eq!((ccr >> 10) & 0b11, 0b11, "address on four lines");
        assert_eq!((ccr >> 12) & 0b11, 0b10, "24-bit address");
        assert_eq!((ccr >> 18) & 0x1F, 4, "dummy cycles");
        assert_eq!((ccr >> 24) & 0b11, 0b11, "data on four lines");
        assert_eq!((ccr >> 26) & 0b11, 0b11, "memory-mapped mode");
        assert_eq!(ccr, 0x0F10_EDEB);
    }

    #[test]
    fn test_dcr_value() {
        assert_eq!(dcr_value(), 0x0017_0100);
    }

    #[test]
    fn test_sample_header_follows_prefix() {
        assert_eq!(partitions::SAMPLE_HEADER, 0x100C);
        assert!(partitions::SAMPLE_IMAGE > partitions::RESERVED);
        assert!(partitions::SAMPLE_HEADER < XIP_WINDOW_BYTES);
    }
}
