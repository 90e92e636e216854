//! PLL3 audio clock divider calculations for SAI1 MCLK generation.
//!
//! The STM32H743 PLL3 generates the kernel clock for SAI1 Block A. The SAI
//! runs at 48 kHz with MCLK = 256 × fs = 12.288 MHz.
//!
//! # Clock Source
//!
//! PLL3 uses the internal HSI oscillator (64 MHz). HSI is available
//! immediately on power-on without crystal startup delay.
//!
//! # Clock Tree
//!
//!   HSI (64 MHz) -> PLL3M (div 5) -> VCO_IN (12.8 MHz)
//!                                  -> VCO_OUT (x48 = 614.4 MHz)
//!                                    -> PLL3P (div 50) = 12.288 MHz
//!                                       |
//!                                    SAI1 kernel clock -> MCLK_A (PE2, AF6)
//!
//! # PLL3 Formula
//!
//!   VCO_INPUT  = HSI / PLL3M
//!   VCO_OUTPUT = VCO_INPUT * PLL3N
//!   PLL3P_CLK  = VCO_OUTPUT / PLL3P    <- SAI1 kernel clock
//!
//! # Exact 12.288 MHz without FRACN
//!
//! 12 288 000 × 50 = 614 400 000 = 12 800 000 × 48, and 64 MHz / 5 = 12.8 MHz,
//! so the integer dividers hit the target exactly. The 48 kHz family never
//! needs the fractional PLL (unlike 44.1 kHz).
//!
//! References:
//! - STM32H7 RM0433 Rev 9, S8.7.14 (PLL configuration, VCO ranges)
//! - STM32H7 RM0433 Rev 9, S51.4.8 (SAI clock generator, MCKDIV)
//! - firmware::boot::build_embassy_config() -- actual hardware wiring

/// HSI oscillator frequency (Hz) -- internal 64 MHz RC oscillator on STM32H743.
pub const HSI_HZ: u32 = 64_000_000;

/// SAI1 Block A sample rate (Hz); matches `EngineConfig::default()`.
pub const SAMPLE_RATE_HZ: u32 = 48_000;

/// MCLK/fs ratio for I2S master mode: MCLK = 256 x fs.
pub const MCLK_FS_RATIO: u32 = 256;

/// Target MCLK: 256 x 48 000 = 12 288 000 Hz.
pub const MCLK_TARGET_HZ: u32 = SAMPLE_RATE_HZ * MCLK_FS_RATIO;

/// PLL3 M predivider: HSI / 5 = 12.8 MHz VCO input.
/// RM0433 S8.7.14: VCO input must be in range 1-16 MHz (PLL3RGE = 8-16 MHz).
/// Corresponds to PllPreDiv::DIV5 in embassy-stm32.
pub const PLL3_M: u32 = 5;

/// PLL3 N multiplier: VCO = 12.8 MHz x 48 = 614.4 MHz.
/// RM0433 S8.7.14: wide-range VCO output must be in range 192-836 MHz.
/// Corresponds to PllMul::MUL48 in embassy-stm32.
pub const PLL3_N: u32 = 48;

/// PLL3 P divider: 614.4 MHz / 50 = 12.288 MHz.
/// Corresponds to PllDiv::DIV50 in embassy-stm32.
pub const PLL3_P: u32 = 50;

/// Computed PLL3P clock (SAI kernel clock) in Hz using u64 arithmetic.
// The intermediate u64 arithmetic prevents overflow; the final value (≈12 MHz) fits in u32.
#[allow(clippy::cast_possible_truncation)]
pub const PLL3P_HZ: u32 =
    (HSI_HZ as u64 * PLL3_N as u64 / (PLL3_M as u64 * PLL3_P as u64)) as u32;

/// SAI MCKDIV value: the kernel clock is already 256 x fs, so MCLK is not divided.
pub const SAI_MCKDIV: u32 = PLL3P_HZ / MCLK_TARGET_HZ;

/// Maximum allowed MCLK error (Hz). 120 Hz = 10 ppm at 12.288 MHz.
pub const MCLK_MAX_ERROR_HZ: u32 = 120;

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    /// RM0433 S8.7.14: VCO input must be in range 1-16 MHz.
    #[test]
    fn pll3_m_divider_gives_valid_vco_input() {
        let vco_input = HSI_HZ / PLL3_M;
        assert!(
            (1_000_000..=16_000_000).contains(&vco_input),
            "VCO input {vco_input} Hz outside 1-16 MHz (RM0433 S8.7.14)"
        );
    }

    /// RM0433 S8.7.14: PLL3 VCO output must be in range 192-836 MHz.
    #[test]
    fn pll3_n_gives_valid_vco_output() {
        let vco_output = HSI_HZ / PLL3_M * PLL3_N;
        assert!(
            (192_000_000..=836_000_000).contains(&vco_output),
            "VCO output {vco_output} Hz outside 192-836 MHz (RM0433 S8.7.14)"
        );
    }

    /// Primary correctness test; catches frequency regressions before hardware.
    #[test]
    fn pll3p_produces_mclk_within_tolerance() {
        let diff = i64::from(PLL3P_HZ) - i64::from(MCLK_TARGET_HZ);
        assert!(
            diff.unsigned_abs() <= u64::from(MCLK_MAX_ERROR_HZ),
            "PLL3P {PLL3P_HZ} Hz differs from {MCLK_TARGET_HZ} Hz by {diff} Hz"
        );
    }

    /// The 48 kHz family is reachable with integer dividers only.
    #[test]
    fn pll3p_is_exact() {
        assert_eq!(PLL3P_HZ, 12_288_000);
        assert_eq!(SAI_MCKDIV, 1);
    }

    /// Derived sample rate (MCLK / 256) equals the engine rate.
    #[test]
    fn mclk_yields_engine_sample_rate() {
        let engine = platform::EngineConfig::default();
        assert_eq!(PLL3P_HZ / MCLK_FS_RATIO, engine.sample_rate.get());
    }

    /// PLL3 M/N/P must match build_embassy_config() in boot.rs:
    /// PllPreDiv::DIV5 (M=5), PllMul::MUL48 (N=48), PllDiv::DIV50 (P=50).
    #[test]
    fn pll3_divisors_match_embassy_boot_config() {
        assert_eq!(PLL3_M, 5, "PLL3_M must match PllPreDiv::DIV5 in build_embassy_config()");
        assert_eq!(PLL3_N, 48, "PLL3_N must match PllMul::MUL48 in build_embassy_config()");
        assert_eq!(PLL3_P, 50, "PLL3_P must match PllDiv::DIV50 in build_embassy_config()");
    }
}
