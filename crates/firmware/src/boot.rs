//! Hardware boot sequence for the Flashloop player.
//!
//! Initialization order:
//!   1. Configure MPU (AXI SRAM non-cacheable, it holds the SAI DMA buffer)
//!   2. Enable I-cache and D-cache
//!   3. RCC: PLL1 system clock, PLL3P as the SAI1 kernel clock
//!   4. QUADSPI into memory-mapped mode
//!   5. Load the sample image (parse + validate the container header)
//!   6. Spawn the audio task, bound or silent
//!   7. Blink the status LED
//!
//! Steps 5 onward never abort: a rejected image still yields a running
//! (silent) audio path and a fast blink.
//!
//! # Safety
//! Steps 1 and 2 must run from privileged mode before any task starts.

use platform::qspi_config::partitions;
use platform::FlashRegion;
use playback::{load_sample, Diagnostics, LoadError, StreamingConverter};

use crate::status::StatusCadence;

/// Ordered list of boot sequence steps for documentation and testing.
///
/// # Correctness Invariants
///
/// - MPU must be configured BEFORE enabling D-cache (ARM AN4838/AN4839),
///   otherwise SAI DMA reads stale lines from the TX buffer.
/// - QSPI must be memory-mapped before the sample is loaded.
/// - The audio task is spawned whether or not loading succeeded.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. MPU: mark AXI SRAM non-cacheable before any DMA use",
    "2. Cache: enable I-cache and D-cache after MPU is configured",
    "3. RCC: PLL1 400 MHz sysclk, PLL3P 12.288 MHz SAI1 kernel clock",
    "4. QSPI: W25Q128JV memory-mapped at 0x9000_0000",
    "5. Load: parse and validate the container header from flash",
    "6. Audio: spawn SAI task (silence if loading failed)",
    "7. Status: blink LED at the load cadence",
];

// ── RCC clock configuration ───────────────────────────────────────────────────

/// Build the `embassy_stm32::Config` with the RCC settings this board needs.
///
/// ```text
/// HSI 64 MHz ─┬─ /4 ×50 = 800 MHz VCO ─ /2 ─► PLL1_P 400 MHz  sysclk
///             └─ /5 ×48 = 614.4 MHz VCO ─ /50 ─► PLL3_P 12.288 MHz  SAI1 (256 × 48 kHz)
/// AHB 200 MHz ─► QUADSPI kernel (HCLK3), prescaler 1 → 100 MHz
/// ```
///
/// The PLL3 divider values mirror [`crate::audio::clock_math`], which checks
/// them against the 48 kHz × 256 master-clock target in host tests.
/// SAI1 resets to PLL1_Q, which stays off here, so `main` must follow
/// `embassy_stm32::init` with [`hardware::select_sai1_kernel_clock`].
#[cfg(feature = "hardware")]
pub fn build_embassy_config() -> embassy_stm32::Config {
    use embassy_stm32::rcc::*;

    let mut config = embassy_stm32::Config::default();

    // ── Oscillators ─────────────────────────────────────────────────────────
    config.rcc.hsi = Some(HSIPrescaler::DIV1);
    config.rcc.csi = true;

    // ── PLL1: system clock ───────────────────────────────────────────────────
    config.rcc.pll1 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL50,
        divp: Some(PllDiv::DIV2), // 400 MHz
        divq: None,
        divr: None,
    });

    // ── PLL3: SAI1 kernel clock ──────────────────────────────────────────────
    // 64 MHz / 5 = 12.8 MHz ref (within the 8-16 MHz wide-range input)
    // × 48 = 614.4 MHz VCO / 50 = 12.288 MHz = 256 × 48 kHz exactly
    config.rcc.pll3 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV5,
        mul: PllMul::MUL48,
        divp: Some(PllDiv::DIV50),
        divq: None,
        divr: None,
    });
    // The kernel-clock mux is not part of this HAL's RCC config; see
    // `hardware::select_sai1_kernel_clock`.

    // ── System clock + bus prescalers ────────────────────────────────────────
    config.rcc.sys = Sysclk::PLL1_P; // 400 MHz
    config.rcc.ahb_pre = AHBPrescaler::DIV2; // 200 MHz, also QUADSPI kernel
    config.rcc.apb1_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb2_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb3_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb4_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.voltage_scale = VoltageScale::Scale1;

    config
}

// ── Sample load ──────────────────────────────────────────────────────────────

/// Result of the load step: everything the rest of boot needs.
pub struct LoadOutcome<'f> {
    /// Converter handed to the audio task; silent if loading failed.
    pub converter: StreamingConverter<'f>,
    /// LED cadence matching the outcome.
    pub cadence: StatusCadence,
    /// Why loading failed, if it did.
    pub error: Option<LoadError>,
}

impl LoadOutcome<'_> {
    /// `true` if a sample is bound.
    pub fn is_loaded(&self) -> bool {
        self.error.is_none()
    }
}

/// Parse, validate and bind the sample image at its flash partition.
///
/// Never fails: a rejected image produces a silent converter and the
/// [`StatusCadence::Failed`] blink, with the cause kept in
/// [`LoadOutcome::error`] and already reported through `diag`.
pub fn load_sample_image<'f, F, D>(flash: &mut F, diag: &mut D) -> LoadOutcome<'f>
where
    F: FlashRegion<'f>,
    D: Diagnostics,
{
    let result = load_sample(flash, partitions::SAMPLE_HEADER, diag);
    let cadence = StatusCadence::from_loaded(result.is_ok());
    let error = result.as_ref().err().copied();
    LoadOutcome {
        converter: StreamingConverter::new(result.ok()),
        cadence,
        error,
    }
}

// ── Hardware-only init ────────────────────────────────────────────────────────
//
// Only compiled when targeting real hardware. Host tests never link it.

#[cfg(feature = "hardware")]
pub mod hardware {
    //! MPU and cache setup on the Cortex-M7 core.

    /// Program the MPU regions from [`platform::mpu::register_pairs`].
    ///
    /// # Safety
    ///
    /// - Must be called before enabling the D-cache.
    /// - Must be called before any DMA peripheral is initialized.
    /// - Must be called from privileged mode.
    #[allow(unsafe_code)]
    pub unsafe fn apply_mpu_config(mpu: &mut cortex_m::peripheral::MPU) {
        // Disable before reconfiguring (ARM DDI0489F §B3.5.1).
        unsafe {
            mpu.ctrl.write(0);
        }

        // RBAR carries VALID=1, so each write selects its own slot.
        for (rbar, rasr) in platform::mpu::register_pairs() {
            unsafe {
                mpu.rbar.write(rbar);
                mpu.rasr.write(rasr);
            }
        }

        // ENABLE | PRIVDEFENA: unmapped regions keep the default memory map.
        unsafe {
            mpu.ctrl.write(0b101);
        }

        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }

    /// Route PLL3_P to the SAI1 kernel clock (`RCC_D2CCIP1R.SAI1SEL`).
    ///
    /// Call after `embassy_stm32::init` has started PLL3 and before SAI1 is
    /// enabled; the mux must not change under a running SAI.
    pub fn select_sai1_kernel_clock() {
        use embassy_stm32::pac;

        pac::RCC
            .d2ccip1r()
            .modify(|w| w.set_sai1sel(pac::rcc::vals::Saisel::PLL3_P));
        defmt::debug!("rcc: SAI1 kernel clock = PLL3_P");
    }

    /// Boot steps 1 and 2: MPU, then I-cache and D-cache.
    ///
    /// Call as the first statement of `main`, before `embassy_stm32::init()`.
    #[allow(unsafe_code)]
    pub fn configure_memory_system() {
        // SAFETY: called once at boot before any task or interrupt handler
        // runs; nothing else holds the core peripherals yet.
        let mut cp = unsafe { cortex_m::Peripherals::steal() };
        // SAFETY: D-cache still off, no DMA running.
        unsafe { apply_mpu_config(&mut cp.MPU) };
        cp.SCB.enable_icache();
        cp.SCB.enable_dcache(&mut cp.CPUID);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use platform::mocks::MockFlash;
    use playback::diagnostics::EventLog;
    use playback::WavHeader;

    fn image_with(header: &WavHeader, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xFF; partitions::SAMPLE_HEADER as usize];
        bytes.extend_from_slice(&header.encode());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_boot_sequence_order() {
        let pos = |needle: &str| {
            BOOT_SEQUENCE_STEPS
                .iter()
                .position(|s| s.contains(needle))
                .expect("step present")
        };
        assert!(pos("MPU") < pos("D-cache"), "MPU before D-cache");
        assert!(pos("QSPI") < pos("Load"), "map flash before loading");
        assert!(pos("Load") < pos("Audio"));
    }

    #[test]
    fn test_boot_steps_name_pll3_rate() {
        assert!(BOOT_SEQUENCE_STEPS
            .iter()
            .any(|s| s.contains("PLL3P 12.288 MHz")));
    }

    #[test]
    fn test_load_valid_image_binds_converter() {
        let header = WavHeader::pcm_mono(48_000, 16, 4);
        let bytes = image_with(&header, &[0x00, 0x40, 0x00, 0xC0]);
        let mut flash = MockFlash::new(&bytes);
        let mut log = EventLog::new();

        let mut outcome = load_sample_image(&mut flash, &mut log);

        assert!(outcome.is_loaded());
        assert_eq!(outcome.cadence, StatusCadence::Loaded);
        assert_eq!(outcome.converter.next_sample(), 0.5);
        assert_eq!(outcome.converter.next_sample(), -0.5);
        assert!(flash.every_access_invalidated());
    }

    #[test]
    fn test_load_rejected_image_is_silent_and_fast_blink() {
        let mut header = WavHeader::pcm_mono(48_000, 16, 4);
        header.channels = 2;
        let bytes = image_with(&header, &[0x00, 0x40, 0x00, 0xC0]);
        let mut flash = MockFlash::new(&bytes);
        let mut log = EventLog::new();

        let mut outcome = load_sample_image(&mut flash, &mut log);

        assert!(!outcome.is_loaded());
        assert_eq!(outcome.cadence, StatusCadence::Failed);
        assert_eq!(outcome.error, log.rejection());
        assert_eq!(outcome.error, Some(LoadError::UnsupportedChannels(2)));
        assert_eq!(outcome.converter.next_sample(), 0.0);
    }

    #[test]
    fn test_load_blank_flash_fails_on_tag() {
        let bytes = vec![0xFF; 0x2000];
        let mut flash = MockFlash::new(&bytes);
        let outcome = load_sample_image(&mut flash, &mut EventLog::new());
        assert!(matches!(outcome.error, Some(LoadError::BadTag { .. })));
    }
}
