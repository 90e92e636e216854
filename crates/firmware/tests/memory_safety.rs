//! Memory safety architecture tests.
// Architecture test file: expect/unwrap and cast lints are intentional.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
//! Tests verify buffer placement and flash-access invariants at declaration
//! level. Runtime address verification is done via assert! in main() startup.

const MAIN_RS: &str = include_str!("../src/main.rs");
const FLASH_RS: &str = include_str!("../src/flash.rs");
const BOOT_RS: &str = include_str!("../src/boot.rs");

/// SAI_TX must carry `#[link_section = ".axisram"]` directly on its declaration.
#[test]
fn sai_buffer_is_placed_in_axisram() {
    let link_section_pos = MAIN_RS
        .find(r#"link_section = ".axisram""#)
        .expect("SAI_TX must be placed in .axisram (DMA1-accessible, MPU non-cacheable)");
    let decl_pos = MAIN_RS
        .find("static mut SAI_TX")
        .expect("SAI_TX declaration");
    assert!(
        decl_pos > link_section_pos && decl_pos - link_section_pos < 200,
        "the .axisram attribute must be adjacent to the SAI_TX declaration"
    );
}

/// String-grep cannot prove the linker honoured the section, so main must
/// also check the address at runtime.
#[test]
fn firmware_has_runtime_dma_buffer_address_assertion() {
    assert!(MAIN_RS.contains("defmt::assert!"));
    assert!(
        MAIN_RS.contains("sai_buffer_region().contains("),
        "runtime assertion must check SAI_TX against the MPU region"
    );
}

/// `.axisram` is NOLOAD; the buffer must be overwritten before the DMA sees it.
#[test]
fn sai_buffer_is_cleared_before_use() {
    let clear = MAIN_RS.find("*tx = SaiTxBuffer::silent()").expect("clear");
    let spawn = MAIN_RS.find("audio_task(").expect("spawn");
    assert!(clear < spawn);
}

/// MPU must be programmed before embassy init and before any cache enable.
#[test]
fn memory_system_configured_before_embassy_init() {
    let mem = MAIN_RS.find("configure_memory_system()").expect("MPU/cache setup");
    let init = MAIN_RS.find("embassy_stm32::init(").expect("embassy init");
    assert!(mem < init);

    let mpu = BOOT_RS.find("apply_mpu_config(&mut cp.MPU)").expect("MPU call");
    let dcache = BOOT_RS.find("enable_dcache").expect("D-cache enable");
    assert!(mpu < dcache, "MPU must be configured before enabling D-cache");
}

/// main must never boot with the default RCC config (SAI1 would have no
/// PLL3 clock).
#[test]
fn main_uses_board_rcc_config() {
    assert!(MAIN_RS.contains("embassy_stm32::init(firmware::boot::build_embassy_config())"));
    assert!(!MAIN_RS.contains("embassy_stm32::init(Default::default())"));
}

/// SAI1 resets to PLL1_Q, which the board config leaves off. The mux is set
/// through the PAC once PLL3 runs and before the SAI is touched.
#[test]
fn sai1_kernel_clock_selected_after_init() {
    let init = MAIN_RS.find("embassy_stm32::init(").expect("embassy init");
    let select = MAIN_RS
        .find("select_sai1_kernel_clock()")
        .expect("SAI1 kernel clock mux must be set in main");
    let spawn = MAIN_RS.find("audio_task(").expect("spawn");
    assert!(init < select && select < spawn);

    assert!(BOOT_RS.contains("set_sai1sel(pac::rcc::vals::Saisel::PLL3_P)"));
    assert!(
        !BOOT_RS.contains("rcc.mux"),
        "the pinned HAL's RCC config has no kernel-clock mux field"
    );
}

/// The PLL3 block in the RCC config must use the dividers `clock_math`
/// proves out.
#[test]
fn pll3_config_matches_clock_math() {
    use firmware::audio::clock_math::{PLL3_M, PLL3_N, PLL3_P};

    let start = BOOT_RS.find("config.rcc.pll3 = Some(Pll {").expect("PLL3 config");
    let len = BOOT_RS[start..].find("});").expect("end of PLL3 config");
    let block = &BOOT_RS[start..start + len];

    assert!(block.contains(&format!("prediv: PllPreDiv::DIV{PLL3_M},")), "{block}");
    assert!(block.contains(&format!("mul: PllMul::MUL{PLL3_N},")), "{block}");
    assert!(block.contains(&format!("divp: Some(PllDiv::DIV{PLL3_P}),")), "{block}");
}

/// Rejection is logged once, by the diagnostics sink, not again by main.
#[test]
fn rejection_is_not_logged_twice() {
    assert!(!MAIN_RS.contains("sample rejected"));
    assert!(MAIN_RS.contains("LOAD_HINT"));
}

/// The header dump and validation trace must survive `DEFMT_LOG=info`.
#[test]
fn load_trace_is_not_compiled_out_by_default() {
    let diagnostics = include_str!("../src/diagnostics.rs");
    assert!(!diagnostics.contains("defmt::debug!"));
    assert!(!diagnostics.contains("defmt::trace!"));
    assert!(diagnostics.contains("LoadEvent::HeaderRow"));
}

/// Only the XiP driver turns the flash window into a slice, and every path to
/// it goes through the D-cache invalidate.
#[test]
fn raw_flash_window_access_is_confined_to_flash_rs() {
    assert!(!MAIN_RS.contains("0x9000_0000"));
    assert!(!MAIN_RS.contains("from_raw_parts"));
    assert!(FLASH_RS.contains("from_raw_parts"));
    assert!(FLASH_RS.contains("invalidate_dcache_by_address"));
}
