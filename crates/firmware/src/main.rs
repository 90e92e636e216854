//! Flashloop firmware - Main Entry Point
//!
//! Hardware-only entry point for STM32H743ZI.

#![no_std]
#![no_main]

use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_time::Delay;

use firmware::audio::SaiResources;
use firmware::diagnostics::DefmtDiagnostics;
use firmware::dma::SaiTxBuffer;
use firmware::flash::QspiPins;
use firmware::{load_sample_image, StatusIndicator};
use platform::config::{boot_banner, APP_VERSION, LOAD_HINT, PLAY_HINT};
use platform::flash::len_u32;
use platform::mpu::sai_buffer_region;

// Panic handler
use panic_probe as _;
use defmt_rtt as _;

// SAI TX ring buffer in AXI SRAM (non-cacheable via MPU, DMA1-accessible).
// NOLOAD: contents are undefined until main overwrites them.
#[link_section = ".axisram"]
static mut SAI_TX: SaiTxBuffer = SaiTxBuffer::silent();

// Audio runs above thread mode so status logging never delays a block.
static EXECUTOR_AUDIO: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
#[allow(unsafe_code, non_snake_case)]
unsafe fn UART4() {
    // SAFETY: UART4 is unused as a peripheral; its vector only drives the
    // audio executor.
    unsafe { EXECUTOR_AUDIO.on_interrupt() }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    // Steps 1-2: MPU before D-cache. See firmware::boot::BOOT_SEQUENCE_STEPS.
    firmware::boot::hardware::configure_memory_system();

    defmt::info!("{=str} v{=str}", boot_banner(), APP_VERSION);

    // Step 3: clocks (PLL3P feeds SAI1)
    let p = embassy_stm32::init(firmware::boot::build_embassy_config());
    firmware::boot::hardware::select_sai1_kernel_clock();

    // Step 4: QSPI XiP
    let mut flash = firmware::flash::enable_memory_mapped(
        p.QUADSPI,
        QspiPins {
            d0: p.PF8,
            d1: p.PF9,
            d2: p.PF7,
            d3: p.PF6,
            sck: p.PF10,
            nss: p.PG6,
        },
    );

    // Step 5: load
    let outcome = load_sample_image(&mut flash, &mut DefmtDiagnostics);
    match outcome.error {
        None => defmt::info!("{=str}", PLAY_HINT),
        // The cause was already logged by DefmtDiagnostics.
        Some(_) => defmt::info!("{=str}", LOAD_HINT),
    }

    // Step 6: audio
    #[allow(unsafe_code)]
    // SAFETY: the only reference ever taken to SAI_TX, handed to the audio
    // task for the rest of the program.
    let tx: &'static mut SaiTxBuffer = unsafe { &mut *core::ptr::addr_of_mut!(SAI_TX) };
    *tx = SaiTxBuffer::silent();
    let tx_addr = core::ptr::addr_of!(*tx) as u32;
    defmt::assert!(
        sai_buffer_region().contains(tx_addr, len_u32(core::mem::size_of::<SaiTxBuffer>())),
        "SAI buffer must be in the non-cacheable AXI SRAM region"
    );

    interrupt::UART4.set_priority(Priority::P6);
    let audio_spawner = EXECUTOR_AUDIO.start(interrupt::UART4);
    let res = SaiResources {
        sai: p.SAI1,
        sck: p.PE5,
        sd: p.PE6,
        fs: p.PE4,
        mclk: p.PE2,
        dma: p.DMA1_CH0,
    };
    if audio_spawner
        .spawn(firmware::audio::audio_task(res, outcome.converter, tx))
        .is_err()
    {
        defmt::error!("audio task spawn failed");
    }

    // Step 7: status LED (LD1 on NUCLEO-H743ZI2)
    let led = Output::new(p.PB0, Level::Low, Speed::Low);
    defmt::info!(
        "status: {} ({=u32} ms toggle)",
        outcome.cadence,
        outcome.cadence.toggle_period_ms()
    );
    StatusIndicator::new(led, Delay, outcome.cadence).run().await;
}
