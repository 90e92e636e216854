//! SAI audio output task: pulls blocks from the converter and streams them
//! to SAI1 Block A via DMA.
//!
//! # Hardware: SAI1 Block A (master), 32-bit I2S, 48 kHz, PLL3 MCLK = 12.288 MHz
//! # DMA: DMA1 Stream 0, circular, ring buffer in AXI SRAM (`.axisram`)
//!
//! ## SAI1 Pin Assignments (STM32H743ZI LQFP-144)
//!   - PE2  → SAI1_MCLK_A  (master clock out, 256×fs)
//!   - PE4  → SAI1_FS_A    (frame sync / L/R clock)
//!   - PE5  → SAI1_SCK_A   (bit clock)
//!   - PE6  → SAI1_SD_A    (serial data out)
//!
//! ## Data path
//!
//! ```text
//! StreamingConverter::process(left[..n], right[..n])   f32, [-1.0, 1.0)
//!        │ interleave_block
//!        ▼
//! words: [L0, R0, L1, R1, …]   i32 full scale, left-justified in u32
//!        │ Sai::write (awaits free space in the DMA ring)
//!        ▼
//! SAI_TX ring buffer (.axisram) ──DMA──► SAI1_A FIFO
//! ```
//!
//! The converter is moved into this task at spawn time and never shared, so
//! the playback cursor needs no lock or atomic.
//!
//! Reference: STM32H7 RM0433 Rev 9, section 51 (SAI), section 15 (DMA).

use platform::dma_safety::{MAX_BLOCK_FRAMES, OUTPUT_CHANNELS};
use platform::{AudioCallback, EngineConfig};

/// Full-scale multiplier for 32-bit SAI words (2^31).
const S32_FULL_SCALE: f64 = 2_147_483_648.0;

/// Encode one normalized sample as a 32-bit SAI data word.
///
/// Values outside `[-1.0, 1.0)` saturate to the i32 range; NaN encodes as 0.
pub fn encode_sample(sample: f32) -> u32 {
    // `as i32` on a float saturates and maps NaN to 0.
    let word = (f64::from(sample) * S32_FULL_SCALE) as i32;
    word as u32
}

/// Interleave `left`/`right` into `out` as `[L0, R0, L1, R1, …]`.
///
/// Writes as many whole frames as fit in all three buffers and returns the
/// number of frames written.
pub fn interleave_block(left: &[f32], right: &[f32], out: &mut [u32]) -> usize {
    let mut frames = 0usize;
    for ((l, r), pair) in left
        .iter()
        .zip(right.iter())
        .zip(out.chunks_exact_mut(OUTPUT_CHANNELS))
    {
        if let [wl, wr] = pair {
            *wl = encode_sample(*l);
            *wr = encode_sample(*r);
        }
        frames = frames.saturating_add(1);
    }
    frames
}

/// Drives an [`AudioCallback`] one engine block at a time.
///
/// Holds the per-channel scratch buffers so the callback always sees exactly
/// `config.block_frames` frames, as the engine contract promises.
pub struct BlockStreamer<C> {
    callback: C,
    config: EngineConfig,
    left: [f32; MAX_BLOCK_FRAMES],
    right: [f32; MAX_BLOCK_FRAMES],
}

impl<C: AudioCallback> BlockStreamer<C> {
    /// Wrap `callback` for blocks of `config.block_frames` frames.
    #[allow(clippy::large_stack_arrays)] // 2 KB scratch lives in the task future
    pub fn new(callback: C, config: EngineConfig) -> Self {
        Self {
            callback,
            config,
            left: [0.0; MAX_BLOCK_FRAMES],
            right: [0.0; MAX_BLOCK_FRAMES],
        }
    }

    /// Engine contract this streamer follows.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// The wrapped callback.
    pub fn callback(&self) -> &C {
        &self.callback
    }

    /// Render one block into `out` and return the number of words written.
    ///
    /// `out` should hold `block_frames × 2` words; a shorter buffer gets a
    /// shorter block rather than a partial frame.
    pub fn next_block(&mut self, out: &mut [u32]) -> usize {
        let frames = self
            .config
            .block_len()
            .min(out.len() / OUTPUT_CHANNELS)
            .min(MAX_BLOCK_FRAMES);
        let (Some(left), Some(right)) = (self.left.get_mut(..frames), self.right.get_mut(..frames))
        else {
            return 0;
        };
        self.callback.process(left, right);
        interleave_block(left, right, out).saturating_mul(OUTPUT_CHANNELS)
    }
}

#[cfg(feature = "hardware")]
pub use hardware::{audio_task, SaiResources};

#[cfg(feature = "hardware")]
mod hardware {
    use embassy_stm32::peripherals::{DMA1_CH0, PE2, PE4, PE5, PE6, SAI1};
    use embassy_stm32::sai::{
        self, split_subblocks, BitOrder, ClockStrobe, DataSize, FrameSyncDefinition,
        FrameSyncOffset, FrameSyncPolarity, MasterClockDivider, Mode, Sai, SlotSize, StereoMono,
        TxRx,
    };
    use platform::dma_safety::{MAX_BLOCK_FRAMES, OUTPUT_CHANNELS};
    use platform::EngineConfig;
    use playback::StreamingConverter;

    use super::BlockStreamer;
    use crate::dma::SaiTxBuffer;

    /// Peripherals owned by the audio task.
    pub struct SaiResources {
        /// SAI1 (Block A is used, Block B stays idle).
        pub sai: SAI1,
        /// SAI1_SCK_A.
        pub sck: PE5,
        /// SAI1_SD_A.
        pub sd: PE6,
        /// SAI1_FS_A.
        pub fs: PE4,
        /// SAI1_MCLK_A.
        pub mclk: PE2,
        /// TX DMA channel.
        pub dma: DMA1_CH0,
    }

    /// 32-bit I2S, two slots, master transmitter, MCLK = kernel clock.
    fn sai_config() -> sai::Config {
        let mut config = sai::Config::default();
        config.mode = Mode::Master;
        config.tx_rx = TxRx::Transmitter;
        config.stereo_mono = StereoMono::Stereo;
        config.data_size = DataSize::Data32;
        config.slot_size = SlotSize::Channel32;
        config.slot_count = sai::word::U4(2);
        config.slot_enable = 0b11;
        config.frame_length = 64;
        config.frame_sync_active_level_length = sai::word::U7(32);
        config.frame_sync_definition = FrameSyncDefinition::ChannelIdentification;
        config.frame_sync_offset = FrameSyncOffset::BeforeFirstBit;
        config.frame_sync_polarity = FrameSyncPolarity::ActiveLow;
        config.clock_strobe = ClockStrobe::Falling;
        config.bit_order = BitOrder::MsbFirst;
        // PLL3P is already 256 × fs (see clock_math::SAI_MCKDIV).
        config.master_clock_divider = MasterClockDivider::MasterClockDisabled;
        config
    }

    /// Audio task: stream converter output to SAI1 until power loss.
    ///
    /// A failed `write` (FIFO/DMA overrun, embassy issue #3205) leaves the
    /// driver stuck, so the driver is dropped and rebuilt from the same
    /// peripherals. The converter keeps its cursor across restarts.
    #[embassy_executor::task]
    pub async fn audio_task(
        mut res: SaiResources,
        converter: StreamingConverter<'static>,
        tx: &'static mut SaiTxBuffer,
    ) {
        let mut streamer = BlockStreamer::new(converter, EngineConfig::default());
        let mut words = [0u32; MAX_BLOCK_FRAMES * OUTPUT_CHANNELS];
        let mut restarts: u32 = 0;

        defmt::info!(
            "audio: SAI1_A {=u32} Hz, {=u16}-frame blocks, {=u32} us deadline",
            streamer.config().sample_rate.get(),
            streamer.config().block_frames.get(),
            streamer.config().block_period_us()
        );

        loop {
            let (sub_a, _sub_b) = split_subblocks(&mut res.sai);
            let mut sai = Sai::new_asynchronous_with_mclk(
                sub_a,
                &mut res.sck,
                &mut res.sd,
                &mut res.fs,
                &mut res.mclk,
                &mut res.dma,
                tx.0.as_mut_slice(),
                sai_config(),
            );

            loop {
                let n = streamer.next_block(&mut words);
                let Some(block) = words.get(..n) else { break };
                if let Err(e) = sai.write(block).await {
                    defmt::warn!("audio: SAI write failed ({}), rebuilding driver", e);
                    break;
                }
            }

            restarts = restarts.saturating_add(1);
            defmt::info!("audio: SAI restart #{=u32}", restarts);
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use playback::{PlaybackBinding, SampleFormat, StreamingConverter};

    #[test]
    fn encode_full_scale_and_zero() {
        assert_eq!(encode_sample(0.0), 0);
        assert_eq!(encode_sample(-1.0), i32::MIN as u32);
        assert_eq!(encode_sample(0.5), 0x4000_0000);
    }

    #[test]
    fn encode_saturates_out_of_range() {
        assert_eq!(encode_sample(1.0), i32::MAX as u32);
        assert_eq!(encode_sample(7.5), i32::MAX as u32);
        assert_eq!(encode_sample(-3.0), i32::MIN as u32);
        assert_eq!(encode_sample(f32::NAN), 0);
    }

    #[test]
    fn interleave_orders_left_then_right() {
        let mut out = [0u32; 6];
        let frames = interleave_block(&[0.5, 0.0, -1.0], &[0.0, 0.5, -1.0], &mut out);
        assert_eq!(frames, 3);
        assert_eq!(
            out,
            [0x4000_0000, 0, 0, 0x4000_0000, i32::MIN as u32, i32::MIN as u32]
        );
    }

    #[test]
    fn interleave_stops_at_shortest_buffer() {
        let mut out = [7u32; 3];
        assert_eq!(interleave_block(&[0.0; 4], &[0.0; 4], &mut out), 1);
        assert_eq!(out[2], 7, "no half frame is written");
    }

    #[test]
    fn streamer_renders_engine_sized_blocks() {
        let payload = [0x00u8, 0x40]; // one S16 sample = 0.5
        let conv = StreamingConverter::new(Some(PlaybackBinding::new(&payload, SampleFormat::S16, 48_000)));
        let mut streamer = BlockStreamer::new(conv, EngineConfig::default());
        let mut words = [0u32; MAX_BLOCK_FRAMES * OUTPUT_CHANNELS];
        assert_eq!(streamer.next_block(&mut words), 96, "48 frames × 2 channels");
        assert!(words[..96].iter().all(|&w| w == 0x4000_0000));
        assert!(words[96..].iter().all(|&w| w == 0));
    }

    #[test]
    fn streamer_silence_encodes_zero_words() {
        let mut streamer = BlockStreamer::new(StreamingConverter::silent(), EngineConfig::default());
        let mut words = [0xFFFF_FFFFu32; 96];
        assert_eq!(streamer.next_block(&mut words), 96);
        assert!(words.iter().all(|&w| w == 0));
    }

    #[test]
    fn streamer_clamps_to_short_output() {
        let mut streamer = BlockStreamer::new(StreamingConverter::silent(), EngineConfig::default());
        let mut words = [1u32; 9];
        assert_eq!(streamer.next_block(&mut words), 8);
        assert_eq!(words[8], 1);
    }
}
