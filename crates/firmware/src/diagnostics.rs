//! Load diagnostics over defmt/RTT.
//!
//! Everything but the rejection is `info`, so the header dump, tag checks
//! and field values survive the default `DEFMT_LOG=info` build.

use playback::{Diagnostics, LoadEvent};

/// Forwards load events to defmt.
#[derive(Debug, Default)]
pub struct DefmtDiagnostics;

impl Diagnostics for DefmtDiagnostics {
    fn record(&mut self, event: &LoadEvent) {
        match event {
            LoadEvent::Reading { offset } => {
                defmt::info!("Reading sample from QSPI (flash offset {=u32:#010X})...", offset);
            }
            LoadEvent::HeaderRow { offset, bytes } => {
                defmt::info!("  header +{=u8}: {=[u8]:#04x}", offset, bytes.as_slice());
            }
            LoadEvent::TagOk(tag) => defmt::info!("  tag {} ok", tag),
            LoadEvent::Fields(h) => defmt::info!(
                "  format={=u16} channels={=u16} rate={=u32} byte_rate={=u32} align={=u16} bits={=u16} data_size={=u32}",
                h.format,
                h.channels,
                h.sample_rate,
                h.byte_rate,
                h.block_align,
                h.bits_per_sample,
                h.data_size
            ),
            LoadEvent::Accepted(s) => defmt::info!(
                "WAV loaded: {=u32} Hz, {=u16} ch, {=u16} bit, {=u32} bytes",
                s.sample_rate,
                s.channels,
                s.bits_per_sample,
                s.data_size
            ),
            LoadEvent::Rejected(e) => defmt::error!("WAV rejected: {}", e),
        }
    }
}
