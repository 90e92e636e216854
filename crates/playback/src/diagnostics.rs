//! Diagnostic records emitted while loading a sample image.
//!
//! The loader never logs directly. It hands [`LoadEvent`]s to a
//! [`Diagnostics`] sink: the firmware forwards them to defmt over RTT, the
//! host inspector to `tracing`, tests collect them.

use core::fmt;

use crate::error::LoadError;
use crate::header::{FourCc, Tag, WavHeader};

/// Number of header dump rows (4 bytes each).
pub const HEADER_ROWS: usize = 11;

/// Summary of an accepted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadSummary {
    /// Declared sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (always 1 once accepted).
    pub channels: u16,
    /// Bits per sample (16 or 32).
    pub bits_per_sample: u16,
    /// Declared payload length in bytes.
    pub data_size: u32,
}

/// One step of the load sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadEvent {
    /// About to read the header at this flash offset.
    Reading {
        /// Flash offset of the header.
        offset: u32,
    },
    /// Four raw header bytes.
    HeaderRow {
        /// Offset of the row within the header.
        offset: u8,
        /// Row contents.
        bytes: [u8; 4],
    },
    /// A magic tag matched.
    TagOk(Tag),
    /// All tags matched; the decoded field values.
    Fields(WavHeader),
    /// The image was accepted.
    Accepted(LoadSummary),
    /// The image was rejected; no further checks run.
    Rejected(LoadError),
}

impl fmt::Display for LoadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading { offset } => write!(f, "reading sample header at flash 0x{offset:08X}"),
            Self::HeaderRow { offset, bytes } => {
                let [a, b, c, d] = *bytes;
                write!(
                    f,
                    "  +{offset:02}: {a:02X} {b:02X} {c:02X} {d:02X}  {}",
                    FourCc(*bytes)
                )
            }
            Self::TagOk(tag) => write!(f, "tag {tag} ok"),
            Self::Fields(h) => write!(
                f,
                "format={} channels={} rate={} byte_rate={} align={} bits={} data_size={}",
                h.format,
                h.channels,
                h.sample_rate,
                h.byte_rate,
                h.block_align,
                h.bits_per_sample,
                h.data_size
            ),
            Self::Accepted(s) => write!(
                f,
                "sample loaded: {} Hz, {} ch, {} bit, {} bytes",
                s.sample_rate, s.channels, s.bits_per_sample, s.data_size
            ),
            Self::Rejected(e) => write!(f, "sample rejected: {e}"),
        }
    }
}

impl LoadEvent {
    /// `true` for the verdict that refuses the image. Every other event is
    /// part of the normal load trace and is logged at info level.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Sink for [`LoadEvent`]s.
pub trait Diagnostics {
    /// Record one event. Must not fail; sinks drop what they cannot keep.
    fn record(&mut self, event: &LoadEvent);
}

impl<T: Diagnostics + ?Sized> Diagnostics for &mut T {
    fn record(&mut self, event: &LoadEvent) {
        (**self).record(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn record(&mut self, _event: &LoadEvent) {}
}

/// Collects events in memory, for tests and host tooling.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    /// Events in emission order.
    pub events: std::vec::Vec<LoadEvent>,
}

#[cfg(any(test, feature = "std"))]
impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// The rejection record, if the load failed.
    pub fn rejection(&self) -> Option<LoadError> {
        self.events.iter().find_map(|e| match e {
            LoadEvent::Rejected(err) => Some(*err),
            _ => None,
        })
    }

    /// Number of header dump rows recorded.
    pub fn header_rows(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, LoadEvent::HeaderRow { .. }))
            .count()
    }
}

#[cfg(any(test, feature = "std"))]
impl Diagnostics for EventLog {
    fn record(&mut self, event: &LoadEvent) {
        self.events.push(*event);
    }
}
