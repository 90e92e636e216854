//! Mock implementations for testing
//!
//! Host-side stand-ins for the hardware seams, with enough bookkeeping for
//! tests to assert on *how* they were used (cache maintenance order, pin
//! toggles, delay cadence), not just on the data returned.

#![cfg(any(test, feature = "std"))]

use core::convert::Infallible;

use crate::flash::{check_range, len_u32, CacheSpan, FlashError, FlashRegion};
use crate::qspi_config::QSPI_BASE_ADDR;

/// Maximum number of accesses a [`MockFlash`] remembers.
pub const ACCESS_LOG_CAPACITY: usize = 64;

/// One operation observed by [`MockFlash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashAccess {
    /// D-cache invalidate of a cache-line aligned span (CPU addresses).
    Invalidate {
        /// Span that was invalidated.
        span: CacheSpan,
    },
    /// Bytes copied out of flash.
    Read {
        /// Flash offset of the copy.
        offset: u32,
        /// Number of bytes copied.
        len: u32,
    },
    /// Window lent out for zero-copy reads.
    Map {
        /// Flash offset of the window.
        offset: u32,
        /// Length of the window.
        len: u32,
    },
}

/// Mock QSPI flash backed by a byte slice, mapped at `QSPI_BASE_ADDR`.
///
/// Behaves like the XiP driver: every read or map is preceded by an
/// invalidate of the covering cache lines, and every step is logged.
pub struct MockFlash<'f> {
    bytes: &'f [u8],
    log: heapless::Vec<FlashAccess, ACCESS_LOG_CAPACITY>,
    skip_invalidate: bool,
}

impl<'f> MockFlash<'f> {
    /// Create a mock flash whose offset 0 holds `bytes[0]`.
    pub fn new(bytes: &'f [u8]) -> Self {
        Self {
            bytes,
            log: heapless::Vec::new(),
            skip_invalidate: false,
        }
    }

    /// Create a mock that "forgets" cache maintenance, for negative tests.
    pub fn without_invalidate(bytes: &'f [u8]) -> Self {
        Self {
            skip_invalidate: true,
            ..Self::new(bytes)
        }
    }

    /// Accesses observed so far, oldest first.
    pub fn log(&self) -> &[FlashAccess] {
        &self.log
    }

    /// `true` if every read and map was preceded by an invalidate covering it.
    pub fn every_access_invalidated(&self) -> bool {
        let mut last_span: Option<CacheSpan> = None;
        for access in &self.log {
            match *access {
                FlashAccess::Invalidate { span } => last_span = Some(span),
                FlashAccess::Read { offset, len } | FlashAccess::Map { offset, len } => {
                    let covered = last_span.is_some_and(|span| {
                        QSPI_BASE_ADDR
                            .checked_add(offset)
                            .is_some_and(|addr| span.contains(addr, len))
                    });
                    if !covered {
                        return false;
                    }
                    last_span = None;
                }
            }
        }
        true
    }

    fn record(&mut self, access: FlashAccess) {
        // A full log keeps the oldest entries; tests never get near the cap.
        let _ = self.log.push(access);
    }

    fn invalidate(&mut self, offset: u32, len: u32) -> Result<(), FlashError> {
        check_range(offset, len, self.capacity())?;
        if self.skip_invalidate {
            return Ok(());
        }
        let span = QSPI_BASE_ADDR
            .checked_add(offset)
            .and_then(|addr| CacheSpan::covering(addr, len))
            .ok_or(FlashError::OutOfBounds {
                offset,
                len,
                capacity: self.capacity(),
            })?;
        self.record(FlashAccess::Invalidate { span });
        Ok(())
    }

    fn window(&self, offset: u32, len: u32) -> Result<&'f [u8], FlashError> {
        let err = FlashError::OutOfBounds {
            offset,
            len,
            capacity: self.capacity(),
        };
        let start = usize::try_from(offset).map_err(|_| err)?;
        let end = start
            .checked_add(usize::try_from(len).map_err(|_| err)?)
            .ok_or(err)?;
        self.bytes.get(start..end).ok_or(err)
    }
}

impl<'f> FlashRegion<'f> for MockFlash<'f> {
    fn capacity(&self) -> u32 {
        len_u32(self.bytes.len())
    }

    fn read_coherent(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let len = len_u32(buf.len());
        self.invalidate(offset, len)?;
        buf.copy_from_slice(self.window(offset, len)?);
        self.record(FlashAccess::Read { offset, len });
        Ok(())
    }

    fn map_coherent(&mut self, offset: u32, len: u32) -> Result<&'f [u8], FlashError> {
        self.invalidate(offset, len)?;
        let window = self.window(offset, len)?;
        self.record(FlashAccess::Map { offset, len });
        Ok(window)
    }
}

/// Mock status LED implementing the `embedded-hal` output pin traits.
#[derive(Debug, Default)]
pub struct MockPin {
    high: bool,
    transitions: u32,
}

impl MockPin {
    /// Create a pin that starts low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level.
    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Number of level changes since creation.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    fn set(&mut self, high: bool) {
        if self.high != high {
            self.transitions = self.transitions.saturating_add(1);
        }
        self.high = high;
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

impl embedded_hal::digital::StatefulOutputPin for MockPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// Mock async delay that returns immediately and records what was asked for.
#[derive(Debug, Default)]
pub struct MockDelay {
    calls_ms: heapless::Vec<u32, 32>,
    total_ns: u64,
}

impl MockDelay {
    /// Create an empty delay recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Millisecond delays requested through `delay_ms`, oldest first.
    pub fn calls_ms(&self) -> &[u32] {
        &self.calls_ms
    }

    /// Sum of all requested delays in nanoseconds.
    pub fn total_ns(&self) -> u64 {
        self.total_ns
    }
}

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns = self.total_ns.saturating_add(u64::from(ns));
    }

    async fn delay_us(&mut self, us: u32) {
        self.total_ns = self
            .total_ns
            .saturating_add(u64::from(us).saturating_mul(1_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        let _ = self.calls_ms.push(ms);
        self.total_ns = self
            .total_ns
            .saturating_add(u64::from(ms).saturating_mul(1_000_000));
    }
}
