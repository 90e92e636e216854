//! Status LED cadence.
//!
//! The LED is the only success/failure signal for someone without an RTT
//! probe attached: a slow blink means a sample is looping, a fast blink
//! means loading failed and the output is silent.
//!
//! | Outcome | Toggle period |
//! |---------|---------------|
//! | Loaded  | 500 ms        |
//! | Failed  | 100 ms        |
//!
//! Timing is coarse and carries no correctness obligation; the loop runs in
//! the thread-mode executor, below the audio task.

use embedded_hal::digital::StatefulOutputPin;
use embedded_hal_async::delay::DelayNs;

/// Blink cadence selected by the load outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusCadence {
    /// A sample is bound and looping.
    Loaded,
    /// Loading failed; audio plays silence.
    Failed,
}

impl StatusCadence {
    /// Cadence for a load result.
    pub fn from_loaded(loaded: bool) -> Self {
        if loaded {
            Self::Loaded
        } else {
            Self::Failed
        }
    }

    /// Time between LED toggles in milliseconds.
    pub const fn toggle_period_ms(self) -> u32 {
        match self {
            Self::Loaded => 500,
            Self::Failed => 100,
        }
    }
}

/// Toggles a status pin forever at a fixed cadence.
pub struct StatusIndicator<P, D> {
    pin: P,
    delay: D,
    cadence: StatusCadence,
}

impl<P: StatefulOutputPin, D: DelayNs> StatusIndicator<P, D> {
    /// Create an indicator; the pin is left at its current level.
    pub fn new(pin: P, delay: D, cadence: StatusCadence) -> Self {
        Self {
            pin,
            delay,
            cadence,
        }
    }

    /// Current cadence.
    pub fn cadence(&self) -> StatusCadence {
        self.cadence
    }

    /// Toggle once, then wait one period.
    pub async fn step(&mut self) -> Result<(), P::Error> {
        self.pin.toggle()?;
        self.delay.delay_ms(self.cadence.toggle_period_ms()).await;
        Ok(())
    }

    /// Blink until power loss.
    pub async fn run(mut self) {
        loop {
            // GPIO outputs on STM32 are infallible; a failed toggle still waits
            // so the loop can never spin.
            if self.step().await.is_err() {
                self.delay.delay_ms(self.cadence.toggle_period_ms()).await;
            }
        }
    }

    /// Release the pin and delay.
    pub fn into_parts(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::{MockDelay, MockPin};

    #[test]
    fn loaded_blinks_slower_than_failed() {
        assert_eq!(StatusCadence::Loaded.toggle_period_ms(), 500);
        assert_eq!(StatusCadence::Failed.toggle_period_ms(), 100);
        assert_eq!(StatusCadence::from_loaded(true), StatusCadence::Loaded);
        assert_eq!(StatusCadence::from_loaded(false), StatusCadence::Failed);
    }

    #[tokio::test]
    async fn failed_cadence_toggles_every_100ms() {
        let mut indicator = StatusIndicator::new(MockPin::new(), MockDelay::new(), StatusCadence::Failed);
        for _ in 0..4 {
            indicator.step().await.unwrap();
        }
        let (pin, delay) = indicator.into_parts();
        assert_eq!(pin.transitions(), 4);
        assert!(!pin.is_high(), "even number of toggles returns to low");
        assert_eq!(delay.calls_ms(), &[100, 100, 100, 100]);
    }

    #[tokio::test]
    async fn loaded_cadence_waits_500ms() {
        let mut indicator = StatusIndicator::new(MockPin::new(), MockDelay::new(), StatusCadence::Loaded);
        indicator.step().await.unwrap();
        let (pin, delay) = indicator.into_parts();
        assert!(pin.is_high());
        assert_eq!(delay.total_ns(), 500_000_000);
    }
}
