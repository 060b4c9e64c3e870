//! Blocking waits between bus transactions.
//!
//! Every command has a fixed execution window during which the device does
//! not answer, and the wake sequence needs a settle time before the
//! acknowledgement can be read. These waits are routed through the [`Delay`]
//! trait so that embedded targets can plug in their own timer and tests can
//! record the timing budget instead of sleeping.
//!
//! # Implementors
//!
//! - [`StdDelay`]: `std::thread::sleep` (default)
//! - [`RecordingDelay`]: returns immediately, remembers every request
//!
//! # Example Implementation
//!
//! ```rust,ignore
//! use eccx08::delay::Delay;
//! use std::time::Duration;
//!
//! struct HalDelay<D: embedded_hal::delay::DelayNs>(D);
//!
//! impl<D: embedded_hal::delay::DelayNs + Send> Delay for HalDelay<D> {
//!     fn delay(&mut self, duration: Duration) {
//!         self.0.delay_us(duration.as_micros() as u32);
//!     }
//! }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source of blocking waits.
pub trait Delay: Send {
    /// Block the calling thread for at least `duration`.
    fn delay(&mut self, duration: Duration);

    /// Block for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u64) {
        self.delay(Duration::from_millis(ms));
    }
}

impl<T: Delay + ?Sized> Delay for Box<T> {
    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration)
    }
}

/// Thread-sleep delay using `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Delay that never blocks and keeps a log of requested waits.
///
/// Clones share the same log, so a test can keep one handle while the
/// device owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    log: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Sum of all requested waits.
    pub fn total(&self) -> Duration {
        self.waits().iter().sum()
    }

    pub fn clear(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }
}

impl Delay for RecordingDelay {
    fn delay(&mut self, duration: Duration) {
        if let Ok(mut log) = self.log.lock() {
            log.push(duration);
        }
    }
}
