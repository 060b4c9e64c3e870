//! Thread-safe device handle.
//!
//! The bus carries one command at a time and the working register is shared
//! by every command, so all access from multiple threads has to go through
//! one lock. [`SharedEcc`] holds the device behind `Arc<Mutex<_>>` and runs
//! each caller-supplied sequence under that lock, which keeps sequences such
//! as nonce-then-encrypt intact.

use crate::bus::I2cBus;
use crate::delay::{Delay, StdDelay};
use crate::device::Eccx08;
use crate::error::EccError;
use std::sync::{Arc, Mutex};

pub struct SharedEcc<B, D = StdDelay> {
    inner: Arc<Mutex<Eccx08<B, D>>>,
}

impl<B, D> Clone for SharedEcc<B, D> {
    fn clone(&self) -> Self {
        SharedEcc {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: I2cBus, D: Delay> SharedEcc<B, D> {
    pub fn new(device: Eccx08<B, D>) -> Self {
        SharedEcc {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    /// Run `f` with exclusive access to the device.
    pub fn with<T, F>(&self, f: F) -> Result<T, EccError>
    where
        F: FnOnce(&mut Eccx08<B, D>) -> Result<T, EccError>,
    {
        let mut device = self
            .inner
            .lock()
            .map_err(|e| EccError::InternalError(format!("Lock poisoned: {}", e)))?;
        f(&mut device)
    }

    /// Recover the device if this is the last handle.
    pub fn try_unwrap(self) -> Result<Eccx08<B, D>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex
                .into_inner()
                .map_err(|poisoned| SharedEcc::new(poisoned.into_inner())),
            Err(inner) => Err(SharedEcc { inner }),
        }
    }
}
