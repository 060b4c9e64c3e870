//! Command dispatcher
//!
//! Owns the bus, the delay source and the power session, and runs every
//! device operation through the same bracket:
//!
//! ```text
//! wakeup → send frame → wait execution time → poll response → settle → idle
//! ```
//!
//! Multi-step operations (SHA, HMAC, sign) issue several commands inside one
//! [`Dispatcher::bracket`] so the working register survives between them.

use crate::bus::I2cBus;
use crate::catalog::CommandParams;
use crate::config::DeviceConfig;
use crate::delay::{Delay, StdDelay};
use crate::error::EccError;
use crate::frame::{decode_response, encode_command, RESPONSE_OVERHEAD};
use crate::power::{PowerState, Session};

/// Length byte of a one-byte status frame.
const STATUS_FRAME_LENGTH: u8 = 4;

pub struct Dispatcher<B, D = StdDelay> {
    bus: B,
    delay: D,
    config: DeviceConfig,
    session: Session,
}

impl<B: I2cBus> Dispatcher<B, StdDelay> {
    /// Dispatcher with the default configuration and thread-sleep delays.
    pub fn new(bus: B) -> Self {
        Self::with_config(bus, StdDelay, DeviceConfig::default())
    }
}

impl<B: I2cBus, D: Delay> Dispatcher<B, D> {
    pub fn with_config(bus: B, delay: D, config: DeviceConfig) -> Self {
        Dispatcher {
            bus,
            delay,
            config,
            session: Session::new(),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn power_state(&self) -> PowerState {
        self.session.state()
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Release the bus and delay source.
    pub fn into_parts(self) -> (B, D) {
        (self.bus, self.delay)
    }

    pub fn wakeup(&mut self) -> Result<(), EccError> {
        self.session
            .wakeup(&mut self.bus, &mut self.delay, &self.config)
    }

    pub fn idle(&mut self) -> Result<(), EccError> {
        self.session.idle(&mut self.bus, &mut self.delay, &self.config)
    }

    pub fn sleep(&mut self) -> Result<(), EccError> {
        self.session
            .sleep(&mut self.bus, &mut self.delay, &self.config)
    }

    /// Run a single command inside its own wake/idle bracket.
    pub fn execute(
        &mut self,
        params: &CommandParams,
        payload: &[u8],
    ) -> Result<Vec<u8>, EccError> {
        self.bracket(|dispatcher| dispatcher.transact(params, payload))
    }

    /// Wake the device, run `f`, then idle it.
    ///
    /// If `f` fails the device is left awake; it falls asleep on its own
    /// once the watchdog expires. A failed idle after a successful `f` is
    /// logged and does not discard the result.
    pub fn bracket<T, F>(&mut self, f: F) -> Result<T, EccError>
    where
        F: FnOnce(&mut Self) -> Result<T, EccError>,
    {
        self.wakeup()?;
        let value = f(self)?;
        self.delay.delay(self.config.settle_delay);
        if let Err(e) = self.idle() {
            log::warn!("Failed to idle device after command: {}", e);
        }
        Ok(value)
    }

    /// Send one command and collect its response. The device must be awake.
    pub fn transact(
        &mut self,
        params: &CommandParams,
        payload: &[u8],
    ) -> Result<Vec<u8>, EccError> {
        if self.session.state() != PowerState::Awake {
            return Err(EccError::InvalidArgument("device is not awake"));
        }

        let packet = encode_command(params.opcode as u8, params.param1, params.param2, payload)?;
        log::debug!(
            "{:?} param1=0x{:02x} param2=0x{:04x} ({} byte payload)",
            params.opcode,
            params.param1,
            params.param2,
            payload.len()
        );
        // Header only; payloads may carry key material
        log::trace!("tx {}", hex::encode(&packet[..6]));

        self.bus.write(self.config.address, &packet)?;
        self.delay.delay(params.exec_time);

        receive(&mut self.bus, &self.config, params.response_len)
    }
}

/// Poll the device until a complete response frame of `payload_len` bytes
/// arrives, then validate it.
///
/// A busy device does not acknowledge, which the bus reports as a short
/// read. After `config.response_retries` incomplete reads the transaction
/// fails. A well-formed one-byte status frame received in place of a longer
/// response is reported as the device's status code.
pub(crate) fn receive<B>(
    bus: &mut B,
    config: &DeviceConfig,
    payload_len: usize,
) -> Result<Vec<u8>, EccError>
where
    B: I2cBus + ?Sized,
{
    let mut buffer = vec![0u8; payload_len + RESPONSE_OVERHEAD];
    let attempts = config.response_retries.max(1);

    let mut received = 0;
    for attempt in 1..=attempts {
        match bus.read(config.address, &mut buffer) {
            Ok(count) if count == buffer.len() => {
                received = count;
                break;
            }
            Ok(count)
                if count >= STATUS_FRAME_LENGTH as usize && buffer[0] == STATUS_FRAME_LENGTH =>
            {
                received = count;
                break;
            }
            Ok(count) => {
                log::trace!("Poll {}/{}: {} of {} bytes", attempt, attempts, count, buffer.len());
            }
            Err(e) => {
                log::trace!("Poll {}/{}: {}", attempt, attempts, e);
            }
        }
    }

    if received == 0 {
        log::warn!(
            "No complete response from 0x{:02x} after {} attempts",
            config.address,
            attempts
        );
        return Err(EccError::BusTransactionFailure(format!(
            "no complete {} byte response after {} attempts",
            buffer.len(),
            attempts
        )));
    }

    if payload_len != 1 && buffer[0] == STATUS_FRAME_LENGTH {
        let status = decode_response(&buffer[..STATUS_FRAME_LENGTH as usize], 1)?;
        log::debug!("Device reported status 0x{:02x}", status[0]);
        return Err(EccError::DeviceStatusError(status[0]));
    }

    decode_response(&buffer, payload_len)
}

/// Require a zero status byte.
pub(crate) fn expect_status(response: &[u8]) -> Result<(), EccError> {
    match response.first() {
        Some(0) => Ok(()),
        Some(&status) => Err(EccError::DeviceStatusError(status)),
        None => Err(EccError::FramingMismatch("empty status response".to_string())),
    }
}
