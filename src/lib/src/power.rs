//! Power states of the device and the transitions between them.
//!
//! ```text
//!            wakeup()                 idle()
//!  Asleep ─────────────▶ Awake ─────────────▶ Idle
//!    ▲                     │  ▲                 │
//!    └──────── sleep() ────┘  └──── wakeup() ───┘
//! ```
//!
//! `Idle` keeps the working register (TempKey) alive for a short while,
//! `Asleep` clears it. Commands are only accepted while `Awake`.

use crate::bus::I2cBus;
use crate::config::DeviceConfig;
use crate::delay::Delay;
use crate::dispatch::receive;
use crate::error::EccError;

/// Payload of the frame the device sends after a successful wake.
pub const WAKE_TOKEN: u8 = 0x11;

/// Word-address byte that puts the device to sleep.
pub const SLEEP_COMMAND: u8 = 0x01;

/// Word-address byte that idles the device.
pub const IDLE_COMMAND: u8 = 0x02;

/// The wake condition is generated by addressing the general-call address.
const WAKE_ADDRESS: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Asleep,
    Idle,
    Awake,
}

/// Transient per-device bus state, owned by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    state: PowerState,
    clock_hz: Option<u32>,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            state: PowerState::Asleep,
            clock_hz: None,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Bus clock most recently selected, if any.
    pub fn clock_hz(&self) -> Option<u32> {
        self.clock_hz
    }

    /// Wake the device.
    ///
    /// Drops the clock to the wake rate, addresses `0x00` with an empty
    /// transaction, waits for the device to settle and requires the wake
    /// token. Only then is the normal clock restored. On failure the state
    /// is left untouched and the whole sequence must be retried.
    pub fn wakeup<B, D>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        config: &DeviceConfig,
    ) -> Result<(), EccError>
    where
        B: I2cBus + ?Sized,
        D: Delay + ?Sized,
    {
        bus.set_clock(config.wakeup_frequency)?;
        self.clock_hz = Some(config.wakeup_frequency);

        // Nothing acknowledges the general-call address; the failure is expected.
        if let Err(e) = bus.write(WAKE_ADDRESS, &[]) {
            log::trace!("Wake pulse not acknowledged: {}", e);
        }

        delay.delay(config.wake_delay);

        let token = match receive(bus, config, 1) {
            Ok(token) => token,
            Err(e) => {
                log::warn!("No wake token from device at 0x{:02x}: {}", config.address, e);
                return Err(EccError::WakeFailure);
            }
        };
        if token[0] != WAKE_TOKEN {
            log::warn!(
                "Unexpected wake token 0x{:02x} from device at 0x{:02x}",
                token[0],
                config.address
            );
            return Err(EccError::WakeFailure);
        }

        bus.set_clock(config.normal_frequency)?;
        self.clock_hz = Some(config.normal_frequency);
        self.state = PowerState::Awake;

        Ok(())
    }

    /// Move an awake device to idle.
    pub fn idle<B, D>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        config: &DeviceConfig,
    ) -> Result<(), EccError>
    where
        B: I2cBus + ?Sized,
        D: Delay + ?Sized,
    {
        self.power_command(bus, delay, config, IDLE_COMMAND)?;
        self.state = PowerState::Idle;
        Ok(())
    }

    /// Move an awake device to sleep.
    pub fn sleep<B, D>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        config: &DeviceConfig,
    ) -> Result<(), EccError>
    where
        B: I2cBus + ?Sized,
        D: Delay + ?Sized,
    {
        self.power_command(bus, delay, config, SLEEP_COMMAND)?;
        self.state = PowerState::Asleep;
        Ok(())
    }

    fn power_command<B, D>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        config: &DeviceConfig,
        command: u8,
    ) -> Result<(), EccError>
    where
        B: I2cBus + ?Sized,
        D: Delay + ?Sized,
    {
        // The device ignores idle and sleep unless it is awake.
        if self.state != PowerState::Awake {
            return Err(EccError::InvalidArgument("device is not awake"));
        }

        bus.write(config.address, &[command])?;
        delay.delay(config.power_delay);
        Ok(())
    }
}
