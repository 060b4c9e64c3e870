//! Bus and timing configuration for a device instance

use std::time::Duration;

/// Default 7-bit I2C address of ECC508/ECC608 parts.
pub const DEFAULT_ADDRESS: u8 = 0x60;

/// Configuration for one device on one bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// 7-bit I2C address of the device
    pub address: u8,

    /// Bus clock used while generating the wake condition (Hz)
    ///
    /// The zero-length transaction to address 0 must hold SDA low long
    /// enough for the device to detect a wake, which needs a slow clock.
    pub wakeup_frequency: u32,

    /// Bus clock for regular command traffic (Hz)
    pub normal_frequency: u32,

    /// Bus read attempts while waiting for a response
    pub response_retries: u32,

    /// Settle time between the wake condition and reading the wake token
    pub wake_delay: Duration,

    /// Wait after a successful response before the device is idled
    pub settle_delay: Duration,

    /// Wait after an idle or sleep command
    pub power_delay: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            wakeup_frequency: 100_000,
            normal_frequency: 1_000_000,
            response_retries: 20,
            wake_delay: Duration::from_micros(1500),
            settle_delay: Duration::from_millis(1),
            power_delay: Duration::from_millis(1),
        }
    }
}

impl DeviceConfig {
    /// Configuration for hosts whose I2C peripheral tops out at 400 kHz
    pub fn low_speed() -> Self {
        Self {
            normal_frequency: 400_000,
            ..Default::default()
        }
    }

    /// Set the device address
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Set the normal operating clock
    pub fn with_normal_frequency(mut self, hz: u32) -> Self {
        self.normal_frequency = hz;
        self
    }

    /// Set the number of response polling attempts
    pub fn with_response_retries(mut self, retries: u32) -> Self {
        self.response_retries = retries;
        self
    }
}
