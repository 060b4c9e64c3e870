/// I2C bus abstraction
///
/// The driver never touches hardware directly. Everything it needs from the
/// two-wire bus is expressed by [`I2cBus`]: addressed writes, addressed reads
/// that report how many bytes were actually transferred, and clock-rate
/// selection (the wake condition needs a slower clock than normal traffic).
///
/// # Implementations
///
/// - Platform-specific drivers implement the trait directly
/// - [`HalBus`] adapts any `embedded-hal` 1.0 I2C peripheral (feature
///   `embedded-hal`)
/// - Test doubles script responses without hardware
///
/// ```text
/// Eccx08 (catalog + AES-GCM)
///     ↓
/// Dispatcher (wake → command → response → idle)
///     ↓
/// I2cBus (this trait)
///     ↓
/// Secure element
/// ```
use crate::error::EccError;

/// Two-wire bus collaborator.
pub trait I2cBus: Send {
    /// Select the bus clock rate in Hz
    fn set_clock(&mut self, hz: u32) -> Result<(), EccError>;

    /// Write `data` to the device at `address` as one transaction
    ///
    /// A zero-length write still generates start, address and stop.
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), EccError>;

    /// Read up to `buffer.len()` bytes from `address`
    ///
    /// Returns the number of bytes transferred. A device that is still busy
    /// does not acknowledge its address, which shows up as a short (usually
    /// zero-length) read rather than an error.
    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<usize, EccError>;
}

impl<T: I2cBus + ?Sized> I2cBus for Box<T> {
    fn set_clock(&mut self, hz: u32) -> Result<(), EccError> {
        (**self).set_clock(hz)
    }

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), EccError> {
        (**self).write(address, data)
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<usize, EccError> {
        (**self).read(address, buffer)
    }
}

/// Adapter from an `embedded-hal` 1.0 I2C peripheral
///
/// `embedded-hal` has no notion of changing the bus clock at runtime, so
/// [`I2cBus::set_clock`] is only recorded. Boards that need the slow wake
/// clock should implement [`I2cBus`] on their HAL type instead.
#[cfg(feature = "embedded-hal")]
pub struct HalBus<I> {
    i2c: I,
    clock: u32,
}

#[cfg(feature = "embedded-hal")]
impl<I> HalBus<I> {
    pub fn new(i2c: I) -> Self {
        HalBus { i2c, clock: 0 }
    }

    /// Last clock rate requested by the driver
    pub fn requested_clock(&self) -> u32 {
        self.clock
    }

    pub fn into_inner(self) -> I {
        self.i2c
    }
}

#[cfg(feature = "embedded-hal")]
impl<I> I2cBus for HalBus<I>
where
    I: embedded_hal::i2c::I2c + Send,
{
    fn set_clock(&mut self, hz: u32) -> Result<(), EccError> {
        log::debug!("Clock change to {} Hz requested (not supported by embedded-hal)", hz);
        self.clock = hz;
        Ok(())
    }

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), EccError> {
        use embedded_hal::i2c::Error as _;

        self.i2c.write(address, data).map_err(|e| {
            EccError::BusTransactionFailure(format!(
                "write to 0x{:02x} failed: {:?}",
                address,
                e.kind()
            ))
        })
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<usize, EccError> {
        use embedded_hal::i2c::{Error as _, ErrorKind};

        match self.i2c.read(address, buffer) {
            Ok(()) => Ok(buffer.len()),
            Err(e) => match e.kind() {
                ErrorKind::NoAcknowledge(_) => Ok(0),
                kind => Err(EccError::BusTransactionFailure(format!(
                    "read from 0x{:02x} failed: {:?}",
                    address, kind
                ))),
            },
        }
    }
}

/// Scripted I2C bus for unit tests
///
/// Reads are served from a queue; an empty queue behaves like a device that
/// does not acknowledge. Every write and clock change is logged.
#[cfg(test)]
pub(crate) struct MockI2cBus {
    reads: std::collections::VecDeque<Vec<u8>>,
    pub writes: Vec<(u8, Vec<u8>)>,
    pub clocks: Vec<u32>,
    pub read_attempts: usize,
    pub fail_writes: bool,
}

#[cfg(test)]
impl MockI2cBus {
    pub fn new() -> Self {
        MockI2cBus {
            reads: std::collections::VecDeque::new(),
            writes: Vec::new(),
            clocks: Vec::new(),
            read_attempts: 0,
            fail_writes: false,
        }
    }

    /// Queue raw bytes for the next read
    pub fn queue_raw(&mut self, raw: Vec<u8>) {
        self.reads.push_back(raw);
    }

    /// Queue a correctly framed response carrying `payload`
    pub fn queue_response(&mut self, payload: &[u8]) {
        let raw = crate::frame::ResponseFrame::new(payload)
            .encode()
            .expect("test payload fits a frame");
        self.queue_raw(raw);
    }

    /// Queue the wake token
    pub fn queue_wake(&mut self) {
        self.queue_raw(vec![0x04, 0x11, 0x33, 0x43]);
    }

    /// Queue `count` reads on which the device does not acknowledge
    pub fn queue_busy(&mut self, count: usize) {
        for _ in 0..count {
            self.queue_raw(Vec::new());
        }
    }

    /// Command frames written to `address` (wake and power bytes excluded)
    pub fn commands(&self, address: u8) -> Vec<crate::frame::CommandFrame> {
        self.writes
            .iter()
            .filter(|(a, data)| *a == address && data.len() > 1)
            .filter_map(|(_, data)| crate::frame::CommandFrame::decode(data).ok())
            .collect()
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }
}

#[cfg(test)]
impl I2cBus for MockI2cBus {
    fn set_clock(&mut self, hz: u32) -> Result<(), EccError> {
        self.clocks.push(hz);
        Ok(())
    }

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), EccError> {
        self.writes.push((address, data.to_vec()));
        if self.fail_writes && address != 0 {
            return Err(EccError::BusTransactionFailure("mock NACK".to_string()));
        }
        Ok(())
    }

    fn read(&mut self, _address: u8, buffer: &mut [u8]) -> Result<usize, EccError> {
        self.read_attempts += 1;
        match self.reads.pop_front() {
            Some(raw) => {
                let copy_len = raw.len().min(buffer.len());
                buffer[..copy_len].copy_from_slice(&raw[..copy_len]);
                Ok(copy_len)
            }
            None => Ok(0),
        }
    }
}
