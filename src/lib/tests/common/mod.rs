//! Simulated ECC608 behind the `I2cBus` trait
//!
//! Decodes real command frames (CRC checked), executes them against host
//! implementations and answers with correctly framed responses:
//!
//! - P-256 keys, ECDSA and ECDH via `p256`
//! - single-block AES via `aes`, keyed by the working register
//! - SHA-256 and HMAC via `hmac-sha256`
//! - GF(2^128) multiply on the host
//!
//! Wake, idle and sleep follow the device: the wake pulse only registers at
//! a slow clock, idle keeps the working register, sleep clears it.

#![allow(dead_code)]

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use eccx08::bus::I2cBus;
use eccx08::config::DeviceConfig;
use eccx08::delay::RecordingDelay;
use eccx08::frame::{CommandFrame, ResponseFrame};
use eccx08::{EccError, EccPublicKey, Eccx08};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};

pub const ADDRESS: u8 = 0x60;
pub const REVISION_608: [u8; 4] = [0x00, 0x00, 0x60, 0x02];
pub const REVISION_508: [u8; 4] = [0x00, 0x00, 0x50, 0x00];
pub const SERIAL: [u8; 9] = [0x01, 0x23, 0x6c, 0x4f, 0x2a, 0x9b, 0x11, 0x04, 0xee];
pub const SLOT_SIZE: usize = 416;

/// Highest clock at which the wake pulse is long enough.
const MAX_WAKE_CLOCK: u32 = 100_000;

const STATUS_OK: u8 = 0x00;
const STATUS_MISCOMPARE: u8 = 0x01;
const STATUS_PARSE_ERROR: u8 = 0x03;
const STATUS_EXECUTION_ERROR: u8 = 0x0f;
const STATUS_COMMUNICATION_ERROR: u8 = 0xff;

const LOCK_VALUE: usize = 86;
const LOCK_CONFIG: usize = 87;
const UNLOCKED: u8 = 0x55;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Power {
    Asleep,
    Idle,
    Awake,
}

enum ShaState {
    Plain(Vec<u8>),
    Hmac { key: [u8; 32], data: Vec<u8> },
}

pub struct SimulatedEcc {
    pub revision: [u8; 4],
    pub power: Power,
    pub clock: u32,
    /// Every command frame received, in order
    pub commands: Vec<CommandFrame>,
    /// Unacknowledged reads served after each command
    pub busy_polls: usize,
    /// Flip a CRC bit in the next response
    pub corrupt_next: bool,
    pending: Option<Vec<u8>>,
    busy_remaining: usize,
    tempkey: Option<[u8; 32]>,
    keys: [Option<SigningKey>; 16],
    slots: Vec<Vec<u8>>,
    config: [u8; 128],
    otp: [u8; 64],
    counters: [u32; 2],
    sha: Option<ShaState>,
    rng: u64,
}

impl Default for SimulatedEcc {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEcc {
    pub fn new() -> Self {
        let mut config = [0u8; 128];
        config[..4].copy_from_slice(&SERIAL[..4]);
        config[4..8].copy_from_slice(&REVISION_608);
        config[8..13].copy_from_slice(&SERIAL[4..]);
        config[LOCK_VALUE] = UNLOCKED;
        config[LOCK_CONFIG] = UNLOCKED;

        let mut sim = SimulatedEcc {
            revision: REVISION_608,
            power: Power::Asleep,
            clock: 0,
            commands: Vec::new(),
            busy_polls: 0,
            corrupt_next: false,
            pending: None,
            busy_remaining: 0,
            tempkey: None,
            keys: std::array::from_fn(|_| None),
            slots: vec![vec![0u8; SLOT_SIZE]; 16],
            config,
            otp: [0u8; 64],
            counters: [0, 0],
            sha: None,
            rng: 0x9e37_79b9_7f4a_7c15,
        };
        // Slot 0 carries the device identity key from manufacturing
        sim.keys[0] = Some(sim.fresh_key());
        sim
    }

    pub fn with_revision(revision: [u8; 4]) -> Self {
        let mut sim = Self::new();
        sim.revision = revision;
        sim.config[4..8].copy_from_slice(&revision);
        sim
    }

    pub fn opcodes(&self) -> Vec<u8> {
        self.commands.iter().map(|c| c.opcode).collect()
    }

    pub fn public_key(&self, slot: usize) -> Option<EccPublicKey> {
        self.keys[slot]
            .as_ref()
            .map(|key| EccPublicKey::from_p256(&p256::PublicKey::from(key.verifying_key())))
    }

    pub fn counter(&self, index: usize) -> u32 {
        self.counters[index]
    }

    pub fn set_counter(&mut self, index: usize, value: u32) {
        self.counters[index] = value;
    }

    pub fn tempkey(&self) -> Option<[u8; 32]> {
        self.tempkey
    }

    fn next_random(&mut self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for chunk in out.chunks_mut(8) {
            self.rng ^= self.rng << 13;
            self.rng ^= self.rng >> 7;
            self.rng ^= self.rng << 17;
            chunk.copy_from_slice(&self.rng.to_le_bytes());
        }
        out
    }

    fn fresh_key(&mut self) -> SigningKey {
        loop {
            if let Ok(key) = SigningKey::from_slice(&self.next_random()) {
                return key;
            }
        }
    }

    fn wake(&mut self) {
        self.power = Power::Awake;
        self.busy_remaining = 0;
        self.pending = Some(vec![0x04, 0x11, 0x33, 0x43]);
    }

    fn respond(&mut self, payload: &[u8]) {
        let mut raw = ResponseFrame::new(payload)
            .encode()
            .expect("simulated response fits a frame");
        if self.corrupt_next {
            self.corrupt_next = false;
            let last = raw.len() - 1;
            raw[last] ^= 0x01;
        }
        self.busy_remaining = self.busy_polls;
        self.pending = Some(raw);
    }

    fn execute(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        match frame.opcode {
            0x30 => Ok(self.revision.to_vec()),
            0x1b => Ok(self.next_random().to_vec()),
            0x40 => self.genkey(frame),
            0x16 => {
                if frame.param1 != 0x03 || frame.payload.len() != 32 {
                    return Err(STATUS_PARSE_ERROR);
                }
                let mut value = [0u8; 32];
                value.copy_from_slice(&frame.payload);
                self.tempkey = Some(value);
                Ok(vec![STATUS_OK])
            }
            0x41 => self.sign(frame),
            0x45 => self.verify(frame),
            0x43 => self.ecdh(frame),
            0x47 => self.sha(frame),
            0x51 => self.aes(frame),
            0x24 => self.counter_command(frame),
            0x02 => self.read(frame),
            0x12 => self.write_memory(frame),
            0x17 => self.lock(frame),
            _ => Err(STATUS_PARSE_ERROR),
        }
    }

    fn slot_key(&self, param2: u16) -> Result<&SigningKey, u8> {
        self.keys
            .get(param2 as usize)
            .and_then(|key| key.as_ref())
            .ok_or(STATUS_EXECUTION_ERROR)
    }

    fn genkey(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        let slot = frame.param2 as usize;
        if slot >= 16 {
            return Err(STATUS_PARSE_ERROR);
        }
        match frame.param1 {
            0x04 => {
                let key = self.fresh_key();
                self.keys[slot] = Some(key);
            }
            0x00 => {}
            _ => return Err(STATUS_PARSE_ERROR),
        }
        self.public_key(slot)
            .map(|key| key.as_bytes().to_vec())
            .ok_or(STATUS_EXECUTION_ERROR)
    }

    fn sign(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        if frame.param1 != 0x80 {
            return Err(STATUS_PARSE_ERROR);
        }
        let digest = self.tempkey.ok_or(STATUS_EXECUTION_ERROR)?;
        let key = self.slot_key(frame.param2)?;
        let signature: Signature = key
            .sign_prehash(&digest)
            .map_err(|_| STATUS_EXECUTION_ERROR)?;
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        if frame.param1 != 0x02 || frame.param2 != 0x0004 || frame.payload.len() != 128 {
            return Err(STATUS_PARSE_ERROR);
        }
        let digest = self.tempkey.ok_or(STATUS_EXECUTION_ERROR)?;

        let mut sec1 = [0u8; 65];
        sec1[0] = 0x04;
        sec1[1..].copy_from_slice(&frame.payload[64..]);
        let key = VerifyingKey::from_sec1_bytes(&sec1).map_err(|_| STATUS_EXECUTION_ERROR)?;

        let valid = Signature::from_slice(&frame.payload[..64])
            .map(|signature| key.verify_prehash(&digest, &signature).is_ok())
            .unwrap_or(false);
        Ok(vec![if valid { STATUS_OK } else { STATUS_MISCOMPARE }])
    }

    fn ecdh(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        if frame.payload.len() != 64 {
            return Err(STATUS_PARSE_ERROR);
        }
        let key = self.slot_key(frame.param2)?;

        let mut sec1 = [0u8; 65];
        sec1[0] = 0x04;
        sec1[1..].copy_from_slice(&frame.payload);
        let peer = p256::PublicKey::from_sec1_bytes(&sec1).map_err(|_| STATUS_EXECUTION_ERROR)?;

        let shared = p256::ecdh::diffie_hellman(key.as_nonzero_scalar(), peer.as_affine());
        let mut secret = [0u8; 32];
        secret.copy_from_slice(shared.raw_secret_bytes());

        match frame.param1 {
            0x0c => Ok(secret.to_vec()),
            0x08 => {
                self.tempkey = Some(secret);
                Ok(vec![STATUS_OK])
            }
            _ => Err(STATUS_PARSE_ERROR),
        }
    }

    fn sha(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        if frame.payload.len() != frame.param2 as usize && frame.param1 != 0x04 {
            return Err(STATUS_PARSE_ERROR);
        }
        match frame.param1 {
            0x00 => {
                self.sha = Some(ShaState::Plain(Vec::new()));
                Ok(vec![STATUS_OK])
            }
            0x04 => {
                let slot = self
                    .slots
                    .get(frame.param2 as usize)
                    .ok_or(STATUS_PARSE_ERROR)?;
                let mut key = [0u8; 32];
                key.copy_from_slice(&slot[..32]);
                self.sha = Some(ShaState::Hmac {
                    key,
                    data: Vec::new(),
                });
                Ok(vec![STATUS_OK])
            }
            0x01 => {
                match self.sha.as_mut() {
                    Some(ShaState::Plain(data)) if frame.payload.len() == 64 => {
                        data.extend_from_slice(&frame.payload)
                    }
                    Some(ShaState::Hmac { data, .. }) if frame.payload.len() <= 64 => {
                        data.extend_from_slice(&frame.payload)
                    }
                    Some(_) => return Err(STATUS_PARSE_ERROR),
                    None => return Err(STATUS_EXECUTION_ERROR),
                }
                Ok(vec![STATUS_OK])
            }
            0x02 => {
                if frame.payload.len() >= 64 {
                    return Err(STATUS_PARSE_ERROR);
                }
                let digest = match self.sha.take() {
                    Some(ShaState::Plain(mut data)) => {
                        data.extend_from_slice(&frame.payload);
                        hmac_sha256::Hash::hash(&data)
                    }
                    Some(ShaState::Hmac { key, mut data }) => {
                        data.extend_from_slice(&frame.payload);
                        hmac_sha256::HMAC::mac(&data, key)
                    }
                    None => return Err(STATUS_EXECUTION_ERROR),
                };
                Ok(digest.to_vec())
            }
            _ => Err(STATUS_PARSE_ERROR),
        }
    }

    fn aes(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        if frame.param2 != 0xffff {
            return Err(STATUS_PARSE_ERROR);
        }
        let tempkey = self.tempkey.ok_or(STATUS_EXECUTION_ERROR)?;

        match (frame.param1, frame.payload.len()) {
            (0x00, 16) => {
                let cipher = Aes128::new(GenericArray::from_slice(&tempkey[..16]));
                let mut block = GenericArray::clone_from_slice(&frame.payload);
                cipher.encrypt_block(&mut block);
                Ok(block.to_vec())
            }
            (0x03, 32) => {
                let mut h = [0u8; 16];
                let mut x = [0u8; 16];
                h.copy_from_slice(&frame.payload[..16]);
                x.copy_from_slice(&frame.payload[16..]);
                Ok(gf128_mul(&h, &x).to_vec())
            }
            _ => Err(STATUS_PARSE_ERROR),
        }
    }

    fn counter_command(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        let index = frame.param2 as usize;
        if index > 1 {
            return Err(STATUS_PARSE_ERROR);
        }
        match frame.param1 {
            0x00 => {}
            0x01 => {
                self.counters[index] = self.counters[index]
                    .checked_add(1)
                    .ok_or(STATUS_EXECUTION_ERROR)?
            }
            _ => return Err(STATUS_PARSE_ERROR),
        }
        Ok(self.counters[index].to_le_bytes().to_vec())
    }

    fn config_locked(&self) -> bool {
        self.config[LOCK_CONFIG] == 0x00
    }

    fn data_locked(&self) -> bool {
        self.config[LOCK_VALUE] == 0x00
    }

    /// Zone, byte offset and length addressed by a read or write.
    fn locate(&self, frame: &CommandFrame) -> Result<(u8, usize, usize), u8> {
        let zone = frame.param1 & 0x03;
        let len = if frame.param1 & 0x80 != 0 { 32 } else { 4 };
        let address = frame.param2 as usize;
        let offset = match zone {
            0 | 1 => address * 4,
            2 => {
                let block = address >> 8;
                let word = address & 0x07;
                block * 32 + word * 4
            }
            _ => return Err(STATUS_PARSE_ERROR),
        };
        Ok((zone, offset, len))
    }

    fn memory(&mut self, zone: u8, address: u16) -> &mut [u8] {
        match zone {
            0 => &mut self.config[..],
            1 => &mut self.otp[..],
            _ => &mut self.slots[((address >> 3) & 0x0f) as usize][..],
        }
    }

    fn read(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        let (zone, offset, len) = self.locate(frame)?;
        let memory = self.memory(zone, frame.param2);
        memory
            .get(offset..offset + len)
            .map(|bytes| bytes.to_vec())
            .ok_or(STATUS_PARSE_ERROR)
    }

    fn write_memory(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        let (zone, offset, len) = self.locate(frame)?;
        if frame.payload.len() != len {
            return Err(STATUS_PARSE_ERROR);
        }
        let writable = match zone {
            0 => !self.config_locked() && offset >= 16 && offset != 84,
            _ => !self.data_locked(),
        };
        if !writable {
            return Err(STATUS_EXECUTION_ERROR);
        }

        let memory = self.memory(zone, frame.param2);
        let target = memory
            .get_mut(offset..offset + len)
            .ok_or(STATUS_PARSE_ERROR)?;
        target.copy_from_slice(&frame.payload);
        Ok(vec![STATUS_OK])
    }

    fn lock(&mut self, frame: &CommandFrame) -> Result<Vec<u8>, u8> {
        if frame.param1 & 0x80 == 0 {
            return Err(STATUS_PARSE_ERROR);
        }
        let index = match frame.param1 & 0x03 {
            0 => LOCK_CONFIG,
            1 => LOCK_VALUE,
            _ => return Err(STATUS_PARSE_ERROR),
        };
        if self.config[index] == 0x00 {
            return Err(STATUS_EXECUTION_ERROR);
        }
        self.config[index] = 0x00;
        Ok(vec![STATUS_OK])
    }
}

impl I2cBus for SimulatedEcc {
    fn set_clock(&mut self, hz: u32) -> Result<(), EccError> {
        self.clock = hz;
        Ok(())
    }

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), EccError> {
        if address == 0x00 {
            if data.is_empty() && self.clock <= MAX_WAKE_CLOCK {
                self.wake();
            }
            return Err(EccError::BusTransactionFailure("general call NACK".to_string()));
        }
        if address != ADDRESS || self.power != Power::Awake {
            return Err(EccError::BusTransactionFailure(format!(
                "address 0x{:02x} NACK",
                address
            )));
        }

        match data {
            [0x01] => {
                self.power = Power::Asleep;
                self.tempkey = None;
                self.sha = None;
            }
            [0x02] => self.power = Power::Idle,
            [0x03, ..] => match CommandFrame::decode(data) {
                Ok(frame) => {
                    let response = match self.execute(&frame) {
                        Ok(payload) => payload,
                        Err(status) => vec![status],
                    };
                    self.commands.push(frame);
                    self.respond(&response);
                }
                Err(_) => self.respond(&[STATUS_COMMUNICATION_ERROR]),
            },
            _ => {
                return Err(EccError::BusTransactionFailure(
                    "unknown word address".to_string(),
                ))
            }
        }
        Ok(())
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<usize, EccError> {
        if address != ADDRESS || self.power != Power::Awake {
            return Ok(0);
        }
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            return Ok(0);
        }
        match self.pending.take() {
            Some(raw) => {
                let len = raw.len().min(buffer.len());
                buffer[..len].copy_from_slice(&raw[..len]);
                Ok(len)
            }
            None => Ok(0),
        }
    }
}

/// GF(2^128) multiply with the GCM bit order.
pub fn gf128_mul(x: &[u8; 16], y: &[u8; 16]) -> [u8; 16] {
    let x = u128::from_be_bytes(*x);
    let mut v = u128::from_be_bytes(*y);
    let mut z = 0u128;
    for i in 0..128 {
        if (x >> (127 - i)) & 1 == 1 {
            z ^= v;
        }
        v = if v & 1 == 1 { (v >> 1) ^ (0xe1u128 << 120) } else { v >> 1 };
    }
    z.to_be_bytes()
}

pub type SimDevice = Eccx08<SimulatedEcc, RecordingDelay>;

/// A simulated device plus a handle on its delay log.
pub fn device_with(sim: SimulatedEcc) -> (SimDevice, RecordingDelay) {
    let delay = RecordingDelay::new();
    let device = Eccx08::with_config(sim, delay.clone(), DeviceConfig::default());
    (device, delay)
}

pub fn device() -> SimDevice {
    device_with(SimulatedEcc::new()).0
}
