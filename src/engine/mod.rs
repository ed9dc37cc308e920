pub mod i2c;

pub use self::i2c::I2cEngine;

use crate::completion::{Completer, SCRATCH_LEN};

/// Longest burst write carried by a single [`RegisterOperation`]
pub const MAX_BURST: usize = 4;

/// Engine status codes reported through [`Completer::complete`]
pub mod status {
    pub const SUCCESS: u8 = 0;
    /// Address was not acknowledged
    pub const ADDR_NACK: u8 = 1;
    /// Data byte was not acknowledged
    pub const DATA_NACK: u8 = 2;
    /// Lost bus arbitration
    pub const ARB_LOST: u8 = 3;
    /// Any other controller error
    pub const ERROR: u8 = 4;

    /// Device did not come out of reset
    pub const UNRESPONSIVE: u8 = 0x80;
    /// `WHO_AM_I` did not match
    pub const UNKNOWN_DEVICE: u8 = 0x81;
    /// Completer was dropped without being resolved
    pub const ABANDONED: u8 = 0x82;
}

/// An asynchronous register-level bus controller.
///
/// `submit` must not block waiting for the bus. The engine keeps the
/// completer and resolves it exactly once, usually from
/// [`on_interrupt`](Self::on_interrupt). Synchronous engines may resolve it
/// before returning.
///
/// The foreground handle and the data-ready relay each hold an engine, so
/// an engine used from both sides should be a cheap handle onto state the
/// controller interrupt can also reach.
pub trait TransactionEngine {
    /// Start `request` against the device at `address`
    fn submit(&mut self, address: u8, request: Request, completer: Completer);

    /// Bus-controller interrupt pass-through
    fn on_interrupt(&mut self) {}
}

/// One unit of work for the engine
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// The engine's device init entry point: reset and wake the sensor
    Reset,
    /// A single register operation
    Register(RegisterOperation),
}

/// What to do at a register
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperationKind {
    /// Burst write of `len` bytes starting at the register
    Write { data: [u8; MAX_BURST], len: u8 },
    /// Write `(current & mask) | value` back to the register
    ReadModifyWrite { mask: u8, value: u8 },
    /// Burst read of `len` bytes starting at the register
    Read { len: u8 },
}

/// A register operation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterOperation {
    pub register: u8,
    pub kind: OperationKind,
}

impl RegisterOperation {
    /// Burst write; `data` longer than [`MAX_BURST`] is truncated
    pub fn write(register: u8, data: &[u8]) -> Self {
        let len = data.len().min(MAX_BURST);
        let mut buf = [0u8; MAX_BURST];
        buf[..len].copy_from_slice(&data[..len]);
        Self {
            register,
            kind: OperationKind::Write {
                data: buf,
                len: len as u8,
            },
        }
    }

    pub const fn read_modify_write(register: u8, mask: u8, value: u8) -> Self {
        Self {
            register,
            kind: OperationKind::ReadModifyWrite { mask, value },
        }
    }

    /// Burst read; `len` is capped at the completion scratch size
    pub const fn read(register: u8, len: u8) -> Self {
        let len = if len as usize > SCRATCH_LEN {
            SCRATCH_LEN as u8
        } else {
            len
        };
        Self {
            register,
            kind: OperationKind::Read { len },
        }
    }

    /// Number of payload bytes moved over the bus
    pub fn payload_len(&self) -> usize {
        match self.kind {
            OperationKind::Write { len, .. } | OperationKind::Read { len } => len as usize,
            OperationKind::ReadModifyWrite { .. } => 1,
        }
    }

    /// Payload of a write, empty for other kinds.
    ///
    /// A hand-built `len` beyond [`MAX_BURST`] is cut to the buffer.
    pub fn write_data(&self) -> &[u8] {
        match &self.kind {
            OperationKind::Write { data, len } => &data[..(*len as usize).min(MAX_BURST)],
            _ => &[],
        }
    }
}

/// Apply a read-modify-write to a register value
pub const fn modify(current: u8, mask: u8, value: u8) -> u8 {
    (current & mask) | value
}
