//! Data-ready interrupt relay.
//!
//! Called from the GPIO edge interrupt handler. It acknowledges the edge
//! and, when the sensor's INT pin is among the asserted lines, starts a
//! non-blocking sample fetch on the transaction engine.

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

use crate::completion::Completion;
use crate::engine::{RegisterOperation, Request, TransactionEngine};
use crate::registers::{DATA_FETCH_LEN, REG_ACCEL_XOUT_H};
use crate::TransactionError;

/// Edge interrupt status for one GPIO port
pub trait InterruptPort {
    /// Bit mask of pins with a pending, enabled edge interrupt
    fn pending(&mut self) -> u32;

    /// Acknowledge the pins in `mask`
    fn clear(&mut self, mask: u32);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayState {
    Idle,
    AwaitingFetch,
}

/// Maps data-ready edges on `pin_mask` to sample fetches
#[derive(Debug)]
pub struct DataReadyRelay {
    address: u8,
    pin_mask: u32,
    completion: &'static Completion,
}

impl DataReadyRelay {
    pub const fn new(address: u8, pin_mask: u32, completion: &'static Completion) -> Self {
        Self {
            address,
            pin_mask,
            completion,
        }
    }

    pub fn state(&self) -> RelayState {
        if self.completion.is_in_flight() {
            RelayState::AwaitingFetch
        } else {
            RelayState::Idle
        }
    }

    /// Handle one GPIO edge interrupt.
    ///
    /// All pending flags on the port are cleared. Returns `Ok(true)` if a
    /// fetch was submitted, `Ok(false)` if the sensor pin was not asserted.
    /// Never waits: while a foreground transaction or the previous fetch
    /// is outstanding, the edge is reported as [`TransactionError::Busy`]
    /// and nothing is submitted.
    pub fn on_edge<P, E>(&self, port: &mut P, engine: &mut E) -> Result<bool, TransactionError>
    where
        P: InterruptPort,
        E: TransactionEngine,
    {
        let pending = port.pending();
        port.clear(pending);

        if pending & self.pin_mask == 0 {
            return Ok(false);
        }

        let completer = self.completion.arm_from_interrupt().map_err(|e| {
            #[cfg(feature = "rttdebug")]
            rprintln!("data-ready edge dropped: {:?}", e);
            e
        })?;
        engine.submit(
            self.address,
            Request::Register(RegisterOperation::read(REG_ACCEL_XOUT_H, DATA_FETCH_LEN)),
            completer,
        );
        Ok(true)
    }
}
