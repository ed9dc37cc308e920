/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Single-slot completion signal shared between the bus interrupt and the
//! foreground configuration code.
//!
//! The foreground [`arm`](Completion::arm)s the signal before every
//! submission and hands the returned [`Completer`] to the transaction engine.
//! The engine resolves the completer exactly once, normally from its
//! interrupt handler, and the foreground observes the outcome through one of
//! the `wait*` methods.
//!
//! Transactions started from interrupt context use
//! [`arm_from_interrupt`](Completion::arm_from_interrupt). Nobody waits for
//! those, so the slot frees itself as soon as they resolve.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

use crate::engine::status;
use crate::TransactionError;

/// Largest read payload the signal can carry back to the foreground
pub const SCRATCH_LEN: usize = 24;

const STATE_PENDING: u8 = 0;
const STATE_SUCCESS: u8 = 1;
const STATE_ERROR: u8 = 2;

/// Outcome of the most recently submitted transaction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransactionOutcome {
    /// Not completed yet, or already consumed
    Pending,
    /// Completed successfully
    Success,
    /// Completed with a non-zero engine status
    Error(u8),
}

struct Scratch {
    len: usize,
    bytes: [u8; SCRATCH_LEN],
}

/// Completion signal for one in-flight bus transaction at a time.
///
/// Usually declared as a `static` so that the interrupt handlers and the
/// foreground can all reach it:
///
/// ```
/// use mpu9150_irq::Completion;
/// static COMPLETION: Completion = Completion::new();
/// ```
pub struct Completion {
    state: AtomicU8,
    code: AtomicU8,
    /// armed and not resolved yet
    in_flight: AtomicBool,
    /// armed by the foreground and not consumed yet
    held: AtomicBool,
    generation: AtomicU32,
    scratch: Mutex<RefCell<Scratch>>,
}

impl Completion {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_PENDING),
            code: AtomicU8::new(status::SUCCESS),
            in_flight: AtomicBool::new(false),
            held: AtomicBool::new(false),
            generation: AtomicU32::new(0),
            scratch: Mutex::new(RefCell::new(Scratch {
                len: 0,
                bytes: [0; SCRATCH_LEN],
            })),
        }
    }

    /// Prepare the signal for a foreground transaction and return its resolver.
    ///
    /// The slot stays taken until one of the `wait*` methods consumes a
    /// successful outcome, or until [`reset`](Self::reset).
    ///
    /// Fails with [`TransactionError::Busy`] while another transaction is in
    /// flight, and returns the held error if a previous failure has not been
    /// acknowledged with [`reset`](Self::reset). An unconsumed success from
    /// an interrupt-side transaction is discarded.
    pub fn arm(&'static self) -> Result<Completer, TransactionError> {
        let completer = self.claim()?;
        self.held.store(true, Ordering::Release);
        Ok(completer)
    }

    /// Like [`arm`](Self::arm), for transactions nobody will wait for.
    ///
    /// Never blocks. The slot is released as soon as the completer resolves.
    /// A latched error is reported before a foreground hold.
    pub fn arm_from_interrupt(&'static self) -> Result<Completer, TransactionError> {
        self.latched_error()?;
        if self.held.load(Ordering::Acquire) {
            return Err(TransactionError::Busy);
        }
        self.claim()
    }

    fn latched_error(&self) -> Result<(), TransactionError> {
        if self.state.load(Ordering::Acquire) == STATE_ERROR {
            return Err(TransactionError::BusFailure(
                self.code.load(Ordering::Relaxed),
            ));
        }
        Ok(())
    }

    fn claim(&'static self) -> Result<Completer, TransactionError> {
        // resolve also runs in a critical section, so it cannot land between
        // the latch check and taking the slot
        let generation = critical_section::with(|_| {
            self.latched_error()?;
            if self
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(TransactionError::Busy);
            }

            let generation = self.generation.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
            self.state.store(STATE_PENDING, Ordering::Release);
            Ok(generation)
        })?;

        Ok(Completer {
            completion: self,
            generation,
            resolved: false,
        })
    }

    /// Current outcome, without consuming it
    pub fn outcome(&self) -> TransactionOutcome {
        match self.state.load(Ordering::Acquire) {
            STATE_SUCCESS => TransactionOutcome::Success,
            STATE_ERROR => TransactionOutcome::Error(self.code.load(Ordering::Relaxed)),
            _ => TransactionOutcome::Pending,
        }
    }

    /// True between arming and the resolution of the completer
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Acknowledge an error, or abandon an in-flight transaction.
    ///
    /// A completer belonging to an abandoned transaction is ignored if it
    /// resolves later.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.in_flight.store(false, Ordering::Release);
        self.held.store(false, Ordering::Release);
        self.code.store(status::SUCCESS, Ordering::Relaxed);
        self.state.store(STATE_PENDING, Ordering::Release);
    }

    /// Spin until the outstanding transaction completes.
    ///
    /// Blocks forever if nothing was submitted.
    pub fn wait(&self) -> Result<(), TransactionError> {
        self.wait_with(core::hint::spin_loop)
    }

    /// Like [`wait`](Self::wait), calling `idle` between polls.
    ///
    /// `idle` may enter a low-power state as long as the bus interrupt still
    /// wakes the core.
    pub fn wait_with(&self, mut idle: impl FnMut()) -> Result<(), TransactionError> {
        self.wait_until(&mut [], || {
            idle();
            true
        })
        .map(drop)
    }

    /// Poll at most `limit` times before giving up with [`TransactionError::Timeout`].
    ///
    /// The transaction stays in flight after a timeout; call
    /// [`reset`](Self::reset) before submitting again.
    pub fn wait_polls(&self, limit: u32) -> Result<(), TransactionError> {
        self.wait_until(&mut [], poll_budget(limit)).map(drop)
    }

    /// Wait up to `timeout_us` microseconds, checking once per microsecond.
    pub fn wait_timeout(
        &self,
        delay_source: &mut impl DelayNs,
        timeout_us: u32,
    ) -> Result<(), TransactionError> {
        let mut remaining = timeout_us;
        self.wait_until(&mut [], || {
            if remaining == 0 {
                return false;
            }
            remaining -= 1;
            delay_source.delay_us(1);
            true
        })
        .map(drop)
    }

    /// Wait for the outcome, copying the read payload into `buf` as the
    /// success is consumed.
    ///
    /// `idle` runs between polls; returning `false` gives up with
    /// [`TransactionError::Timeout`]. Returns the number of bytes copied.
    pub fn wait_until(
        &self,
        buf: &mut [u8],
        mut idle: impl FnMut() -> bool,
    ) -> Result<usize, TransactionError> {
        loop {
            if let Some(result) = self.poll(buf) {
                return result;
            }
            if !idle() {
                return self.poll(buf).unwrap_or(Err(TransactionError::Timeout));
            }
        }
    }

    /// Copy the payload of the last completed read into `buf`.
    ///
    /// Returns the number of bytes copied.
    pub fn take_read(&self, buf: &mut [u8]) -> usize {
        critical_section::with(|cs| self.copy_scratch(cs, buf))
    }

    fn copy_scratch(&self, cs: critical_section::CriticalSection, buf: &mut [u8]) -> usize {
        let scratch = self.scratch.borrow(cs).borrow();
        let len = scratch.len.min(buf.len());
        buf[..len].copy_from_slice(&scratch.bytes[..len]);
        len
    }

    /// Success is consumed together with its payload; an error is left in place.
    fn poll(&self, buf: &mut [u8]) -> Option<Result<usize, TransactionError>> {
        match self.state.load(Ordering::Acquire) {
            STATE_SUCCESS => Some(Ok(critical_section::with(|cs| {
                let len = self.copy_scratch(cs, buf);
                self.state.store(STATE_PENDING, Ordering::Release);
                self.held.store(false, Ordering::Release);
                len
            }))),
            STATE_ERROR => Some(Err(TransactionError::BusFailure(
                self.code.load(Ordering::Relaxed),
            ))),
            _ => None,
        }
    }

    fn resolve(&self, generation: u32, code: u8, data: &[u8]) -> bool {
        if self.generation.load(Ordering::Acquire) != generation {
            #[cfg(feature = "rttdebug")]
            rprintln!("stale completion gen {} ignored", generation);
            return false;
        }

        critical_section::with(|cs| {
            if code == status::SUCCESS {
                let mut scratch = self.scratch.borrow(cs).borrow_mut();
                let len = data.len().min(SCRATCH_LEN);
                scratch.bytes[..len].copy_from_slice(&data[..len]);
                scratch.len = len;
            }

            self.code.store(code, Ordering::Relaxed);
            self.in_flight.store(false, Ordering::Release);
            let state = if code == status::SUCCESS {
                STATE_SUCCESS
            } else {
                STATE_ERROR
            };
            self.state.store(state, Ordering::Release);
        });
        true
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

fn poll_budget(limit: u32) -> impl FnMut() -> bool {
    let mut remaining = limit;
    move || {
        if remaining == 0 {
            return false;
        }
        remaining -= 1;
        core::hint::spin_loop();
        true
    }
}

/// Resolver for one armed transaction.
///
/// Consumed by resolution, so each transaction completes at most once.
/// Dropping it unresolved records [`status::ABANDONED`].
#[must_use = "an unresolved completer records an abandoned transaction"]
pub struct Completer {
    completion: &'static Completion,
    generation: u32,
    resolved: bool,
}

impl Completer {
    /// Resolve with an engine status code; zero means success.
    ///
    /// Returns `false` if the transaction had been abandoned with
    /// [`Completion::reset`].
    pub fn complete(mut self, code: u8) -> bool {
        self.resolved = true;
        self.completion.resolve(self.generation, code, &[])
    }

    /// Resolve a successful read, publishing `data` to the foreground
    pub fn complete_read(mut self, data: &[u8]) -> bool {
        self.resolved = true;
        self.completion.resolve(self.generation, status::SUCCESS, data)
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if !self.resolved {
            self.completion
                .resolve(self.generation, status::ABANDONED, &[]);
        }
    }
}

impl core::fmt::Debug for Completion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Completion")
            .field("outcome", &self.outcome())
            .field("in_flight", &self.is_in_flight())
            .finish()
    }
}

impl core::fmt::Debug for Completer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Completer")
            .field("generation", &self.generation)
            .field("resolved", &self.resolved)
            .finish()
    }
}
