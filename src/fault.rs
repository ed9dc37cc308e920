//! Fail-stop escalation for applications that cannot recover from a bus
//! error during bring-up.

use core::panic::Location;

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

use crate::TransactionError;

/// Park the current execution context forever.
///
/// Interrupts that were already armed stay active, but the caller never
/// proceeds past an unconfirmed device state.
pub fn on_unrecoverable_error(error: TransactionError, location: &'static Location<'static>) -> ! {
    #[cfg(feature = "rttdebug")]
    rprintln!(
        "unrecoverable {:?} at {}:{}",
        error,
        location.file(),
        location.line()
    );
    #[cfg(feature = "defmt")]
    defmt::error!(
        "unrecoverable {} at {}:{}",
        error,
        location.file(),
        location.line()
    );
    #[cfg(not(any(feature = "rttdebug", feature = "defmt")))]
    let _ = (error, location);

    loop {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        cortex_m::asm::wfi();
        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        core::hint::spin_loop();
    }
}

/// Turn a transaction error into a fail-stop at the caller's location
pub trait OrHalt<T> {
    fn or_halt(self) -> T;
}

impl<T> OrHalt<T> for Result<T, TransactionError> {
    #[track_caller]
    fn or_halt(self) -> T {
        match self {
            Ok(value) => value,
            Err(error) => on_unrecoverable_error(error, Location::caller()),
        }
    }
}
