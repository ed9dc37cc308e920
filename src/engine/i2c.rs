use embedded_hal as hal;
use hal::delay::DelayNs;
use hal::i2c::{Error as _, ErrorKind, NoAcknowledgeSource};

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

use super::{modify, status, OperationKind, RegisterOperation, Request, TransactionEngine};
use crate::completion::{Completer, SCRATCH_LEN};
use crate::registers::{
    MPU9150_WAI, PWR_MGMT_1_CLKSEL_XG, PWR_MGMT_1_DEVICE_RESET, REG_PWR_MGMT_1, REG_WHO_AM_I,
};

/// Transaction engine over a blocking `embedded-hal` I2C bus.
///
/// Every request runs to completion inside [`submit`](TransactionEngine::submit)
/// and the completer is resolved before it returns, as if the bus interrupt
/// had fired immediately.
pub struct I2cEngine<I2C, D> {
    /// i2c port
    i2c: I2C,
    /// delay source used while the device resets
    delay: D,
}

impl<I2C, D> I2cEngine<I2C, D>
where
    I2C: hal::i2c::I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self { i2c, delay }
    }

    /// Release owned resources
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn register_read(&mut self, address: u8, reg: u8, buf: &mut [u8]) -> Result<(), u8> {
        self.i2c
            .write_read(address, &[reg], buf)
            .map_err(|e| status_from_kind(e.kind()))
    }

    fn register_write(&mut self, address: u8, reg: u8, data: &[u8]) -> Result<(), u8> {
        let mut block = [0u8; 1 + super::MAX_BURST];
        block[0] = reg;
        block[1..=data.len()].copy_from_slice(data);

        #[cfg(feature = "rttdebug")]
        rprintln!("write {:x?} ", &block[..=data.len()]);

        self.i2c
            .write(address, &block[..=data.len()])
            .map_err(|e| status_from_kind(e.kind()))
    }

    /// Reset the sensor, confirm its identity and select a stable clock
    fn soft_reset(&mut self, address: u8) -> Result<(), u8> {
        self.register_write(address, REG_PWR_MGMT_1, &[PWR_MGMT_1_DEVICE_RESET])?;
        //reset can take up to 100 ms
        self.delay.delay_ms(110);

        let mut reset_success = false;
        for _ in 0..10 {
            //The reset bit automatically clears to 0 once the reset is done.
            let mut reg_val = [0u8];
            if self.register_read(address, REG_PWR_MGMT_1, &mut reg_val).is_ok()
                && reg_val[0] & PWR_MGMT_1_DEVICE_RESET == 0
            {
                reset_success = true;
                break;
            }
            self.delay.delay_ms(10);
        }
        if !reset_success {
            #[cfg(feature = "rttdebug")]
            rprintln!("couldn't read REG_PWR_MGMT_1");
            return Err(status::UNRESPONSIVE);
        }

        let mut chip_id = [0u8];
        self.register_read(address, REG_WHO_AM_I, &mut chip_id)?;
        if chip_id[0] != MPU9150_WAI {
            #[cfg(feature = "rttdebug")]
            rprintln!("bogus whoami: 0x{:0x}  ", chip_id[0]);
            return Err(status::UNKNOWN_DEVICE);
        }

        // also clears SLEEP
        self.register_write(address, REG_PWR_MGMT_1, &[PWR_MGMT_1_CLKSEL_XG])
    }

    fn run(&mut self, address: u8, op: &RegisterOperation, rx: &mut [u8]) -> Result<usize, u8> {
        match op.kind {
            OperationKind::Write { len, .. } if len as usize > super::MAX_BURST => {
                Err(status::ERROR)
            }
            OperationKind::Read { len } if len as usize > rx.len() => Err(status::ERROR),
            OperationKind::Write { .. } => {
                self.register_write(address, op.register, op.write_data())?;
                Ok(0)
            }
            OperationKind::ReadModifyWrite { mask, value } => {
                let mut current = [0u8];
                self.register_read(address, op.register, &mut current)?;
                self.register_write(address, op.register, &[modify(current[0], mask, value)])?;
                Ok(0)
            }
            OperationKind::Read { len } => {
                let len = len as usize;
                self.register_read(address, op.register, &mut rx[..len])?;
                Ok(len)
            }
        }
    }
}

impl<I2C, D> TransactionEngine for I2cEngine<I2C, D>
where
    I2C: hal::i2c::I2c,
    D: DelayNs,
{
    fn submit(&mut self, address: u8, request: Request, completer: Completer) {
        let mut rx = [0u8; SCRATCH_LEN];
        let result = match request {
            Request::Reset => self.soft_reset(address).map(|_| 0),
            Request::Register(op) => self.run(address, &op, &mut rx),
        };

        match result {
            Ok(0) => completer.complete(status::SUCCESS),
            Ok(len) => completer.complete_read(&rx[..len]),
            Err(code) => {
                #[cfg(feature = "rttdebug")]
                rprintln!("i2c request failed: {}", code);
                completer.complete(code)
            }
        };
    }
}

/// Map an `embedded-hal` bus error onto an engine status code
pub fn status_from_kind(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => status::ADDR_NACK,
        ErrorKind::NoAcknowledge(_) => status::DATA_NACK,
        ErrorKind::ArbitrationLoss => status::ARB_LOST,
        _ => status::ERROR,
    }
}
