/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Interrupt-driven bring-up driver for the MPU-9150 9DOF IMU.
//!
//! Bus access goes through a [`TransactionEngine`] that completes requests
//! asynchronously, typically from the bus controller interrupt. The
//! [`Mpu9150`] handle issues one request at a time and blocks on a shared
//! [`Completion`] until the engine reports the outcome, so the configuration
//! sequence reads like straight-line code while the bus runs from
//! interrupts.

#![no_std]

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

pub mod bringup;
pub mod completion;
pub mod engine;
pub mod fault;
pub mod registers;
pub mod relay;
mod sample;

pub use completion::{Completer, Completion, TransactionOutcome};
pub use engine::{I2cEngine, OperationKind, RegisterOperation, Request, TransactionEngine};
pub use fault::{on_unrecoverable_error, OrHalt};
pub use registers::{
    AccelHpf, AccelRange, DlpfConfig, GyroRange, InterruptPinConfig, SensorConfig,
    MPU9150_I2C_ADDRESS,
};
pub use relay::{DataReadyRelay, InterruptPort, RelayState};
pub use sample::Sample;

use registers::*;

/// Errors in this crate
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransactionError {
    /// The engine reported a non-zero status, see [`engine::status`]
    BusFailure(u8),
    /// A derived register value is out of range; nothing was submitted
    ConfigurationInvalid,
    /// The bounded wait expired with the transaction still in flight
    Timeout,
    /// Another transaction is still in flight
    Busy,
}

/// How the handle waits for each transaction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitPolicy {
    /// Spin until the engine reports, however long it takes
    Spin,
    /// Give up with [`TransactionError::Timeout`] after this many polls
    Polls(u32),
}

pub struct Builder {
    address: u8,
    config: SensorConfig,
    wait: WaitPolicy,
}

impl Builder {
    pub const fn new() -> Self {
        Self {
            address: MPU9150_I2C_ADDRESS,
            config: SensorConfig {
                dlpf: DlpfConfig::Bw260Hz,
                gyro_range: GyroRange::Range_2000dps,
                accel_range: AccelRange::Range_16g,
                accel_hpf: AccelHpf::Hz5,
                int_pin: InterruptPinConfig {
                    active_low: true,
                    open_drain: false,
                    latch_enabled: true,
                    clear_on_any_read: true,
                },
                data_ready_interrupt: true,
            },
            wait: WaitPolicy::Spin,
        }
    }

    /// Bus address of the sensor (0x69 with AD0 high)
    pub const fn address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub const fn config(mut self, config: SensorConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Create a driver on top of any transaction engine
    pub fn build<E>(self, engine: E, completion: &'static Completion) -> Mpu9150<E>
    where
        E: TransactionEngine,
    {
        Mpu9150 {
            engine,
            completion,
            address: self.address,
            config: self.config,
            wait: self.wait,
            gyro_scale: 0.0,
            accel_scale: 0.0,
        }
    }

    /// Create a driver using a blocking I2C bus
    pub fn new_i2c<I2C, D>(
        self,
        i2c: I2C,
        delay_source: D,
        completion: &'static Completion,
    ) -> Mpu9150<I2cEngine<I2C, D>>
    where
        I2C: embedded_hal::i2c::I2c,
        D: embedded_hal::delay::DelayNs,
    {
        self.build(I2cEngine::new(i2c, delay_source), completion)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Mpu9150<E> {
    pub(crate) engine: E,
    pub(crate) completion: &'static Completion,
    pub(crate) address: u8,
    pub(crate) config: SensorConfig,
    pub(crate) wait: WaitPolicy,

    pub(crate) gyro_scale: f32,
    pub(crate) accel_scale: f32,
}

impl<E> Mpu9150<E>
where
    E: TransactionEngine,
{
    /// Reset the sensor and apply the configuration, one confirmed step at a
    /// time.
    ///
    /// The first failing step aborts the sequence and its error is returned;
    /// no later step is submitted. A bus failure stays latched on the
    /// completion signal until [`Completion::reset`] is called.
    pub fn initialize(&mut self) -> Result<(), TransactionError> {
        self.transact(Request::Reset)?;

        for op in self.config.init_sequence() {
            self.transact(Request::Register(op))?;
        }

        self.gyro_scale = self.config.gyro_range.scale();
        self.accel_scale = self.config.accel_range.scale();
        Ok(())
    }

    /// Program the sample rate divider for `rate_hz` samples per second.
    ///
    /// The gyroscope output rate is read back from the DLPF setting already
    /// on the device.
    pub fn set_sample_rate(&mut self, rate_hz: u16) -> Result<(), TransactionError> {
        let config = self.read_register(REG_CONFIG)?;
        let base_hz = gyro_output_rate(config);
        let divider = sample_rate_divider(base_hz, rate_hz)?;

        #[cfg(feature = "rttdebug")]
        rprintln!("rate {} Hz from {} Hz: div {}", rate_hz, base_hz, divider);

        self.transact(Request::Register(RegisterOperation::read_modify_write(
            REG_SMPLRT_DIV,
            0,
            divider,
        )))
    }

    /// Initialize, then set the sample rate
    pub fn start(&mut self, rate_hz: u16) -> Result<(), TransactionError> {
        self.initialize()?;
        self.set_sample_rate(rate_hz)
    }

    pub fn read_register(&mut self, reg: u8) -> Result<u8, TransactionError> {
        let mut val = [0u8];
        self.transact_into(Request::Register(RegisterOperation::read(reg, 1)), &mut val)?;
        Ok(val[0])
    }

    /// Fetch one sample in the foreground
    pub fn read_sample(&mut self) -> Result<Sample, TransactionError> {
        let mut block = [0u8; DATA_FETCH_LEN as usize];
        let len = self.transact_into(
            Request::Register(RegisterOperation::read(REG_ACCEL_XOUT_H, DATA_FETCH_LEN)),
            &mut block,
        )?;
        Sample::from_bytes(&block[..len])
            .ok_or(TransactionError::BusFailure(engine::status::ERROR))
    }

    /// Decode the payload of the most recent completed fetch, including one
    /// started by the data-ready relay.
    ///
    /// `None` if the last completed read was not a full sample fetch.
    pub fn last_sample(&self) -> Option<Sample> {
        let mut block = [0u8; DATA_FETCH_LEN as usize];
        let len = self.completion.take_read(&mut block);
        Sample::from_bytes(&block[..len])
    }

    /// Acceleration in meters per second squared
    pub fn scaled_accel(&self, sample: &Sample) -> [f32; 3] {
        [
            self.accel_scale * (sample.accel[0] as f32),
            self.accel_scale * (sample.accel[1] as f32),
            self.accel_scale * (sample.accel[2] as f32),
        ]
    }

    /// Angular rate in radians per second
    pub fn scaled_gyro(&self, sample: &Sample) -> [f32; 3] {
        [
            self.gyro_scale * (sample.gyro[0] as f32),
            self.gyro_scale * (sample.gyro[1] as f32),
            self.gyro_scale * (sample.gyro[2] as f32),
        ]
    }

    /// Relay for the GPIO interrupt handler, sharing this handle's
    /// completion signal
    pub fn data_ready_relay(&self, pin_mask: u32) -> DataReadyRelay {
        DataReadyRelay::new(self.address, pin_mask, self.completion)
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Release the engine
    pub fn release(self) -> E {
        self.engine
    }

    /// Submit one request and block until it completes, copying any read
    /// payload into `rx`
    fn transact_into(
        &mut self,
        request: Request,
        rx: &mut [u8],
    ) -> Result<usize, TransactionError> {
        let mut keep_waiting = match self.wait {
            WaitPolicy::Spin => None,
            WaitPolicy::Polls(limit) => Some(limit),
        };
        let mut idle = move || match keep_waiting.as_mut() {
            None => {
                core::hint::spin_loop();
                true
            }
            Some(0) => false,
            Some(remaining) => {
                *remaining -= 1;
                core::hint::spin_loop();
                true
            }
        };

        // a fetch started by the data-ready relay may still own the bus
        let completer = loop {
            match self.completion.arm() {
                Err(TransactionError::Busy) if idle() => continue,
                other => break other?,
            }
        };

        #[cfg(feature = "rttdebug")]
        rprintln!("submit {:?}", request);

        self.engine.submit(self.address, request, completer);
        let result = self.completion.wait_until(rx, &mut idle);

        #[cfg(feature = "rttdebug")]
        if let Err(e) = result {
            rprintln!("{:?} failed: {:?}", request, e);
        }

        result
    }

    fn transact(&mut self, request: Request) -> Result<(), TransactionError> {
        self.transact_into(request, &mut []).map(drop)
    }
}

/// Sample rate divider giving `rate_hz` from a gyroscope output rate of
/// `base_hz`.
///
/// `SMPLRT_DIV` is 8 bits wide, so rates that need a divider above 255, a
/// zero rate, or a rate above `base_hz` are rejected.
pub fn sample_rate_divider(base_hz: u32, rate_hz: u16) -> Result<u8, TransactionError> {
    let rate_hz = u32::from(rate_hz);
    if rate_hz == 0 || rate_hz > base_hz {
        return Err(TransactionError::ConfigurationInvalid);
    }
    u8::try_from(base_hz / rate_hz - 1).map_err(|_| TransactionError::ConfigurationInvalid)
}
