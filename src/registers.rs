/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! MPU-9150 register map and configuration field encodings

use crate::engine::RegisterOperation;

pub const REG_SMPLRT_DIV: u8 = 0x19;
pub const REG_CONFIG: u8 = 0x1A;
pub const REG_GYRO_CONFIG: u8 = 0x1B;
pub const REG_ACCEL_CONFIG: u8 = 0x1C;

pub const REG_INT_PIN_CFG: u8 = 0x37;
pub const REG_INT_ENABLE: u8 = 0x38;

pub const REG_ACCEL_XOUT_H: u8 = 0x3B;

pub const REG_PWR_MGMT_1: u8 = 0x6B;
pub const REG_WHO_AM_I: u8 = 0x75;

pub const MPU9150_WAI: u8 = 0x68;

/// Default bus address with AD0 low
pub const MPU9150_I2C_ADDRESS: u8 = 0x68;

/// Accel, temperature and gyro (14 bytes) followed by the AK8975 block in
/// `EXT_SENS_DATA_00..07`
pub const DATA_FETCH_LEN: u8 = 22;

pub const CONFIG_DLPF_CFG_M: u8 = 0x07;
pub const GYRO_CONFIG_FS_SEL_M: u8 = 0x18;
pub const ACCEL_CONFIG_AFS_SEL_M: u8 = 0x18;

pub const PWR_MGMT_1_DEVICE_RESET: u8 = 1 << 7;
/// PLL with X axis gyroscope reference
pub const PWR_MGMT_1_CLKSEL_XG: u8 = 0x01;

pub const INT_PIN_CFG_INT_LEVEL: u8 = 1 << 7;
pub const INT_PIN_CFG_INT_OPEN: u8 = 1 << 6;
pub const INT_PIN_CFG_LATCH_INT_EN: u8 = 1 << 5;
pub const INT_PIN_CFG_INT_RD_CLEAR: u8 = 1 << 4;

pub const INT_ENABLE_DATA_RDY_EN: u8 = 0x01;

/// Gyroscope output rate with the DLPF bypassed (DLPF_CFG 0 or 7)
pub const GYRO_RATE_UNFILTERED_HZ: u32 = 8000;
/// Gyroscope output rate with the DLPF active
pub const GYRO_RATE_FILTERED_HZ: u32 = 1000;

/// Gyroscope output rate implied by a raw `CONFIG` register value.
///
/// Only the DLPF_CFG field (low 3 bits) is considered.
pub const fn gyro_output_rate(config: u8) -> u32 {
    match config & CONFIG_DLPF_CFG_M {
        0 | 7 => GYRO_RATE_UNFILTERED_HZ,
        _ => GYRO_RATE_FILTERED_HZ,
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Digital low pass filter bandwidth, accel / gyro
pub enum DlpfConfig {
    /// 260 Hz / 256 Hz, gyro sampled at 8 kHz
    Bw260Hz = 0,
    Bw184Hz = 1,
    Bw94Hz = 2,
    Bw44Hz = 3,
    Bw21Hz = 4,
    Bw10Hz = 5,
    Bw5Hz = 6,
}

impl Default for DlpfConfig {
    fn default() -> Self {
        DlpfConfig::Bw260Hz
    }
}

#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// The gyroscope has a programmable full-scale range of ±250, ±500, ±1000, or ±2000 degrees/sec.
pub enum GyroRange {
    /// ±250
    Range_250dps = 0b00,
    /// ±500
    Range_500dps = 0b01,
    /// ±1000
    Range_1000dps = 0b10,
    /// ±2000
    Range_2000dps = 0b11,
}

impl Default for GyroRange {
    fn default() -> Self {
        GyroRange::Range_2000dps
    }
}

impl GyroRange {
    /// convert degrees into radians
    const RADIANS_PER_DEGREE: f32 = core::f32::consts::PI / 180.0;

    /// FS_SEL field as placed in `GYRO_CONFIG`
    pub const fn bits(self) -> u8 {
        (self as u8) << 3
    }

    /// Gyro range in radians per second per bit
    pub fn scale(&self) -> f32 {
        Self::RADIANS_PER_DEGREE * self.resolution()
    }

    /// Gyro resolution in degrees per second per bit
    /// Note that the ranges are ± which splits the raw i16 resolution between + and -
    pub fn resolution(&self) -> f32 {
        match self {
            GyroRange::Range_250dps => 250.0 / 32768.0,
            GyroRange::Range_500dps => 500.0 / 32768.0,
            GyroRange::Range_1000dps => 1000.0 / 32768.0,
            GyroRange::Range_2000dps => 2000.0 / 32768.0,
        }
    }
}

#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// The accelerometer has a user-programmable accelerometer full-scale range
/// of ±2g, ±4g, ±8g, and ±16g.
/// The numeric values of these enums correspond to AFS_SEL
pub enum AccelRange {
    /// ±2g
    Range_2g = 0b00,
    /// ±4g
    Range_4g = 0b01,
    /// ±8g
    Range_8g = 0b10,
    /// ±16g
    Range_16g = 0b11,
}

impl Default for AccelRange {
    fn default() -> Self {
        AccelRange::Range_16g
    }
}

impl AccelRange {
    /// Earth gravitational acceleration (G) standard, in meters per second squared
    const EARTH_GRAVITY_ACCEL: f32 = 9.807;

    /// AFS_SEL field as placed in `ACCEL_CONFIG`
    pub const fn bits(self) -> u8 {
        (self as u8) << 3
    }

    /// accelerometer scale in meters per second squared per bit
    pub fn scale(&self) -> f32 {
        Self::EARTH_GRAVITY_ACCEL * self.resolution()
    }

    /// Accelerometer resolution in G / bit
    pub fn resolution(&self) -> f32 {
        match self {
            Self::Range_2g => 2.0 / 32768.0,
            Self::Range_4g => 4.0 / 32768.0,
            Self::Range_8g => 8.0 / 32768.0,
            Self::Range_16g => 16.0 / 32768.0,
        }
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Accelerometer digital high pass filter, ACCEL_HPF field of `ACCEL_CONFIG`
pub enum AccelHpf {
    Reset = 0,
    Hz5 = 1,
    Hz2_5 = 2,
    Hz1_25 = 3,
    Hz0_63 = 4,
    Hold = 7,
}

impl Default for AccelHpf {
    fn default() -> Self {
        AccelHpf::Hz5
    }
}

/// Electrical behaviour of the INT pin
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptPinConfig {
    /// Active low (true) or active high (false)
    pub active_low: bool,
    /// Open-drain (true) or push-pull (false)
    pub open_drain: bool,
    /// Hold INT asserted until cleared
    pub latch_enabled: bool,
    /// Clear on any register read (true) or only on `INT_STATUS` read (false)
    pub clear_on_any_read: bool,
}

impl Default for InterruptPinConfig {
    fn default() -> Self {
        Self {
            active_low: true,
            open_drain: false,
            latch_enabled: true,
            clear_on_any_read: true,
        }
    }
}

impl InterruptPinConfig {
    /// Raw `INT_PIN_CFG` value
    pub const fn bits(&self) -> u8 {
        let mut value = 0;
        if self.active_low {
            value |= INT_PIN_CFG_INT_LEVEL;
        }
        if self.open_drain {
            value |= INT_PIN_CFG_INT_OPEN;
        }
        if self.latch_enabled {
            value |= INT_PIN_CFG_LATCH_INT_EN;
        }
        if self.clear_on_any_read {
            value |= INT_PIN_CFG_INT_RD_CLEAR;
        }
        value
    }
}

/// Application sensor configuration written by
/// [`Mpu9150::initialize`](crate::Mpu9150::initialize)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorConfig {
    pub dlpf: DlpfConfig,
    pub gyro_range: GyroRange,
    pub accel_range: AccelRange,
    pub accel_hpf: AccelHpf,
    pub int_pin: InterruptPinConfig,
    /// Raise INT whenever a new sample is available
    pub data_ready_interrupt: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            dlpf: DlpfConfig::default(),
            gyro_range: GyroRange::default(),
            accel_range: AccelRange::default(),
            accel_hpf: AccelHpf::default(),
            int_pin: InterruptPinConfig::default(),
            data_ready_interrupt: true,
        }
    }
}

impl SensorConfig {
    /// Register steps that follow the device reset, in the order they must
    /// be applied.
    ///
    /// `CONFIG`, `GYRO_CONFIG` and `ACCEL_CONFIG` are contiguous and written
    /// as one burst, as are `INT_PIN_CFG` and `INT_ENABLE`. The range fields
    /// are then re-asserted through read-modify-write so that other bits set
    /// by the reset survive.
    pub fn init_sequence(&self) -> [RegisterOperation; 4] {
        let int_enable = if self.data_ready_interrupt {
            INT_ENABLE_DATA_RDY_EN
        } else {
            0
        };
        [
            RegisterOperation::write(
                REG_CONFIG,
                &[
                    self.dlpf as u8,
                    self.gyro_range.bits(),
                    self.accel_hpf as u8 | self.accel_range.bits(),
                ],
            ),
            RegisterOperation::write(REG_INT_PIN_CFG, &[self.int_pin.bits(), int_enable]),
            RegisterOperation::read_modify_write(
                REG_ACCEL_CONFIG,
                !ACCEL_CONFIG_AFS_SEL_M,
                self.accel_range.bits(),
            ),
            RegisterOperation::read_modify_write(
                REG_GYRO_CONFIG,
                !GYRO_CONFIG_FS_SEL_M,
                self.gyro_range.bits(),
            ),
        ]
    }
}
