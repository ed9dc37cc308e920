/// One raw data-ready fetch: accel, temperature, gyro and the AK8975
/// magnetometer block mirrored into `EXT_SENS_DATA`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub accel: [i16; 3],
    pub temperature: i16,
    pub gyro: [i16; 3],
    pub mag: [i16; 3],
    /// AK8975 ST1 data-ready bit
    pub mag_ready: bool,
    /// AK8975 ST2 overflow or data error
    pub mag_overflow: bool,
}

impl Sample {
    /// microtesla per bit of the AK8975
    pub const MAG_SCALE: f32 = 0.3;

    const AK8975_ST1_DRDY: u8 = 0x01;
    const AK8975_ST2_ERR: u8 = 0x0C;

    /// Decode a fetch starting at `ACCEL_XOUT_H`.
    ///
    /// Returns `None` if fewer than
    /// [`DATA_FETCH_LEN`](crate::registers::DATA_FETCH_LEN) bytes are given.
    pub fn from_bytes(block: &[u8]) -> Option<Self> {
        if block.len() < crate::registers::DATA_FETCH_LEN as usize {
            return None;
        }
        let be = |i: usize| i16::from_be_bytes([block[i], block[i + 1]]);
        // the magnetometer reports little endian
        let le = |i: usize| i16::from_le_bytes([block[i], block[i + 1]]);

        Some(Self {
            accel: [be(0), be(2), be(4)],
            temperature: be(6),
            gyro: [be(8), be(10), be(12)],
            mag_ready: block[14] & Self::AK8975_ST1_DRDY != 0,
            mag: [le(15), le(17), le(19)],
            mag_overflow: block[21] & Self::AK8975_ST2_ERR != 0,
        })
    }

    /// Die temperature in degrees Celsius
    pub fn temperature_celsius(&self) -> f32 {
        (self.temperature as f32) / 340.0 + 35.0
    }

    /// Magnetic field in microtesla
    pub fn mag_microtesla(&self) -> [f32; 3] {
        [
            Self::MAG_SCALE * (self.mag[0] as f32),
            Self::MAG_SCALE * (self.mag[1] as f32),
            Self::MAG_SCALE * (self.mag[2] as f32),
        ]
    }
}
