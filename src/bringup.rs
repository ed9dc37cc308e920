//! Board bring-up for the sensor's I2C controller and INT line.
//!
//! Clock setup, pin muxing and interrupt controller programming belong to
//! the board support crate; [`Platform`] is the slice of it this driver
//! needs, and [`bring_up`] calls it in the order the hardware requires.

/// The board capabilities used during bring-up
pub trait Platform {
    type Peripheral: Copy;
    type Pin: Copy;
    type Line: Copy;

    /// Power and clock a peripheral block
    fn enable_peripheral(&mut self, peripheral: Self::Peripheral);

    /// Keep a peripheral clocked while the core sleeps
    fn enable_in_sleep(&mut self, peripheral: Self::Peripheral);

    fn configure_pin(&mut self, pin: Self::Pin, function: PinFunction);

    fn enable_interrupt(&mut self, line: Self::Line, edge: Edge);

    /// Globally unmask interrupts at the core
    fn enable_interrupts(&mut self);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinFunction {
    I2cScl,
    I2cSda,
    Input,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

/// Peripherals and pins wiring the sensor to the board
pub struct BoardLayout<P: Platform> {
    /// GPIO port carrying the sensor INT pin
    pub int_port: P::Peripheral,
    /// I2C controller connected to the sensor
    pub i2c: P::Peripheral,
    /// GPIO port carrying SCL / SDA
    pub i2c_port: P::Peripheral,
    pub scl: P::Pin,
    pub sda: P::Pin,
    pub int_pin: P::Pin,
    /// Interrupt line of the INT pin's port
    pub int_line: P::Line,
}

/// Enable and wire the peripherals the driver depends on.
///
/// Must run before the transaction engine is created, and leaves interrupts
/// globally enabled so that bus completions can be observed.
pub fn bring_up<P: Platform>(platform: &mut P, layout: &BoardLayout<P>) {
    platform.enable_peripheral(layout.int_port);

    platform.enable_peripheral(layout.i2c);
    platform.enable_peripheral(layout.i2c_port);
    platform.configure_pin(layout.scl, PinFunction::I2cScl);
    platform.configure_pin(layout.sda, PinFunction::I2cSda);

    // the sensor drives INT active low
    platform.configure_pin(layout.int_pin, PinFunction::Input);
    platform.enable_interrupt(layout.int_line, Edge::Falling);

    platform.enable_in_sleep(layout.int_port);
    platform.enable_in_sleep(layout.i2c);
    platform.enable_interrupts();
}
