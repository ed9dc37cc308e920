//! Board bring-up ordering and fail-stop helpers

use mpu9150_irq::bringup::{bring_up, BoardLayout, Edge, PinFunction, Platform};
use mpu9150_irq::{OrHalt, TransactionError};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Block {
    PortA,
    PortB,
    I2c0,
}

#[derive(Debug, PartialEq, Eq)]
enum Call {
    Enable(Block),
    EnableInSleep(Block),
    Pin(u8, PinFunction),
    Interrupt(u16, Edge),
    GlobalEnable,
}

#[derive(Default)]
struct RecordingPlatform {
    calls: Vec<Call>,
}

impl Platform for RecordingPlatform {
    type Peripheral = Block;
    type Pin = u8;
    type Line = u16;

    fn enable_peripheral(&mut self, peripheral: Block) {
        self.calls.push(Call::Enable(peripheral));
    }

    fn enable_in_sleep(&mut self, peripheral: Block) {
        self.calls.push(Call::EnableInSleep(peripheral));
    }

    fn configure_pin(&mut self, pin: u8, function: PinFunction) {
        self.calls.push(Call::Pin(pin, function));
    }

    fn enable_interrupt(&mut self, line: u16, edge: Edge) {
        self.calls.push(Call::Interrupt(line, edge));
    }

    fn enable_interrupts(&mut self) {
        self.calls.push(Call::GlobalEnable);
    }
}

fn layout() -> BoardLayout<RecordingPlatform> {
    BoardLayout {
        int_port: Block::PortA,
        i2c: Block::I2c0,
        i2c_port: Block::PortB,
        scl: 2,
        sda: 3,
        int_pin: 7,
        int_line: 16,
    }
}

#[test]
fn test_bring_up_order() {
    let mut platform = RecordingPlatform::default();
    bring_up(&mut platform, &layout());

    assert_eq!(
        platform.calls,
        vec![
            Call::Enable(Block::PortA),
            Call::Enable(Block::I2c0),
            Call::Enable(Block::PortB),
            Call::Pin(2, PinFunction::I2cScl),
            Call::Pin(3, PinFunction::I2cSda),
            Call::Pin(7, PinFunction::Input),
            Call::Interrupt(16, Edge::Falling),
            Call::EnableInSleep(Block::PortA),
            Call::EnableInSleep(Block::I2c0),
            Call::GlobalEnable,
        ]
    );
}

#[test]
fn test_i2c_pins_muxed_after_controller_is_clocked() {
    let mut platform = RecordingPlatform::default();
    bring_up(&mut platform, &layout());

    let position = |call: &Call| platform.calls.iter().position(|c| c == call).unwrap();
    assert!(position(&Call::Enable(Block::I2c0)) < position(&Call::Pin(2, PinFunction::I2cScl)));
    assert!(position(&Call::Enable(Block::PortB)) < position(&Call::Pin(3, PinFunction::I2cSda)));
    // interrupts are unmasked last
    assert_eq!(platform.calls.last(), Some(&Call::GlobalEnable));
}

#[test]
fn test_or_halt_passes_success_through() {
    let ok: Result<u8, TransactionError> = Ok(39);
    assert_eq!(ok.or_halt(), 39);
}
