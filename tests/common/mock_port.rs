//! Mock GPIO port with edge interrupt status

use mpu9150_irq::InterruptPort;

#[derive(Debug, Default)]
pub struct MockPort {
    /// Pins with a latched edge
    pub pending: u32,
    /// Masks passed to `clear`, in order
    pub cleared: Vec<u32>,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch an edge on the pins in `mask`
    pub fn raise(&mut self, mask: u32) {
        self.pending |= mask;
    }
}

impl InterruptPort for MockPort {
    fn pending(&mut self) -> u32 {
        self.pending
    }

    fn clear(&mut self, mask: u32) {
        self.pending &= !mask;
        self.cleared.push(mask);
    }
}
