// 8253/8254 programmable interval timer
use x86_64::instructions::port::Port;

use crate::timer::{self, TickCallback, Timer};

/// Input clock of the PIT in Hz.
const PIT_BASE_HZ: u32 = 1_193_182;

/// Channel 0 of the PIT, wired to IRQ0.
pub struct Pit {
    command: Port<u8>,
    channel0: Port<u8>,
}

impl Pit {
    pub fn new() -> Self {
        Self {
            command: Port::new(0x43),
            channel0: Port::new(0x40),
        }
    }
}

impl Default for Pit {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for Pit {
    fn set_frequency(&mut self, hz: u32) {
        let divisor = (PIT_BASE_HZ / hz.max(1)).clamp(1, u32::from(u16::MAX)) as u16;
        unsafe {
            // Command: channel 0, low/high byte access, mode 2 (rate generator), binary mode
            self.command.write(0x34);
            self.channel0.write((divisor & 0xFF) as u8); // low byte
            self.channel0.write((divisor >> 8) as u8); // high byte
        }
        log::debug!("PIT divisor {} for {} Hz", divisor, hz);
    }

    fn register_callback(&mut self, callback: TickCallback) {
        timer::set_callback(callback);
    }
}
