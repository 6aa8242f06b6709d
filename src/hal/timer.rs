use avr_device::atmega328p::TC1;
use embedded_hal::blocking::delay::DelayMs;

use crate::config::Config;

const CS12: u8 = 1 << 2;
const CS10: u8 = 1 << 0;
const TOV1: u8 = 1 << 0;

/// Timer1 free-running at F_CPU/1024, used for coarse blocking delays.
pub struct Timer1 {
    ticks_per_second: u32,
}

impl Timer1 {
    pub fn new(config: &Config) -> Self {
        unsafe {
            let p = TC1::ptr();
            (*p).tccr1a.write(|w| w.bits(0));
            (*p).tccr1b.write(|w| w.bits(CS12 | CS10));
        }
        Self {
            ticks_per_second: config.cpu_freq_hz / 1024,
        }
    }

    /// Wait for `ticks` timer ticks by preloading TCNT1 and waiting for overflow.
    fn wait_ticks(&mut self, ticks: u16) {
        unsafe {
            let p = TC1::ptr();
            (*p).tcnt1.write(|w| w.bits(0u16.wrapping_sub(ticks)));
            (*p).tifr1.write(|w| w.bits(TOV1));
            while (*p).tifr1.read().bits() & TOV1 == 0 {}
        }
    }
}

impl DelayMs<u16> for Timer1 {
    fn delay_ms(&mut self, ms: u16) {
        let ticks = self.ticks_per_second * ms as u32 / 1000;
        self.wait_ticks(ticks.min(u16::MAX as u32) as u16);
    }
}
