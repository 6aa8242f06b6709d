use avr_device::atmega328p::WDT;

use super::{Timeout, Watchdog as WatchdogOps};

const WDCE: u8 = 1 << 4;
const WDE: u8 = 1 << 3;

pub struct Watchdog {
    _private: (),
}

impl Watchdog {
    #[inline]
    pub fn new() -> Self {
        Self { _private: () }
    }

    // Timed sequence: the second write must land within four cycles of the first.
    #[inline]
    fn configure(&mut self, bits: u8) {
        unsafe {
            let p = WDT::ptr();
            (*p).wdtcsr.write(|w| w.bits(WDCE | WDE));
            (*p).wdtcsr.write(|w| w.bits(bits));
        }
    }
}

impl WatchdogOps for Watchdog {
    #[inline]
    fn arm(&mut self, timeout: Timeout) {
        self.configure(WDE | timeout.prescaler_bits());
    }

    #[inline]
    fn pulse(&mut self) {
        avr_device::asm::wdr();
    }

    #[inline]
    fn disable(&mut self) {
        self.configure(0x00);
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}
