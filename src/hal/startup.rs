use avr_device::atmega328p::{PORTB, PORTC, PORTD};

use super::delay;
use super::Board;

/// GPIO ports B, C and D.
pub struct Ports {
    _private: (),
}

impl Ports {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for Ports {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for Ports {
    fn release_pins(&mut self) {
        let (b, c, d) = (PORTB::ptr(), PORTC::ptr(), PORTD::ptr());
        unsafe {
            (*b).ddrb.write(|w| w.bits(0));
            (*c).ddrc.write(|w| w.bits(0));
            (*d).ddrd.write(|w| w.bits(0));

            (*b).portb.write(|w| w.bits(0));
            (*c).portc.write(|w| w.bits(0));
            (*d).portd.write(|w| w.bits(0));
        }
    }

    fn settle_clock(&mut self) {
        delay::spin(255);
    }
}
