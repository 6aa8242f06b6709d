use core::convert::Infallible;

use avr_device::atmega328p::PORTB;
use embedded_hal::digital::v2::{OutputPin, ToggleableOutputPin};

/// Status LED on PB5 (D13 on Arduino-style boards).
pub struct StatusLed {
    _private: (),
}

const LED: u8 = 1 << 5;

impl StatusLed {
    pub fn new() -> Self {
        unsafe {
            (*PORTB::ptr()).ddrb.modify(|r, w| w.bits(r.bits() | LED));
        }
        Self { _private: () }
    }
}

impl OutputPin for StatusLed {
    type Error = Infallible;

    #[inline]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        unsafe {
            (*PORTB::ptr()).portb.modify(|r, w| w.bits(r.bits() | LED));
        }
        Ok(())
    }

    #[inline]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        unsafe {
            (*PORTB::ptr()).portb.modify(|r, w| w.bits(r.bits() & !LED));
        }
        Ok(())
    }
}

impl ToggleableOutputPin for StatusLed {
    type Error = Infallible;

    // Writing a one to PINx flips the output latch.
    #[inline]
    fn toggle(&mut self) -> Result<(), Self::Error> {
        unsafe {
            (*PORTB::ptr()).pinb.write(|w| w.bits(LED));
        }
        Ok(())
    }
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}
