//! Polled USART0, 8N1 in double-speed mode.

use avr_device::atmega328p::USART0;

use crate::config::Config;
use crate::protocol::transport::{ByteTransport, FramingError};

const RXC0: u8 = 1 << 7;
const UDRE0: u8 = 1 << 5;
const FE0: u8 = 1 << 4;
const U2X0: u8 = 1 << 1;
const RXEN0: u8 = 1 << 4;
const TXEN0: u8 = 1 << 3;
const UCSZ01: u8 = 1 << 2;
const UCSZ00: u8 = 1 << 1;

pub struct Uart {
    _private: (),
}

impl Uart {
    pub fn new(config: &Config) -> Self {
        unsafe {
            let p = USART0::ptr();
            (*p).ucsr0a.write(|w| w.bits(U2X0));
            (*p).ucsr0b.write(|w| w.bits(RXEN0 | TXEN0));
            (*p).ucsr0c.write(|w| w.bits(UCSZ01 | UCSZ00));
            (*p).ubrr0.write(|w| w.bits(config.ubrr_double_speed()));
        }
        Self { _private: () }
    }

    #[inline]
    fn status(&self) -> u8 {
        unsafe { (*USART0::ptr()).ucsr0a.read().bits() }
    }
}

impl ByteTransport for Uart {
    fn send(&mut self, byte: u8) {
        while self.status() & UDRE0 == 0 {}
        unsafe {
            (*USART0::ptr()).udr0.write(|w| w.bits(byte));
        }
    }

    fn receive(&mut self) -> Result<u8, FramingError> {
        let mut status = self.status();
        while status & RXC0 == 0 {
            status = self.status();
        }
        // FE0 belongs to the byte in UDR0, so sample it before the read.
        let byte = unsafe { (*USART0::ptr()).udr0.read().bits() };
        if status & FE0 != 0 {
            Err(FramingError(byte))
        } else {
            Ok(byte)
        }
    }
}
