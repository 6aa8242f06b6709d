//! Bit-banged 8N1 transport on PD0 (RX) and PD1 (TX).
//!
//! Each bit is two runs of the 3-cycle delay loop plus
//! [`SOFT_UART_BIT_OVERHEAD`](crate::config::SOFT_UART_BIT_OVERHEAD) cycles of port handling. `build.rs` rejects
//! rates the 8-bit loop counter cannot reach.

use avr_device::atmega328p::PORTD;

use super::delay;
use crate::config::Config;
use crate::protocol::transport::{ByteTransport, FramingError};

const RX_BIT: u8 = 1 << 0;
const TX_BIT: u8 = 1 << 1;

const _: () = {
    let spins = Config::DEFAULT.soft_uart_spins();
    assert!(spins >= 1 && spins <= 255);
};

pub struct SoftUart {
    spins: u8,
}

impl SoftUart {
    pub fn new(config: &Config) -> Self {
        unsafe {
            let p = PORTD::ptr();
            // TX idles high, RX is an input with pull-up
            (*p).portd.modify(|r, w| w.bits(r.bits() | TX_BIT | RX_BIT));
            (*p).ddrd.modify(|r, w| w.bits((r.bits() | TX_BIT) & !RX_BIT));
        }
        Self {
            spins: config.soft_uart_spins().clamp(1, 255) as u8,
        }
    }

    #[inline(always)]
    fn half_bit(&self) {
        delay::spin(self.spins);
    }

    #[inline(always)]
    fn bit_delay(&self) {
        delay::spin(self.spins);
        delay::spin(self.spins);
    }

    #[inline(always)]
    fn rx_high(&self) -> bool {
        unsafe { (*PORTD::ptr()).pind.read().bits() & RX_BIT != 0 }
    }

    #[inline(always)]
    fn set_tx(&mut self, high: bool) {
        unsafe {
            let p = PORTD::ptr();
            if high {
                (*p).portd.modify(|r, w| w.bits(r.bits() | TX_BIT));
            } else {
                (*p).portd.modify(|r, w| w.bits(r.bits() & !TX_BIT));
            }
        }
    }
}

impl ByteTransport for SoftUart {
    fn send(&mut self, byte: u8) {
        self.set_tx(false);
        self.bit_delay();
        for bit in 0..8 {
            self.set_tx(byte & (1 << bit) != 0);
            self.bit_delay();
        }
        self.set_tx(true);
        self.bit_delay();
    }

    fn receive(&mut self) -> Result<u8, FramingError> {
        while self.rx_high() {}
        // middle of the start bit
        self.half_bit();

        let mut byte = 0u8;
        for _ in 0..8 {
            self.bit_delay();
            byte >>= 1;
            if self.rx_high() {
                byte |= 0x80;
            }
        }

        self.bit_delay();
        if self.rx_high() {
            Ok(byte)
        } else {
            Err(FramingError(byte))
        }
    }
}
