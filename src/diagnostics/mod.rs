//! Status LED signalling. Cosmetic: nothing here affects the protocol.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::ToggleableOutputPin;

use crate::hal::Watchdog;
use crate::protocol::transport::{ByteTransport, FramingError};

/// Time between startup toggles, about 1/16 s.
pub const FLASH_INTERVAL_MS: u16 = 62;

pub struct Indicator<P> {
    led: P,
}

impl<P: ToggleableOutputPin> Indicator<P> {
    pub fn new(led: P) -> Self {
        Self { led }
    }

    pub fn toggle(&mut self) {
        self.led.toggle().ok();
    }

    /// Blink `count` times (two toggles each) so the LED ends where it
    /// started. The watchdog is pulsed on every toggle.
    pub fn startup_flashes<D, W>(&mut self, count: u8, delay: &mut D, watchdog: &mut W)
    where
        D: DelayMs<u16>,
        W: Watchdog,
    {
        for _ in 0..count as u16 * 2 {
            delay.delay_ms(FLASH_INTERVAL_MS);
            self.toggle();
            watchdog.pulse();
        }
    }

    /// Wrap a transport so the LED flickers with incoming data.
    pub fn on_activity<T: ByteTransport>(self, link: T) -> ActivityLink<T, P> {
        ActivityLink {
            link,
            indicator: self,
        }
    }

    pub fn free(self) -> P {
        self.led
    }
}

/// Transport decorator toggling the LED before and after every receive.
pub struct ActivityLink<T, P> {
    link: T,
    indicator: Indicator<P>,
}

impl<T, P> ActivityLink<T, P> {
    pub fn free(self) -> (T, Indicator<P>) {
        (self.link, self.indicator)
    }
}

impl<T, P> ByteTransport for ActivityLink<T, P>
where
    T: ByteTransport,
    P: ToggleableOutputPin,
{
    fn send(&mut self, byte: u8) {
        self.link.send(byte);
    }

    fn receive(&mut self) -> Result<u8, FramingError> {
        self.indicator.toggle();
        let received = self.link.receive();
        self.indicator.toggle();
        received
    }
}
