use core::convert::Infallible;

use avr_device::atmega328p::EEPROM;

use super::Eeprom as EepromOps;

const EERE: u8 = 1 << 0;
const EEPE: u8 = 1 << 1;
const EEMPE: u8 = 1 << 2;

pub struct Eeprom {
    _private: (),
}

impl Eeprom {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn busy(&self) -> bool {
        unsafe { (*EEPROM::ptr()).eecr.read().bits() & EEPE != 0 }
    }
}

impl EepromOps for Eeprom {
    fn read_byte(&mut self, address: u16) -> nb::Result<u8, Infallible> {
        if self.busy() {
            return Err(nb::Error::WouldBlock);
        }
        unsafe {
            let p = EEPROM::ptr();
            (*p).eear.write(|w| w.bits(address));
            (*p).eecr.write(|w| w.bits(EERE));
            Ok((*p).eedr.read().bits())
        }
    }

    fn write_byte(&mut self, address: u16, value: u8) -> nb::Result<(), Infallible> {
        if self.busy() {
            return Err(nb::Error::WouldBlock);
        }
        avr_device::interrupt::free(|_| unsafe {
            let p = EEPROM::ptr();
            (*p).eear.write(|w| w.bits(address));
            (*p).eedr.write(|w| w.bits(value));
            // EEPE has to follow EEMPE within four cycles
            (*p).eecr.write(|w| w.bits(EEMPE));
            (*p).eecr.write(|w| w.bits(EEMPE | EEPE));
        });
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Infallible> {
        if self.busy() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }
}

impl Default for Eeprom {
    fn default() -> Self {
        Self::new()
    }
}
