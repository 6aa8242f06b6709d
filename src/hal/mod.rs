//! Hardware seams used by the bootloader core.
//!
//! The traits below are what the protocol engine, the store and the boot
//! decision are written against. The ATmega328P implementations live in the
//! submodules and are only built for AVR targets; `crate::testing` provides
//! in-memory versions for host tests.

use core::convert::Infallible;

#[cfg(target_arch = "avr")]
pub mod delay;
#[cfg(target_arch = "avr")]
pub mod eeprom;
#[cfg(target_arch = "avr")]
pub mod flash;
#[cfg(target_arch = "avr")]
pub mod gpio;
#[cfg(target_arch = "avr")]
pub mod reset;
#[cfg(all(target_arch = "avr", feature = "soft-uart"))]
pub mod soft_uart;
#[cfg(target_arch = "avr")]
pub mod startup;
#[cfg(target_arch = "avr")]
pub mod timer;
#[cfg(all(target_arch = "avr", not(feature = "soft-uart")))]
pub mod uart;
#[cfg(target_arch = "avr")]
pub mod watchdog;

/// Watchdog periods selectable through WDTCSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    Ms16,
    Ms32,
    Ms64,
    Ms125,
    Ms250,
    Ms500,
    S1,
    S2,
    S4,
    S8,
}

impl Timeout {
    /// WDP3..WDP0 laid out as in WDTCSR (WDP3 is bit 5).
    pub const fn prescaler_bits(self) -> u8 {
        match self {
            Timeout::Ms16 => 0x00,
            Timeout::Ms32 => 0x01,
            Timeout::Ms64 => 0x02,
            Timeout::Ms125 => 0x03,
            Timeout::Ms250 => 0x04,
            Timeout::Ms500 => 0x05,
            Timeout::S1 => 0x06,
            Timeout::S2 => 0x07,
            Timeout::S4 => 0x20,
            Timeout::S8 => 0x21,
        }
    }
}

/// System-reset watchdog.
pub trait Watchdog {
    /// (Re)start the countdown with a new period.
    fn arm(&mut self, timeout: Timeout);
    /// Restart the countdown, keeping the period.
    fn pulse(&mut self);
    fn disable(&mut self);
}

/// Snapshot of MCUSR taken once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetCause(pub u8);

impl ResetCause {
    pub const POWER_ON: u8 = 1 << 0;
    pub const EXTERNAL: u8 = 1 << 1;
    pub const BROWN_OUT: u8 = 1 << 2;
    pub const WATCHDOG: u8 = 1 << 3;

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Power-on, external pin or watchdog: the causes that boot straight
    /// into an installed application.
    pub const fn is_ordinary(self) -> bool {
        self.0 & (Self::POWER_ON | Self::EXTERNAL | Self::WATCHDOG) != 0
    }
}

/// Reset-cause register. `take` reads and clears it in one go.
pub trait ResetStatus {
    fn take(&mut self) -> ResetCause;
}

/// Self-programming access to code memory.
///
/// Erase and write start an SPM operation and return immediately; callers
/// poll `wait` until it stops returning `WouldBlock` before touching the
/// flash again. Addresses are byte addresses.
pub trait CodeMemory {
    /// Read through instruction space (LPM).
    fn read_byte(&self, address: u16) -> u8;
    fn erase_page(&mut self, address: u16);
    /// Load one little-endian word into the temporary page latch.
    fn fill_word(&mut self, address: u16, word: u16);
    fn write_page(&mut self, address: u16);
    fn wait(&mut self) -> nb::Result<(), Infallible>;
    /// Re-enable the read-while-write section after programming.
    fn enable_rww(&mut self);
}

/// Byte-addressable EEPROM.
///
/// Both calls return `WouldBlock` while a previous write cycle is still
/// running.
pub trait Eeprom {
    fn read_byte(&mut self, address: u16) -> nb::Result<u8, Infallible>;
    fn write_byte(&mut self, address: u16, value: u8) -> nb::Result<(), Infallible>;
    /// Ready once no write cycle is running.
    fn wait(&mut self) -> nb::Result<(), Infallible>;
}

/// Reset-state housekeeping done before the boot decision.
pub trait Board {
    /// Return every port's direction and output register to zero.
    fn release_pins(&mut self);
    /// Short busy-wait for the oscillator after reset.
    fn settle_clock(&mut self);
}

/// Unconditional transfer to the application reset vector.
pub trait Jump {
    fn jump_to_application(&self) -> !;
}
