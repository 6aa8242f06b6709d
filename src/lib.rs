//! Serial bootloader for ATmega328P-class AVRs.
//!
//! Sits in the boot section and, on reset, either jumps to the application
//! or serves the STK500v1 subset that avrdude's `arduino` programmer speaks,
//! writing flash and EEPROM through self-programming.
//!
//! The core is written against the traits in [`hal`], so the whole state
//! machine runs on a workstation against the fakes in [`testing`].

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(asm_experimental_arch))]

pub mod bootloader;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod hal;
mod log;
pub mod protocol;
pub mod testing;

pub use bootloader::BootAction;
pub use config::Config;
pub use drivers::Store;
pub use protocol::{ByteTransport, Engine, ProtocolError};
