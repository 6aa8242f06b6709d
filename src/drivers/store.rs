//! Non-volatile store: flash pages and EEPROM bytes behind one interface.

use crate::config::{Config, SPM_PAGESIZE};
use crate::hal::{CodeMemory, Eeprom};
use crate::log;
use crate::protocol::MemoryType;

/// Value of an erased flash byte.
pub const ERASED: u8 = 0xFF;

/// Staging area for one Program Page command.
///
/// Filled completely before anything is written, so a transfer that dies
/// half way leaves memory untouched.
pub struct PageBuffer {
    data: [u8; SPM_PAGESIZE],
    len: usize,
}

impl PageBuffer {
    pub const CAPACITY: usize = SPM_PAGESIZE;

    pub const fn new() -> Self {
        Self {
            data: [0; SPM_PAGESIZE],
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Append one byte. Returns `false` when the buffer is full.
    #[must_use]
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len == Self::CAPACITY {
            return false;
        }
        self.data[self.len] = byte;
        self.len += 1;
        true
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for PageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Store<C, E> {
    code: C,
    eeprom: E,
    vector_offset: u16,
}

impl<C: CodeMemory, E: Eeprom> Store<C, E> {
    pub fn new(code: C, eeprom: E, config: &Config) -> Self {
        Self {
            code,
            eeprom,
            vector_offset: config.vector_offset,
        }
    }

    pub fn code(&self) -> &C {
        &self.code
    }

    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    pub fn write(&mut self, memory: MemoryType, address: u16, data: &[u8]) {
        match memory {
            MemoryType::Eeprom => self.write_eeprom(address, data),
            MemoryType::Flash => self.commit_page(address, data),
        }
    }

    /// Erase the page holding `address`, latch `data` word by word from
    /// `address` upwards, then write the page. Blocks until the flash is
    /// readable again.
    ///
    /// An odd trailing byte is paired with an erased high byte.
    pub fn commit_page(&mut self, address: u16, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        log::trace!("flash commit {=u16:#x} ({=usize} bytes)", address, data.len());

        self.code.erase_page(address);
        nb::block!(self.code.wait()).ok();

        let mut latch = address;
        for pair in data.chunks(2) {
            let hi = pair.get(1).copied().unwrap_or(ERASED);
            self.code.fill_word(latch, u16::from_le_bytes([pair[0], hi]));
            latch = latch.wrapping_add(2);
        }

        self.code.write_page(address);
        nb::block!(self.code.wait()).ok();
        self.code.enable_rww();
    }

    /// Write bytes one at a time, each after the previous write cycle ends.
    pub fn write_eeprom(&mut self, address: u16, data: &[u8]) {
        log::trace!("eeprom write {=u16:#x} ({=usize} bytes)", address, data.len());
        let mut address = address;
        for &byte in data {
            nb::block!(self.eeprom.write_byte(address, byte)).ok();
            address = address.wrapping_add(1);
        }
    }

    /// Code-memory byte, adjusted for a relocated vector table.
    pub fn read_code(&self, address: u16) -> u8 {
        self.code.read_byte(address.wrapping_sub(self.vector_offset))
    }

    pub fn read_eeprom(&mut self, address: u16) -> u8 {
        // The error side is uninhabited.
        nb::block!(self.eeprom.read_byte(address)).unwrap_or(ERASED)
    }

    /// Stream `len` bytes starting at `address` into `sink`, ascending.
    pub fn read<F>(&mut self, memory: MemoryType, address: u16, len: usize, mut sink: F)
    where
        F: FnMut(u8),
    {
        let mut address = address;
        for _ in 0..len {
            let byte = match memory {
                MemoryType::Eeprom => self.read_eeprom(address),
                MemoryType::Flash => self.read_code(address),
            };
            sink(byte);
            address = address.wrapping_add(1);
        }
    }
}
