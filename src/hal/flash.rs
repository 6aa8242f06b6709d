//! Self-programming (SPM) access to the ATmega328P code memory.
//!
//! Only code running from the boot section may issue SPM; the linker places
//! this image there (see `build.rs`).

use core::convert::Infallible;

use avr_device::atmega328p::CPU;

use super::CodeMemory;

const SPMEN: u8 = 1 << 0;
const PGERS: u8 = 1 << 1;
const PGWRT: u8 = 1 << 2;
const RWWSRE: u8 = 1 << 4;

/// SPMCSR in I/O space, for `out`.
const SPMCSR_IO: u8 = 0x37;

pub struct Flash {
    _private: (),
}

impl Flash {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn busy(&self) -> bool {
        unsafe { (*CPU::ptr()).spmcsr.read().bits() & SPMEN != 0 }
    }
}

/// Issue one SPM instruction. `word` is only consumed by page fills.
///
/// # Safety
/// No SPM operation may be in progress, and `address` must not point into
/// the boot section for erase/write.
#[inline(always)]
unsafe fn spm(command: u8, address: u16, word: u16) {
    let [lo, hi] = word.to_le_bytes();
    core::arch::asm!(
        "mov r0, {lo}",
        "mov r1, {hi}",
        "out {spmcsr}, {cmd}",
        "spm",
        "clr r1",
        lo = in(reg) lo,
        hi = in(reg) hi,
        cmd = in(reg) command,
        spmcsr = const SPMCSR_IO,
        in("Z") address,
    );
}

impl CodeMemory for Flash {
    fn read_byte(&self, address: u16) -> u8 {
        let byte: u8;
        unsafe {
            core::arch::asm!(
                "lpm {byte}, Z",
                byte = out(reg) byte,
                in("Z") address,
                options(readonly, nostack),
            );
        }
        byte
    }

    fn erase_page(&mut self, address: u16) {
        unsafe { spm(PGERS | SPMEN, address, 0) }
    }

    fn fill_word(&mut self, address: u16, word: u16) {
        unsafe { spm(SPMEN, address, word) }
    }

    fn write_page(&mut self, address: u16) {
        unsafe { spm(PGWRT | SPMEN, address, 0) }
    }

    fn wait(&mut self) -> nb::Result<(), Infallible> {
        if self.busy() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    fn enable_rww(&mut self) {
        unsafe { spm(RWWSRE | SPMEN, 0, 0) }
    }
}

impl Default for Flash {
    fn default() -> Self {
        Self::new()
    }
}
