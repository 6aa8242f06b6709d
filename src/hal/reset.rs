use avr_device::atmega328p::CPU;

use super::{Jump, ResetCause, ResetStatus};

/// MCUSR access.
pub struct McuStatus {
    _private: (),
}

impl McuStatus {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl ResetStatus for McuStatus {
    fn take(&mut self) -> ResetCause {
        unsafe {
            let p = CPU::ptr();
            let bits = (*p).mcusr.read().bits();
            (*p).mcusr.write(|w| w.bits(0));
            ResetCause(bits)
        }
    }
}

impl Default for McuStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Jumps to the application reset vector at word address 0.
pub struct ResetVector;

impl Jump for ResetVector {
    fn jump_to_application(&self) -> ! {
        unsafe {
            core::arch::asm!(
                "jmp 0",
                options(noreturn)
            );
        }
    }
}
