//! Cycle-counted busy loops.

use core::arch::asm;

/// Run the delay loop `count` times (`3 * count - 1` cycles). A count of
/// zero wraps and runs 256 times.
#[inline(always)]
pub fn spin(count: u8) {
    unsafe {
        asm!(
            "1: dec {n}",
            "brne 1b",
            n = inout(reg) count => _,
            options(nomem, nostack),
        );
    }
}
