//! Boot decision: run the installed application or stay for programming.

use crate::hal::{Board, CodeMemory, Eeprom, Jump, ResetCause, ResetStatus, Watchdog};
use crate::log;

/// First word of a blank (erased) application.
pub const BLANK_WORD: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootAction {
    StartApplication,
    EnterProgrammer,
}

/// First thing after reset. Pins go back to inputs without pull-ups and an
/// EEPROM write left running by the application finishes before the clock
/// settling delay.
pub fn settle<B: Board, E: Eeprom>(board: &mut B, eeprom: &mut E) {
    board.release_pins();
    nb::block!(eeprom.wait()).ok();
    board.settle_clock();
}

/// Power-on, external reset and watchdog reset start an installed
/// application at once. A blank chip, or any other reset source (brown-out,
/// a cleared MCUSR after a software jump into the bootloader), stays in the
/// programmer.
pub fn decide(cause: ResetCause, first_word: u16) -> BootAction {
    if cause.is_ordinary() && first_word != BLANK_WORD {
        BootAction::StartApplication
    } else {
        BootAction::EnterProgrammer
    }
}

/// Read and clear the reset cause, look at the application's first word
/// and pick an action. The watchdog is turned off when the application is
/// about to start.
pub fn select<R, C, W>(reset: &mut R, code: &C, watchdog: &mut W) -> BootAction
where
    R: ResetStatus,
    C: CodeMemory,
    W: Watchdog,
{
    let cause = reset.take();
    let first_word = u16::from_le_bytes([code.read_byte(0), code.read_byte(1)]);
    let action = decide(cause, first_word);
    log::info!("reset cause {=u8:#x}, boot action {}", cause.bits(), action);

    if action == BootAction::StartApplication {
        watchdog.disable();
    }
    action
}

/// Hand off to the application when `select` says so. Returns only when
/// the caller should start the programmer.
pub fn boot<R, C, W, J>(reset: &mut R, code: &C, watchdog: &mut W, jump: &J)
where
    R: ResetStatus,
    C: CodeMemory,
    W: Watchdog,
    J: Jump,
{
    if select(reset, code, watchdog) == BootAction::StartApplication {
        jump.jump_to_application();
    }
}
