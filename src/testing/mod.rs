//! In-memory stand-ins for the hardware seams.
//!
//! Everything here is `no_std` and allocation free so the same fakes serve
//! unit tests, the integration tests and anyone bringing the engine up on a
//! new board without hardware.

use core::convert::Infallible;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::{OutputPin, ToggleableOutputPin};

use crate::config::{EEPROM_SIZE, FLASH_SIZE, SPM_PAGESIZE};
use crate::hal::{Board, CodeMemory, Eeprom, Jump, ResetCause, ResetStatus, Timeout, Watchdog};
use crate::protocol::transport::{ByteTransport, FramingError};

const LINK_CAPACITY: usize = 512;

/// Scripted receive side, captured send side.
pub struct FakeLink {
    input: [u8; LINK_CAPACITY],
    input_len: usize,
    framing: [bool; LINK_CAPACITY],
    cursor: usize,
    output: [u8; LINK_CAPACITY],
    output_len: usize,
}

impl FakeLink {
    pub fn new(input: &[u8]) -> Self {
        assert!(input.len() <= LINK_CAPACITY, "script too long");
        let mut link = Self {
            input: [0; LINK_CAPACITY],
            input_len: input.len(),
            framing: [false; LINK_CAPACITY],
            cursor: 0,
            output: [0; LINK_CAPACITY],
            output_len: 0,
        };
        link.input[..input.len()].copy_from_slice(input);
        link
    }

    /// Deliver input byte `index` with a framing error.
    pub fn corrupt(&mut self, index: usize) {
        self.framing[index] = true;
    }

    pub fn sent(&self) -> &[u8] {
        &self.output[..self.output_len]
    }

    pub fn remaining(&self) -> usize {
        self.input_len - self.cursor
    }
}

impl ByteTransport for FakeLink {
    fn send(&mut self, byte: u8) {
        assert!(self.output_len < LINK_CAPACITY, "send buffer full");
        self.output[self.output_len] = byte;
        self.output_len += 1;
    }

    fn receive(&mut self) -> Result<u8, FramingError> {
        assert!(self.cursor < self.input_len, "receive past end of script");
        let byte = self.input[self.cursor];
        let framing = self.framing[self.cursor];
        self.cursor += 1;
        if framing {
            Err(FramingError(byte))
        } else {
            Ok(byte)
        }
    }
}

/// One SPM-level operation seen by [`FakeFlash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    Erase(u16),
    Fill(u16, u16),
    Write(u16),
    EnableRww,
}

const OP_LOG: usize = 96;

/// Page-granular flash model.
///
/// Erase and write land on the page holding the address; fills go to a
/// page-sized latch indexed by the low address bits, like the real SPM
/// buffer. Operations issued while the previous one is still "busy" panic.
pub struct FakeFlash {
    memory: [u8; FLASH_SIZE],
    latch: [u8; SPM_PAGESIZE],
    ops: [FlashOp; OP_LOG],
    op_count: usize,
    busy: u8,
    busy_polls: u8,
    polls_seen: u32,
}

impl FakeFlash {
    pub fn new() -> Self {
        Self::with_busy_polls(0)
    }

    /// Erase and write report busy for `polls` calls to `wait`.
    pub fn with_busy_polls(polls: u8) -> Self {
        Self {
            memory: [0xFF; FLASH_SIZE],
            latch: [0xFF; SPM_PAGESIZE],
            ops: [FlashOp::EnableRww; OP_LOG],
            op_count: 0,
            busy: 0,
            busy_polls: polls,
            polls_seen: 0,
        }
    }

    /// Preload raw contents, bypassing SPM.
    pub fn load(&mut self, address: u16, bytes: &[u8]) {
        let start = address as usize;
        self.memory[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Logged operations, up to the log capacity.
    pub fn ops(&self) -> &[FlashOp] {
        &self.ops[..self.op_count.min(OP_LOG)]
    }

    pub fn busy_polls_seen(&self) -> u32 {
        self.polls_seen
    }

    fn record(&mut self, op: FlashOp) {
        assert_eq!(self.busy, 0, "SPM issued while busy: {:?}", op);
        if self.op_count < OP_LOG {
            self.ops[self.op_count] = op;
        }
        self.op_count += 1;
    }

    fn page(address: u16) -> core::ops::Range<usize> {
        let start = address as usize % FLASH_SIZE / SPM_PAGESIZE * SPM_PAGESIZE;
        start..start + SPM_PAGESIZE
    }
}

impl Default for FakeFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeMemory for FakeFlash {
    fn read_byte(&self, address: u16) -> u8 {
        self.memory[address as usize % FLASH_SIZE]
    }

    fn erase_page(&mut self, address: u16) {
        self.record(FlashOp::Erase(address));
        self.memory[Self::page(address)].fill(0xFF);
        self.busy = self.busy_polls;
    }

    fn fill_word(&mut self, address: u16, word: u16) {
        self.record(FlashOp::Fill(address, word));
        let offset = address as usize % SPM_PAGESIZE & !1;
        self.latch[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
    }

    fn write_page(&mut self, address: u16) {
        self.record(FlashOp::Write(address));
        let page = Self::page(address);
        self.memory[page].copy_from_slice(&self.latch);
        self.latch = [0xFF; SPM_PAGESIZE];
        self.busy = self.busy_polls;
    }

    fn wait(&mut self) -> nb::Result<(), Infallible> {
        if self.busy > 0 {
            self.busy -= 1;
            self.polls_seen += 1;
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    fn enable_rww(&mut self) {
        self.record(FlashOp::EnableRww);
    }
}

/// EEPROM model with a write cycle that lasts `busy_polls` accesses.
pub struct FakeEeprom {
    memory: [u8; EEPROM_SIZE],
    busy: u8,
    busy_polls: u8,
    polls_seen: u32,
    writes: u32,
}

impl FakeEeprom {
    pub fn new() -> Self {
        Self::with_busy_polls(0)
    }

    pub fn with_busy_polls(polls: u8) -> Self {
        Self {
            memory: [0xFF; EEPROM_SIZE],
            busy: 0,
            busy_polls: polls,
            polls_seen: 0,
            writes: 0,
        }
    }

    /// An EEPROM still finishing a write started before reset; the cycle
    /// ends after `polls` busy polls.
    pub fn writing(polls: u8) -> Self {
        let mut eeprom = Self::with_busy_polls(polls);
        eeprom.busy = polls;
        eeprom
    }

    pub fn byte(&self, address: u16) -> u8 {
        self.memory[address as usize % EEPROM_SIZE]
    }

    pub fn writes(&self) -> u32 {
        self.writes
    }

    pub fn busy_polls_seen(&self) -> u32 {
        self.polls_seen
    }

    fn poll(&mut self) -> nb::Result<(), Infallible> {
        if self.busy > 0 {
            self.busy -= 1;
            self.polls_seen += 1;
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }
}

impl Default for FakeEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl Eeprom for FakeEeprom {
    fn read_byte(&mut self, address: u16) -> nb::Result<u8, Infallible> {
        self.poll()?;
        Ok(self.byte(address))
    }

    fn write_byte(&mut self, address: u16, value: u8) -> nb::Result<(), Infallible> {
        self.poll()?;
        self.memory[address as usize % EEPROM_SIZE] = value;
        self.writes += 1;
        self.busy = self.busy_polls;
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Infallible> {
        self.poll()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogEvent {
    Arm(Timeout),
    Disable,
}

const EVENT_LOG: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardStep {
    ReleasePins,
    SettleClock,
}

/// Records the startup steps in order.
#[derive(Default)]
pub struct FakeBoard {
    steps: [Option<BoardStep>; 4],
    count: usize,
}

impl FakeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> impl Iterator<Item = BoardStep> + '_ {
        self.steps[..self.count].iter().flatten().copied()
    }

    fn record(&mut self, step: BoardStep) {
        self.steps[self.count] = Some(step);
        self.count += 1;
    }
}

impl Board for FakeBoard {
    fn release_pins(&mut self) {
        self.record(BoardStep::ReleasePins);
    }

    fn settle_clock(&mut self) {
        self.record(BoardStep::SettleClock);
    }
}

/// Records configuration changes; pulses are only counted.
pub struct FakeWatchdog {
    events: [WatchdogEvent; EVENT_LOG],
    event_count: usize,
    pulses: u32,
    timeout: Option<Timeout>,
}

impl FakeWatchdog {
    pub fn new() -> Self {
        Self {
            events: [WatchdogEvent::Disable; EVENT_LOG],
            event_count: 0,
            pulses: 0,
            timeout: None,
        }
    }

    pub fn events(&self) -> &[WatchdogEvent] {
        &self.events[..self.event_count.min(EVENT_LOG)]
    }

    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    /// Currently armed period, `None` when off.
    pub fn timeout(&self) -> Option<Timeout> {
        self.timeout
    }

    fn record(&mut self, event: WatchdogEvent) {
        if self.event_count < EVENT_LOG {
            self.events[self.event_count] = event;
        }
        self.event_count += 1;
    }
}

impl Default for FakeWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog for FakeWatchdog {
    fn arm(&mut self, timeout: Timeout) {
        self.record(WatchdogEvent::Arm(timeout));
        self.timeout = Some(timeout);
    }

    fn pulse(&mut self) {
        self.pulses += 1;
    }

    fn disable(&mut self) {
        self.record(WatchdogEvent::Disable);
        self.timeout = None;
    }
}

/// MCUSR stand-in that clears on read.
pub struct FakeResetStatus {
    cause: ResetCause,
    reads: u32,
}

impl FakeResetStatus {
    pub fn new(bits: u8) -> Self {
        Self {
            cause: ResetCause(bits),
            reads: 0,
        }
    }

    pub fn reads(&self) -> u32 {
        self.reads
    }

    /// What the register holds now.
    pub fn pending(&self) -> ResetCause {
        self.cause
    }
}

impl ResetStatus for FakeResetStatus {
    fn take(&mut self) -> ResetCause {
        self.reads += 1;
        core::mem::replace(&mut self.cause, ResetCause(0))
    }
}

/// Jump target for tests: unwinds instead of leaving.
pub struct TrapJump;

impl Jump for TrapJump {
    fn jump_to_application(&self) -> ! {
        panic!("jump to application");
    }
}

#[derive(Default)]
pub struct FakePin {
    high: bool,
    toggles: u32,
}

impl FakePin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn toggles(&self) -> u32 {
        self.toggles
    }
}

impl OutputPin for FakePin {
    type Error = Infallible;

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }
}

impl ToggleableOutputPin for FakePin {
    type Error = Infallible;

    fn toggle(&mut self) -> Result<(), Infallible> {
        self.high = !self.high;
        self.toggles += 1;
        Ok(())
    }
}

/// Delay that only adds up what it was asked for.
#[derive(Default)]
pub struct NoDelay {
    total_ms: u32,
}

impl NoDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_ms(&self) -> u32 {
        self.total_ms
    }
}

impl DelayMs<u16> for NoDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.total_ms += ms as u32;
    }
}
