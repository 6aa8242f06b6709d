//! Command loop.
//!
//! One state, "awaiting command". Each `step` reads one opcode, consumes
//! exactly the bytes that opcode owns, answers, and returns. The load
//! address is the only thing carried from one command to the next.

use crate::config::Config;
use crate::drivers::store::{PageBuffer, Store};
use crate::hal::{CodeMemory, Eeprom, Watchdog};
use crate::log;

use super::transport::{ByteTransport, FramingError};
use super::*;

pub struct Engine<'a, T, C, E, W> {
    link: &'a mut T,
    store: &'a mut Store<C, E>,
    watchdog: &'a mut W,
    config: &'a Config,
    /// Byte address; Load Address stores word addresses doubled.
    address: u16,
    buffer: PageBuffer,
}

impl<'a, T, C, E, W> Engine<'a, T, C, E, W>
where
    T: ByteTransport,
    C: CodeMemory,
    E: Eeprom,
    W: Watchdog,
{
    /// Arms the liveness watchdog. If no command completes within
    /// `config.watchdog_timeout` the chip resets into the boot decision.
    pub fn new(
        link: &'a mut T,
        store: &'a mut Store<C, E>,
        watchdog: &'a mut W,
        config: &'a Config,
    ) -> Self {
        watchdog.arm(config.watchdog_timeout);
        Self {
            link,
            store,
            watchdog,
            config,
            address: 0,
            buffer: PageBuffer::new(),
        }
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    /// Serve commands until the watchdog resets the chip.
    ///
    /// A protocol error has already shortened the watchdog; spinning here
    /// lets it fire.
    pub fn run(&mut self) -> ! {
        loop {
            if let Err(err) = self.step() {
                log::warn!("protocol error {}, waiting for reset", err);
                loop {
                    core::hint::spin_loop();
                }
            }
        }
    }

    /// Handle exactly one command frame.
    ///
    /// On error nothing has been sent for the frame and the watchdog is
    /// armed with the short timeout. The caller must not read from the
    /// link again.
    pub fn step(&mut self) -> Result<Command> {
        let command = Command::from_opcode(self.getch());

        match command {
            Command::GetParameter => {
                let which = self.getch();
                self.verify_space()?;
                let value = match which {
                    STK_SW_MAJOR => self.config.version.major,
                    STK_SW_MINOR => self.config.version.minor,
                    _ => GENERIC_PARAMETER,
                };
                self.link.send(value);
            }
            Command::SetDevice => self.skip(SET_DEVICE_LEN)?,
            Command::SetDeviceExt => self.skip(SET_DEVICE_EXT_LEN)?,
            Command::LoadAddress => {
                let lo = self.getch();
                let hi = self.getch();
                self.address = u16::from_le_bytes([lo, hi]).wrapping_mul(2);
                self.verify_space()?;
            }
            Command::Universal => {
                self.skip(UNIVERSAL_LEN)?;
                self.link.send(0x00);
            }
            Command::ProgramPage => self.program_page()?,
            Command::ReadPage => self.read_page()?,
            Command::ReadSignature => {
                self.verify_space()?;
                for byte in self.config.signature {
                    self.link.send(byte);
                }
            }
            Command::LeaveProgMode => {
                // Reset shortly after the reply so the application starts.
                log::info!("leaving program mode");
                self.watchdog.arm(self.config.short_timeout);
                self.verify_space()?;
            }
            Command::Other(_) => self.verify_space()?,
        }

        self.link.send(STK_OK);
        Ok(command)
    }

    fn program_page(&mut self) -> Result<()> {
        let length = self.get_length();
        let memory = self.get_memory_type();

        if length > self.page_capacity() {
            return Err(self.abort(ProtocolError::PageOverflow));
        }

        self.buffer.clear();
        for _ in 0..length {
            let byte = self.getch();
            if !self.buffer.push(byte) {
                return Err(self.abort(ProtocolError::PageOverflow));
            }
        }
        self.verify_space()?;

        self.store.write(memory, self.address, self.buffer.as_slice());
        Ok(())
    }

    fn read_page(&mut self) -> Result<()> {
        let length = self.get_length();
        let memory = self.get_memory_type();
        self.verify_space()?;

        let link = &mut *self.link;
        self.store.read(memory, self.address, length, |byte| link.send(byte));
        Ok(())
    }

    fn page_capacity(&self) -> usize {
        self.config.page_size.min(PageBuffer::CAPACITY)
    }

    /// Big-endian, whatever the address byte order is.
    fn get_length(&mut self) -> usize {
        let hi = self.getch();
        let lo = self.getch();
        u16::from_be_bytes([hi, lo]) as usize
    }

    fn get_memory_type(&mut self) -> MemoryType {
        let tag = self.getch();
        MemoryType::from_tag(tag, self.config.has_eeprom())
    }

    fn getch(&mut self) -> u8 {
        match self.link.receive() {
            Ok(byte) => byte,
            Err(FramingError(byte)) => {
                // Probably a host auto-bauding at the wrong rate. Stay alive.
                self.watchdog.pulse();
                byte
            }
        }
    }

    /// Discard `count` parameter bytes, then check the terminator.
    fn skip(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.getch();
        }
        self.verify_space()
    }

    /// Check the terminator and open the reply.
    fn verify_space(&mut self) -> Result<()> {
        if self.getch() != CRC_EOP {
            return Err(self.abort(ProtocolError::Desync));
        }
        self.watchdog.pulse();
        self.link.send(STK_INSYNC);
        Ok(())
    }

    /// No resynchronisation: let the short watchdog reset the chip.
    fn abort(&mut self, err: ProtocolError) -> ProtocolError {
        self.watchdog.arm(self.config.short_timeout);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::store::ERASED;
    use crate::hal::Timeout;
    use crate::testing::{FakeEeprom, FakeFlash, FakeLink, FakeWatchdog, WatchdogEvent};

    struct Rig {
        link: FakeLink,
        store: Store<FakeFlash, FakeEeprom>,
        watchdog: FakeWatchdog,
        config: Config,
    }

    impl Rig {
        fn new(input: &[u8]) -> Self {
            let config = Config::DEFAULT;
            Self {
                link: FakeLink::new(input),
                store: Store::new(FakeFlash::new(), FakeEeprom::new(), &config),
                watchdog: FakeWatchdog::new(),
                config,
            }
        }

        /// Run `frames` steps and return their results.
        fn steps(&mut self, frames: usize) -> [Option<Result<Command>>; 8] {
            let mut results = [None; 8];
            let mut engine =
                Engine::new(&mut self.link, &mut self.store, &mut self.watchdog, &self.config);
            for slot in results.iter_mut().take(frames) {
                let result = engine.step();
                let failed = result.is_err();
                *slot = Some(result);
                if failed {
                    break;
                }
            }
            results
        }
    }

    #[test]
    fn get_sync_is_acknowledged() {
        let mut rig = Rig::new(&[STK_GET_SYNC, CRC_EOP]);
        let results = rig.steps(1);
        assert_eq!(results[0], Some(Ok(Command::Other(STK_GET_SYNC))));
        assert_eq!(rig.link.sent(), &[STK_INSYNC, STK_OK]);
    }

    #[test]
    fn get_parameter_reports_version_and_placeholder() {
        let mut rig = Rig::new(&[
            STK_GET_PARAMETER, STK_SW_MAJOR, CRC_EOP,
            STK_GET_PARAMETER, STK_SW_MINOR, CRC_EOP,
            STK_GET_PARAMETER, 0x80, CRC_EOP,
        ]);
        rig.steps(3);
        let version = Config::DEFAULT.version;
        assert_eq!(
            rig.link.sent(),
            &[
                STK_INSYNC, version.major, STK_OK,
                STK_INSYNC, version.minor, STK_OK,
                STK_INSYNC, GENERIC_PARAMETER, STK_OK,
            ]
        );
    }

    #[test]
    fn set_device_swallows_its_parameters() {
        let mut input = [0u8; 1 + SET_DEVICE_LEN + 1 + 1 + SET_DEVICE_EXT_LEN + 1];
        input[0] = STK_SET_DEVICE;
        input[1..=SET_DEVICE_LEN].fill(CRC_EOP);
        input[SET_DEVICE_LEN + 1] = CRC_EOP;
        let ext = SET_DEVICE_LEN + 2;
        input[ext] = STK_SET_DEVICE_EXT;
        input[ext + SET_DEVICE_EXT_LEN + 1] = CRC_EOP;

        let mut rig = Rig::new(&input);
        let results = rig.steps(2);
        assert_eq!(results[0], Some(Ok(Command::SetDevice)));
        assert_eq!(results[1], Some(Ok(Command::SetDeviceExt)));
        assert_eq!(rig.link.sent(), &[STK_INSYNC, STK_OK, STK_INSYNC, STK_OK]);
        assert_eq!(rig.link.remaining(), 0);
    }

    #[test]
    fn universal_answers_zero() {
        let mut rig = Rig::new(&[STK_UNIVERSAL, 0x30, 0x00, 0x00, 0x00, CRC_EOP]);
        rig.steps(1);
        assert_eq!(rig.link.sent(), &[STK_INSYNC, 0x00, STK_OK]);
    }

    #[test]
    fn read_signature_sends_triplet() {
        let mut rig = Rig::new(&[STK_READ_SIGN, CRC_EOP]);
        rig.steps(1);
        assert_eq!(rig.link.sent(), &[STK_INSYNC, 0x1E, 0x95, 0x0F, STK_OK]);
    }

    #[test]
    fn load_address_doubles_word_address() {
        let mut rig = Rig::new(&[STK_LOAD_ADDRESS, 0x40, 0x01, CRC_EOP]);
        let mut engine =
            Engine::new(&mut rig.link, &mut rig.store, &mut rig.watchdog, &rig.config);
        assert_eq!(engine.address(), 0);
        engine.step().unwrap();
        assert_eq!(engine.address(), 0x0280);
    }

    #[test]
    fn program_then_read_flash_round_trips() {
        let mut input = [0u8; 4 + 4 + 128 + 1 + 5];
        let mut n = 0;
        let mut put = |bytes: &[u8]| {
            input[n..n + bytes.len()].copy_from_slice(bytes);
            n += bytes.len();
        };
        put(&[STK_LOAD_ADDRESS, 0x40, 0x00, CRC_EOP]);
        put(&[STK_PROG_PAGE, 0x00, 0x80, b'F']);
        let page: [u8; 128] = core::array::from_fn(|i| (i as u8).wrapping_mul(7));
        put(&page);
        put(&[CRC_EOP]);
        put(&[STK_READ_PAGE, 0x00, 0x80, b'F', CRC_EOP]);

        let mut rig = Rig::new(&input);
        let results = rig.steps(3);
        assert_eq!(results[1], Some(Ok(Command::ProgramPage)));
        assert_eq!(results[2], Some(Ok(Command::ReadPage)));

        let sent = rig.link.sent();
        // load, program, then INSYNC + 128 bytes + OK
        assert_eq!(&sent[..4], &[STK_INSYNC, STK_OK, STK_INSYNC, STK_OK]);
        assert_eq!(sent[4], STK_INSYNC);
        assert_eq!(&sent[5..133], &page[..]);
        assert_eq!(sent[133], STK_OK);
        assert_eq!(rig.store.read_code(0x0080), page[0]);
    }

    #[test]
    fn erased_looking_page_still_round_trips() {
        let mut input = [0u8; 4 + 128 + 1];
        input[..4].copy_from_slice(&[STK_PROG_PAGE, 0x00, 0x80, b'F']);
        input[4..132].fill(ERASED);
        input[132] = CRC_EOP;

        let mut rig = Rig::new(&input);
        rig.steps(1);
        assert!((0..128).all(|a| rig.store.read_code(a) == ERASED));
        assert_eq!(rig.link.sent(), &[STK_INSYNC, STK_OK]);
    }

    #[test]
    fn eeprom_program_and_read() {
        let mut rig = Rig::new(&[
            STK_LOAD_ADDRESS, 0x08, 0x00, CRC_EOP,
            STK_PROG_PAGE, 0x00, 0x03, b'E', 0xDE, 0xAD, 0x01, CRC_EOP,
            STK_READ_PAGE, 0x00, 0x03, b'E', CRC_EOP,
        ]);
        rig.steps(3);
        assert_eq!(
            rig.link.sent(),
            &[STK_INSYNC, STK_OK, STK_INSYNC, STK_OK, STK_INSYNC, 0xDE, 0xAD, 0x01, STK_OK]
        );
        assert_eq!(rig.store.eeprom().byte(0x10), 0xDE);
        assert!(rig.store.code().ops().is_empty());
    }

    #[test]
    fn unknown_tag_writes_flash() {
        let mut rig = Rig::new(&[STK_PROG_PAGE, 0x00, 0x02, b'Q', 0x12, 0x34, CRC_EOP]);
        rig.steps(1);
        assert_eq!(rig.store.read_code(0), 0x12);
        assert_eq!(rig.store.read_code(1), 0x34);
        assert_eq!(rig.store.eeprom().writes(), 0);
    }

    #[test]
    fn bad_terminator_hangs_without_reply() {
        let mut rig = Rig::new(&[STK_READ_SIGN, 0x00]);
        let results = rig.steps(1);
        assert_eq!(results[0], Some(Err(ProtocolError::Desync)));
        assert!(rig.link.sent().is_empty());
        assert_eq!(rig.watchdog.timeout(), Some(Timeout::Ms16));
    }

    #[test]
    fn desync_after_page_data_writes_nothing() {
        let mut rig = Rig::new(&[STK_PROG_PAGE, 0x00, 0x02, b'F', 0x12, 0x34, 0x99]);
        let results = rig.steps(1);
        assert_eq!(results[0], Some(Err(ProtocolError::Desync)));
        assert!(rig.store.code().ops().is_empty());
        assert!(rig.link.sent().is_empty());
    }

    #[test]
    fn oversized_page_is_refused() {
        let mut rig = Rig::new(&[STK_PROG_PAGE, 0x01, 0x00, b'F']);
        let results = rig.steps(1);
        assert_eq!(results[0], Some(Err(ProtocolError::PageOverflow)));
        assert!(rig.link.sent().is_empty());
        assert_eq!(rig.watchdog.timeout(), Some(Timeout::Ms16));
    }

    #[test]
    fn leave_progmode_arms_short_watchdog() {
        let mut rig = Rig::new(&[STK_LEAVE_PROGMODE, CRC_EOP]);
        let results = rig.steps(1);
        assert_eq!(results[0], Some(Ok(Command::LeaveProgMode)));
        assert_eq!(rig.link.sent(), &[STK_INSYNC, STK_OK]);
        assert_eq!(rig.watchdog.timeout(), Some(Timeout::Ms16));
    }

    #[test]
    fn engine_arms_liveness_and_pulses_per_frame() {
        let mut rig = Rig::new(&[STK_GET_SYNC, CRC_EOP, STK_ENTER_PROGMODE, CRC_EOP]);
        rig.steps(2);
        assert_eq!(rig.watchdog.events()[0], WatchdogEvent::Arm(Timeout::S1));
        assert_eq!(rig.watchdog.pulses(), 2);
    }

    #[test]
    fn framing_error_pulses_and_keeps_byte() {
        let mut rig = Rig::new(&[STK_GET_SYNC, CRC_EOP]);
        rig.link.corrupt(0);
        let results = rig.steps(1);
        assert_eq!(results[0], Some(Ok(Command::Other(STK_GET_SYNC))));
        // one for the bad byte, one for the terminator
        assert_eq!(rig.watchdog.pulses(), 2);
    }

    #[test]
    fn zero_length_read_sends_no_payload() {
        let mut rig = Rig::new(&[STK_READ_PAGE, 0x00, 0x00, b'F', CRC_EOP]);
        rig.steps(1);
        assert_eq!(rig.link.sent(), &[STK_INSYNC, STK_OK]);
    }

    #[test]
    fn repeated_load_address_is_idempotent() {
        let twice = [
            STK_LOAD_ADDRESS, 0x10, 0x00, CRC_EOP,
            STK_LOAD_ADDRESS, 0x10, 0x00, CRC_EOP,
            STK_READ_PAGE, 0x00, 0x04, b'F', CRC_EOP,
        ];
        let mut rig = Rig::new(&twice);
        rig.store.commit_page(0x0020, &[1, 2, 3, 4]);
        rig.steps(3);
        assert_eq!(&rig.link.sent()[4..], &[STK_INSYNC, 1, 2, 3, 4, STK_OK]);
    }
}
