//! Opcode and memory-tag decoding

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    GetParameter,
    SetDevice,
    SetDeviceExt,
    LoadAddress,
    Universal,
    ProgramPage,
    ReadPage,
    ReadSignature,
    LeaveProgMode,
    /// Anything else, e.g. Get Sync or Enter Program Mode. Acknowledged
    /// without side effects.
    Other(u8),
}

impl Command {
    pub fn from_opcode(opcode: u8) -> Self {
        match opcode {
            STK_GET_PARAMETER => Command::GetParameter,
            STK_SET_DEVICE => Command::SetDevice,
            STK_SET_DEVICE_EXT => Command::SetDeviceExt,
            STK_LOAD_ADDRESS => Command::LoadAddress,
            STK_UNIVERSAL => Command::Universal,
            STK_PROG_PAGE => Command::ProgramPage,
            STK_READ_PAGE => Command::ReadPage,
            STK_READ_SIGN => Command::ReadSignature,
            STK_LEAVE_PROGMODE => Command::LeaveProgMode,
            other => Command::Other(other),
        }
    }

    pub fn opcode(self) -> u8 {
        match self {
            Command::GetParameter => STK_GET_PARAMETER,
            Command::SetDevice => STK_SET_DEVICE,
            Command::SetDeviceExt => STK_SET_DEVICE_EXT,
            Command::LoadAddress => STK_LOAD_ADDRESS,
            Command::Universal => STK_UNIVERSAL,
            Command::ProgramPage => STK_PROG_PAGE,
            Command::ReadPage => STK_READ_PAGE,
            Command::ReadSignature => STK_READ_SIGN,
            Command::LeaveProgMode => STK_LEAVE_PROGMODE,
            Command::Other(opcode) => opcode,
        }
    }
}

/// Destination of Program Page / Read Page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemoryType {
    Flash,
    Eeprom,
}

impl MemoryType {
    pub const EEPROM_TAG: u8 = b'E';

    /// Only 'E' selects EEPROM, and only on parts that have one. Every other
    /// tag means flash.
    pub fn from_tag(tag: u8, has_eeprom: bool) -> Self {
        if tag == Self::EEPROM_TAG && has_eeprom {
            MemoryType::Eeprom
        } else {
            MemoryType::Flash
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_opcodes_map_back() {
        for opcode in [
            STK_GET_PARAMETER,
            STK_SET_DEVICE,
            STK_SET_DEVICE_EXT,
            STK_LOAD_ADDRESS,
            STK_UNIVERSAL,
            STK_PROG_PAGE,
            STK_READ_PAGE,
            STK_READ_SIGN,
            STK_LEAVE_PROGMODE,
        ] {
            let command = Command::from_opcode(opcode);
            assert!(!matches!(command, Command::Other(_)));
            assert_eq!(command.opcode(), opcode);
        }
    }

    #[test]
    fn session_framing_opcodes_are_other() {
        assert_eq!(Command::from_opcode(STK_GET_SYNC), Command::Other(STK_GET_SYNC));
        assert_eq!(
            Command::from_opcode(STK_ENTER_PROGMODE),
            Command::Other(STK_ENTER_PROGMODE)
        );
    }

    #[test]
    fn unknown_tags_default_to_flash() {
        assert_eq!(MemoryType::from_tag(b'E', true), MemoryType::Eeprom);
        assert_eq!(MemoryType::from_tag(b'F', true), MemoryType::Flash);
        assert_eq!(MemoryType::from_tag(b'X', true), MemoryType::Flash);
        assert_eq!(MemoryType::from_tag(0, true), MemoryType::Flash);
        assert_eq!(MemoryType::from_tag(b'E', false), MemoryType::Flash);
    }
}
