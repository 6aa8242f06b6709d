//! STK500v1 subset spoken by avrdude's `arduino` programmer type.
//!
//! Every request is an opcode, a fixed (or declared) number of parameter
//! bytes and `CRC_EOP`. Every reply is `STK_INSYNC`, the payload, `STK_OK`.
//! There is no other framing, so each command must consume exactly its own
//! bytes or the stream is lost until the next reset.

pub mod command;
pub mod engine;
pub mod transport;

pub use command::{Command, MemoryType};
pub use engine::Engine;
pub use transport::{ByteTransport, FramingError, SerialLink};

pub const STK_OK: u8 = 0x10;
pub const STK_INSYNC: u8 = 0x14;
pub const CRC_EOP: u8 = 0x20;

pub const STK_GET_SYNC: u8 = 0x30;
pub const STK_GET_PARAMETER: u8 = 0x41;
pub const STK_SET_DEVICE: u8 = 0x42;
pub const STK_SET_DEVICE_EXT: u8 = 0x45;
pub const STK_ENTER_PROGMODE: u8 = 0x50;
pub const STK_LEAVE_PROGMODE: u8 = 0x51;
pub const STK_LOAD_ADDRESS: u8 = 0x55;
pub const STK_UNIVERSAL: u8 = 0x56;
pub const STK_PROG_PAGE: u8 = 0x64;
pub const STK_READ_PAGE: u8 = 0x74;
pub const STK_READ_SIGN: u8 = 0x75;

/// Get Parameter ids answered with the configured version.
pub const STK_SW_MAJOR: u8 = 0x81;
pub const STK_SW_MINOR: u8 = 0x82;

/// Reply to every other Get Parameter id.
pub const GENERIC_PARAMETER: u8 = 0x03;

/// Parameter bytes skipped by Set Device / Set Device Ext.
pub const SET_DEVICE_LEN: usize = 20;
pub const SET_DEVICE_EXT_LEN: usize = 5;
pub const UNIVERSAL_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// The byte where `CRC_EOP` belongs was something else.
    Desync,
    /// Program Page declared more data than one page.
    PageOverflow,
}

pub type Result<T> = core::result::Result<T, ProtocolError>;
