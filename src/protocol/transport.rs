//! Byte transport seam between the engine and the serial line

use embedded_hal::serial;

/// A byte that arrived with a line error, most likely a host talking at the
/// wrong bit rate. The byte is still handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingError(pub u8);

/// Blocking duplex byte channel.
pub trait ByteTransport {
    /// Blocks until the transmitter has accepted the byte.
    fn send(&mut self, byte: u8);

    /// Blocks until a byte arrives. This is the only unbounded wait in the
    /// bootloader.
    fn receive(&mut self) -> Result<u8, FramingError>;
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    fn send(&mut self, byte: u8) {
        (**self).send(byte)
    }

    fn receive(&mut self) -> Result<u8, FramingError> {
        (**self).receive()
    }
}

/// Adapts any `embedded-hal` serial port.
///
/// Read errors do not carry the byte, so an error while waiting marks the
/// next byte that does arrive as a framing error. Write errors are dropped
/// the way the on-chip transmitter would drop them.
pub struct SerialLink<S> {
    serial: S,
}

impl<S> SerialLink<S> {
    pub fn new(serial: S) -> Self {
        Self { serial }
    }
}

impl<S> ByteTransport for SerialLink<S>
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    fn send(&mut self, byte: u8) {
        nb::block!(self.serial.write(byte)).ok();
    }

    fn receive(&mut self) -> Result<u8, FramingError> {
        let mut line_error = false;
        loop {
            match self.serial.read() {
                Ok(byte) if line_error => return Err(FramingError(byte)),
                Ok(byte) => return Ok(byte),
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(_)) => line_error = true,
            }
        }
    }
}
