//! Framed transport primitives over a reliable ordered byte stream.
//!
//! All integers on the wire are big-endian; variable-length fields are
//! prefixed with a `u32` byte count. Writes are buffered, so every logical
//! phase must end with a [`Conn::flush`] before the party starts reading, or
//! both sides end up waiting on half-buffered data.

use std::io::{BufReader, BufWriter, Read, Write};

use crate::Error;

/// Control-path sentinel; used as ping frame and end-of-stream marker.
pub const PING: u32 = 0xffff_ffff;

/// A framed connection to the peer.
pub struct Conn<R, W: Write> {
    pub(crate) reader: BufReader<R>,
    pub(crate) writer: BufWriter<W>,
}

impl<R: Read, W: Write> Conn<R, W> {
    /// Wraps the two halves of a byte stream.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
        }
    }

    /// Sends a big-endian `u32`.
    pub fn send_u32(&mut self, value: u32) -> Result<(), Error> {
        write_u32(&mut self.writer, value)
    }

    /// Receives a big-endian `u32`.
    pub fn recv_u32(&mut self) -> Result<u32, Error> {
        read_u32(&mut self.reader)
    }

    /// Sends a length-prefixed byte string.
    pub fn send_data(&mut self, data: &[u8]) -> Result<(), Error> {
        write_data(&mut self.writer, data)
    }

    /// Receives a length-prefixed byte string.
    pub fn recv_data(&mut self) -> Result<Vec<u8>, Error> {
        read_data(&mut self.reader)
    }

    /// Receives a length-prefixed byte string of a known size, failing with
    /// [`Error::ProtocolMismatch`] on any other length.
    pub fn recv_data_exact(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let data = self.recv_data()?;
        if data.len() != len {
            return Err(Error::ProtocolMismatch {
                expected: len as u32,
                got: data.len() as u32,
            });
        }
        Ok(data)
    }

    /// Flushes buffered writes to the peer.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush()?;
        Ok(())
    }

    /// Sends the ping sentinel on the control path; no response is expected.
    pub fn send_ping(&mut self) -> Result<(), Error> {
        self.send_u32(PING)?;
        self.flush()
    }
}

pub(crate) fn write_u32(writer: &mut impl Write, value: u32) -> Result<(), Error> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub(crate) fn read_u32(reader: &mut impl Read) -> Result<u32, Error> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub(crate) fn write_data(writer: &mut impl Write, data: &[u8]) -> Result<(), Error> {
    write_u32(writer, data.len() as u32)?;
    writer.write_all(data)?;
    Ok(())
}

pub(crate) fn read_data(reader: &mut impl Read) -> Result<Vec<u8>, Error> {
    let len = read_u32(reader)? as usize;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;
    Ok(data)
}
