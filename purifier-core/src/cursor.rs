use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::{PurifierError, Result};

/// Positioned read/write cursor over a world stream.
///
/// Keeps its own absolute position so record boundaries never depend on the
/// underlying stream's ambient position.
pub struct RecordCursor<S> {
    stream: S,
    pos: u64,
}

impl<S: Read + Write + Seek> RecordCursor<S> {
    pub fn new(mut stream: S, start: u64) -> Result<Self> {
        stream.seek(SeekFrom::Start(start))?;
        Ok(Self { stream, pos: start })
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    fn eof_at(&self, err: io::Error) -> PurifierError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            PurifierError::UnexpectedEof { offset: self.pos }
        } else {
            PurifierError::Io(err)
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.stream.read_u8().map_err(|e| self.eof_at(e))?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let v = self
            .stream
            .read_u16::<LittleEndian>()
            .map_err(|e| self.eof_at(e))?;
        self.pos += 2;
        Ok(v)
    }

    pub fn read_i16_le(&mut self) -> Result<i16> {
        let v = self
            .stream
            .read_i16::<LittleEndian>()
            .map_err(|e| self.eof_at(e))?;
        self.pos += 2;
        Ok(v)
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        let v = self
            .stream
            .read_i32::<LittleEndian>()
            .map_err(|e| self.eof_at(e))?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.stream
            .read_exact(&mut buf)
            .map_err(|e| self.eof_at(e))?;
        self.pos += n as u64;
        Ok(buf)
    }

    /// Consume `n` bytes without interpreting them.
    ///
    /// Reads rather than seeks: seeking past the end of a file succeeds
    /// silently, and a skip that leaves the file must be reported.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        let mut buf = [0u8; 8];
        let mut left = n;
        while left > 0 {
            let chunk = left.min(buf.len());
            self.stream
                .read_exact(&mut buf[..chunk])
                .map_err(|e| self.eof_at(e))?;
            self.pos += chunk as u64;
            left -= chunk;
        }
        Ok(())
    }

    /// Bytes left between the cursor and the end of the stream.
    pub fn remaining(&mut self) -> Result<u64> {
        let end = self.stream.seek(SeekFrom::End(0))?;
        self.stream.seek(SeekFrom::Start(self.pos))?;
        Ok(end.saturating_sub(self.pos))
    }

    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.stream.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    /// Overwrite one byte at an already-visited offset, then return to the
    /// current position.
    pub fn patch_u8(&mut self, offset: u64, value: u8) -> Result<()> {
        self.patch_with(offset, 1, |w| w.write_u8(value))
    }

    /// Overwrite a little-endian u16 at an already-visited offset.
    pub fn patch_u16_le(&mut self, offset: u64, value: u16) -> Result<()> {
        self.patch_with(offset, 2, |w| w.write_u16::<LittleEndian>(value))
    }

    fn patch_with<F>(&mut self, offset: u64, width: u64, write: F) -> Result<()>
    where
        F: FnOnce(&mut S) -> io::Result<()>,
    {
        debug_assert!(offset + width <= self.pos, "patch must target consumed bytes");
        let resume = self.pos;
        self.stream.seek(SeekFrom::Start(offset))?;
        write(&mut self.stream)?;
        self.stream.seek(SeekFrom::Start(resume))?;
        Ok(())
    }
}
