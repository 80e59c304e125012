//! Sequential reader over a method's instruction bytes.

use std::collections::VecDeque;
use std::io::{self, Read};

use crate::decompile::error::{DecompileError, DecompileResult};

/// Reads instructions and their operands, tracking the program counter.
///
/// `peek_*` reads leave the counter alone until [`CodeReader::commit`] consumes exactly the bytes
/// peeked since the last `next_*` call. A `next_*` call drops any uncommitted peek, so the next
/// byte returned is the first one that was peeked.
pub struct CodeReader<'a> {
    source: Box<dyn Read + 'a>,
    /// Bytes pulled from `source` but not yet consumed.
    buffer: VecDeque<u8>,
    peeked: usize,
    pc: u32,
}

impl<'a> CodeReader<'a> {
    pub fn new(source: impl Read + 'a) -> Self {
        CodeReader {
            source: Box::new(source),
            buffer: VecDeque::new(),
            peeked: 0,
            pc: 0,
        }
    }

    /// Reader over the whole code of a method.
    pub fn from_code(code: &'a [u8]) -> Self {
        CodeReader::new(code)
    }

    /// Offset of the next byte to be consumed.
    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn next_instruction(&mut self) -> DecompileResult<u8> {
        self.next_byte()
    }

    pub fn next_byte(&mut self) -> DecompileResult<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn next_signed_byte(&mut self) -> DecompileResult<i8> {
        Ok(self.next_byte()? as i8)
    }

    pub fn next_unsigned_short(&mut self) -> DecompileResult<u16> {
        Ok(u16::from_be_bytes(self.take::<2>()?))
    }

    pub fn next_signed_short(&mut self) -> DecompileResult<i16> {
        Ok(i16::from_be_bytes(self.take::<2>()?))
    }

    pub fn next_int(&mut self) -> DecompileResult<i32> {
        Ok(i32::from_be_bytes(self.take::<4>()?))
    }

    pub fn peek_instruction(&mut self) -> DecompileResult<u8> {
        self.peek_byte()
    }

    pub fn peek_byte(&mut self) -> DecompileResult<u8> {
        Ok(self.look::<1>()?[0])
    }

    pub fn peek_unsigned_short(&mut self) -> DecompileResult<u16> {
        Ok(u16::from_be_bytes(self.look::<2>()?))
    }

    /// Consume everything peeked since the last `next_*` call.
    pub fn commit(&mut self) {
        self.buffer.drain(..self.peeked);
        self.pc += self.peeked as u32;
        self.peeked = 0;
    }

    /// Advance by up to `count` bytes, returning how many were actually skipped.
    pub fn skip(&mut self, count: u32) -> DecompileResult<u32> {
        if count == 0 {
            return Ok(0);
        }
        self.peeked = 0;

        let buffered = self.buffer.len().min(count as usize);
        self.buffer.drain(..buffered);
        let mut skipped = buffered as u64;

        let rest = count as u64 - skipped;
        if rest > 0 {
            skipped += io::copy(&mut (&mut self.source).take(rest), &mut io::sink())
                .map_err(|e| DecompileError::format(format!("failed to read code: {}", e)))?;
        }

        self.pc += skipped as u32;
        Ok(skipped as u32)
    }

    fn take<const N: usize>(&mut self) -> DecompileResult<[u8; N]> {
        self.peeked = 0;
        self.fill(N)?;
        let mut bytes = [0u8; N];
        for byte in bytes.iter_mut() {
            *byte = self.buffer.pop_front().ok_or(DecompileError::EndOfStream)?;
        }
        self.pc += N as u32;
        Ok(bytes)
    }

    fn look<const N: usize>(&mut self) -> DecompileResult<[u8; N]> {
        self.fill(self.peeked + N)?;
        let mut bytes = [0u8; N];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.buffer[self.peeked + i];
        }
        self.peeked += N;
        Ok(bytes)
    }

    /// Make sure at least `len` bytes are buffered. Nothing is consumed on failure.
    fn fill(&mut self, len: usize) -> DecompileResult<()> {
        let mut byte = [0u8; 1];
        while self.buffer.len() < len {
            match self.source.read(&mut byte) {
                Ok(0) => return Err(DecompileError::EndOfStream),
                Ok(_) => self.buffer.push_back(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(DecompileError::format(format!("failed to read code: {}", e))),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for CodeReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeReader")
            .field("pc", &self.pc)
            .field("buffered", &self.buffer.len())
            .field("peeked", &self.peeked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_reads_advance_pc() {
        let code = [0x11, 0xff, 0xfe, 0x10, 0x80, 0x00, 0x01];
        let mut reader = CodeReader::from_code(&code);
        assert_eq!(reader.next_instruction().unwrap(), 0x11);
        assert_eq!(reader.next_signed_short().unwrap(), -2);
        assert_eq!(reader.pc(), 3);
        assert_eq!(reader.next_byte().unwrap(), 0x10);
        assert_eq!(reader.next_signed_byte().unwrap(), -128);
        assert_eq!(reader.next_unsigned_short().unwrap(), 1);
        assert_eq!(reader.pc(), 7);
        assert!(matches!(reader.next_byte(), Err(DecompileError::EndOfStream)));
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let mut reader = CodeReader::from_code(&[0x01]);
        assert!(matches!(
            reader.next_unsigned_short(),
            Err(DecompileError::EndOfStream)
        ));
        assert_eq!(reader.pc(), 0);
        assert_eq!(reader.next_byte().unwrap(), 0x01);
    }

    #[test]
    fn test_peek_then_next_rolls_back() {
        let mut reader = CodeReader::from_code(&[0x59, 0x03]);
        assert_eq!(reader.peek_instruction().unwrap(), 0x59);
        assert_eq!(reader.peek_byte().unwrap(), 0x03);
        assert_eq!(reader.pc(), 0);
        assert_eq!(reader.next_instruction().unwrap(), 0x59);
        assert_eq!(reader.pc(), 1);
    }

    #[test]
    fn test_skip_is_bounded() {
        let mut reader = CodeReader::from_code(&[1, 2, 3]);
        reader.peek_byte().unwrap();
        assert_eq!(reader.skip(2).unwrap(), 2);
        assert_eq!(reader.pc(), 2);
        assert_eq!(reader.skip(10).unwrap(), 1);
        assert_eq!(reader.pc(), 3);
    }
}
