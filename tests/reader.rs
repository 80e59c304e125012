use std::cell::Cell;
use std::io::{self, Read};
use std::rc::Rc;

use classfile_decompiler::decompile::opcodes::*;
use classfile_decompiler::decompile::{CodeReader, DecompileError};

/// A byte source that counts how often it is read from.
struct CountingSource {
    bytes: Vec<u8>,
    position: usize,
    reads: Rc<Cell<usize>>,
}

impl CountingSource {
    fn new(bytes: &[u8]) -> (Self, Rc<Cell<usize>>) {
        let reads = Rc::new(Cell::new(0));
        let source = CountingSource {
            bytes: bytes.to_vec(),
            position: 0,
            reads: reads.clone(),
        };
        (source, reads)
    }
}

impl Read for CountingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.set(self.reads.get() + 1);
        let rest = &self.bytes[self.position..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.position += n;
        Ok(n)
    }
}

#[test]
fn test_peek_and_commit() {
    let mut reader = CodeReader::from_code(&[ANEWARRAY, 0x00, 0x07, DUP, ICONST_0]);
    assert_eq!(reader.next_instruction().unwrap(), ANEWARRAY);
    assert_eq!(reader.next_unsigned_short().unwrap(), 7);

    assert_eq!(reader.peek_instruction().unwrap(), DUP);
    assert_eq!(reader.pc(), 3);
    reader.commit();
    assert_eq!(reader.pc(), 4);
    assert_eq!(reader.next_instruction().unwrap(), ICONST_0);
}

#[test]
fn test_uncommitted_peek_is_rolled_back() {
    let mut reader = CodeReader::from_code(&[SIPUSH, 0x01, 0x00]);
    assert_eq!(reader.peek_instruction().unwrap(), SIPUSH);
    assert_eq!(reader.peek_unsigned_short().unwrap(), 0x0100);
    assert_eq!(reader.pc(), 0);

    assert_eq!(reader.next_instruction().unwrap(), SIPUSH);
    assert_eq!(reader.next_signed_short().unwrap(), 256);
    assert!(matches!(
        reader.next_instruction(),
        Err(DecompileError::EndOfStream)
    ));
}

#[test]
fn test_commit_without_peek_is_a_no_op() {
    let mut reader = CodeReader::from_code(&[NOP, NOP]);
    reader.next_instruction().unwrap();
    reader.commit();
    assert_eq!(reader.pc(), 1);
}

#[test]
fn test_skip_zero_does_not_touch_the_source() {
    let (source, reads) = CountingSource::new(&[NOP, NOP, NOP]);
    let mut reader = CodeReader::new(source);
    assert_eq!(reader.skip(0).unwrap(), 0);
    assert_eq!(reads.get(), 0);
    assert_eq!(reader.pc(), 0);
}

#[test]
fn test_skip_reports_bytes_skipped() {
    let (source, reads) = CountingSource::new(&[NOP, NOP, RETURN]);
    let mut reader = CodeReader::new(source);
    assert_eq!(reader.skip(2).unwrap(), 2);
    assert!(reads.get() > 0);
    assert_eq!(reader.pc(), 2);
    assert_eq!(reader.next_instruction().unwrap(), RETURN);
    assert_eq!(reader.skip(5).unwrap(), 0);
    assert_eq!(reader.pc(), 3);
}

#[test]
fn test_wide_operands() {
    let mut reader = CodeReader::from_code(&[GOTO_W, 0xff, 0xff, 0xff, 0xfb]);
    assert_eq!(reader.next_instruction().unwrap(), GOTO_W);
    assert_eq!(reader.next_int().unwrap(), -5);
    assert_eq!(reader.pc(), 5);
}
