//! A decompiler for [Java Classfile](https://docs.oracle.com/javase/specs/jvms/se10/html/jvms-4.html)
//! method bodies.
//!
//! The crate reads a class file, decodes the attributes a method body needs (code, line numbers,
//! local variables, bootstrap methods) and turns a range of its bytecode back into an
//! expression/statement tree, which the [`render`] module can print as Java-like source text.

use std::fs::File;
use std::io::{prelude::*, BufReader, Cursor};
use std::path::Path;

use binrw::BinRead;
use log::warn;

#[macro_use]
extern crate bitflags;

pub mod attribute_info;
pub mod class_model;
pub mod constant_info;
pub mod decompile;
pub mod descriptor;
pub mod error;
pub mod field_info;
pub mod method_info;
pub mod render;

pub mod types;

pub use class_model::{ClassModel, Method};
pub use error::{ClassFileError, ClassFileResult};
pub use types::*;

/// Attempt to parse a class file given a path to a class file (without .class extension)
///
/// ```rust
/// let result = classfile_decompiler::parse_class("./does-not-exist/NoSuchClass");
/// assert!(result.is_err());
/// ```
pub fn parse_class(class_name: &str) -> ClassFileResult<ClassFile> {
    let path = format!("{}.class", class_name);
    let file = File::open(Path::new(&path))?;
    let mut reader = BufReader::new(file);
    parse_class_from_reader(&mut reader)
}

/// Attempt to parse a class file given a reader that implements the std::io::Read trait.
///
/// ```rust
/// let mut reader = "this_will_be_parsed_as_classfile".as_bytes();
/// let result = classfile_decompiler::parse_class_from_reader(&mut reader);
/// assert!(result.is_err());
/// ```
pub fn parse_class_from_reader<T: Read>(reader: &mut T) -> ClassFileResult<ClassFile> {
    let mut class_bytes = Vec::new();
    reader.read_to_end(&mut class_bytes)?;
    parse_class_bytes(&class_bytes)
}

/// Parse a class file held in memory.
pub fn parse_class_bytes(class_bytes: &[u8]) -> ClassFileResult<ClassFile> {
    let mut cursor = Cursor::new(class_bytes);
    let class_file = ClassFile::read(&mut cursor)?;

    let remaining = class_bytes.len() as u64 - cursor.position();
    if remaining > 0 {
        warn!(
            "not all bytes were consumed when parsing classfile, {} bytes remaining",
            remaining
        );
    }

    Ok(class_file)
}
