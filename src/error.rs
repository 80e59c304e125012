use thiserror::Error;

/// Errors raised while reading the class-file container.
#[derive(Debug, Error)]
pub enum ClassFileError {
    #[error("unable to read class file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed class file: {0}")]
    Binary(#[from] binrw::Error),

    #[error("malformed {attribute} attribute")]
    Attribute { attribute: &'static str },

    #[error("constant pool index {index} is out of range (pool size {size})")]
    BadIndex { index: u16, size: usize },

    #[error("constant pool entry {index} is not a {expected} entry")]
    TagMismatch { index: u16, expected: &'static str },

    #[error("invalid descriptor '{0}'")]
    Descriptor(String),
}

pub type ClassFileResult<T> = Result<T, ClassFileError>;
