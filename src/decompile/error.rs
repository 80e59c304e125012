use thiserror::Error;

use crate::error::ClassFileError;

/// Terminating outcome of a failed decompilation.
#[derive(Debug, Error)]
pub enum DecompileError {
    /// The byte code violates an expected shape.
    #[error("invalid byte code: {0}")]
    Format(String),

    /// An invariant of the decompilation state was violated.
    #[error("illegal decompilation state: {0}")]
    IllegalState(String),

    /// A variable, method or constant could not be resolved against the method metadata.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// The code reader ran out of bytes. The engine treats this as the end of the method.
    #[error("unexpected end of code")]
    EndOfStream,
}

pub type DecompileResult<T> = Result<T, DecompileError>;

impl DecompileError {
    pub fn format(message: impl Into<String>) -> Self {
        DecompileError::Format(message.into())
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        DecompileError::IllegalState(message.into())
    }

    pub fn unresolved(message: impl Into<String>) -> Self {
        DecompileError::UnresolvedReference(message.into())
    }
}

impl From<ClassFileError> for DecompileError {
    fn from(error: ClassFileError) -> Self {
        match error {
            ClassFileError::BadIndex { .. } => DecompileError::UnresolvedReference(error.to_string()),
            other => DecompileError::Format(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_file_errors_are_classified() {
        let bad_index: DecompileError = ClassFileError::BadIndex { index: 9, size: 2 }.into();
        assert!(matches!(bad_index, DecompileError::UnresolvedReference(_)));

        let mismatch: DecompileError = ClassFileError::TagMismatch {
            index: 1,
            expected: "Class",
        }
        .into();
        assert!(matches!(mismatch, DecompileError::Format(_)));
        assert_eq!(
            mismatch.to_string(),
            "invalid byte code: constant pool entry 1 is not a Class entry"
        );
    }
}
