use derive_more::Display;
use serde::{Deserialize, Serialize};
use starcache_core::error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match err.class {
            ErrorClass::InvalidArgument => ErrorKind::Invalid,
            ErrorClass::Unsupported => ErrorKind::Unsupported,
            ErrorClass::Execution => ErrorKind::Execution,
            ErrorClass::InvariantViolation | ErrorClass::Internal | ErrorClass::Shutdown => {
                ErrorKind::Internal
            }
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Rejected when the region, command, or request was built.
    Invalid,

    /// Well-formed, but the target cannot be edited.
    Unsupported,

    /// The database failed a load.
    Execution,

    /// The caller cannot remediate this.
    Internal,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Schema,
    Predicate,
    Batch,
    Sql,
    Segment,
    Region,
    Member,
    Executor,
    Config,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Schema => Self::Schema,
            CoreErrorOrigin::Predicate => Self::Predicate,
            CoreErrorOrigin::Batch => Self::Batch,
            CoreErrorOrigin::Sql => Self::Sql,
            CoreErrorOrigin::Segment => Self::Segment,
            CoreErrorOrigin::Region => Self::Region,
            CoreErrorOrigin::Member => Self::Member,
            CoreErrorOrigin::Executor => Self::Executor,
            CoreErrorOrigin::Config => Self::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_map_onto_public_kinds() {
        let cases = [
            (ErrorClass::InvalidArgument, ErrorKind::Invalid),
            (ErrorClass::Unsupported, ErrorKind::Unsupported),
            (ErrorClass::Execution, ErrorKind::Execution),
            (ErrorClass::Shutdown, ErrorKind::Internal),
            (ErrorClass::InvariantViolation, ErrorKind::Internal),
        ];

        for (class, kind) in cases {
            let err: Error = InternalError::new(class, CoreErrorOrigin::Region, "boom").into();
            assert_eq!(err.kind, kind);
            assert_eq!(err.origin, ErrorOrigin::Region);
            assert_eq!(err.to_string(), "boom");
        }
    }
}
