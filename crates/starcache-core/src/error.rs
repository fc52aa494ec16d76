use crate::{member::MemberEditError, region::RegionError, sql::SqlError};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured engine error with a stable internal classification.
/// Not a stable API; the facade crate maps it onto its public error.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a caller-facing invalid argument error.
    pub(crate) fn invalid(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, origin, message)
    }

    pub(crate) fn schema_invalid(message: impl Into<String>) -> Self {
        Self::invalid(ErrorOrigin::Schema, message)
    }

    /// Construct a schema-origin invariant violation.
    ///
    /// Raised when an id issued by one schema is resolved against another.
    pub(crate) fn schema_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Schema,
            message,
        )
    }

    pub(crate) fn predicate_invalid(message: impl Into<String>) -> Self {
        Self::invalid(ErrorOrigin::Predicate, message)
    }

    pub(crate) fn request_invalid(message: impl Into<String>) -> Self {
        Self::invalid(ErrorOrigin::Batch, message)
    }

    /// Construct a batch-origin invariant violation.
    pub(crate) fn batch_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Batch, message)
    }

    /// Construct an executor-origin internal error (thread spawn, join).
    pub(crate) fn executor_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Executor, message)
    }

    /// The serializing executor or the worker pool is no longer running.
    pub(crate) fn shutdown(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Shutdown, ErrorOrigin::Executor, message)
    }

    pub(crate) fn config_invalid(message: impl Into<String>) -> Self {
        Self::invalid(ErrorOrigin::Config, message)
    }

    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self.class, ErrorClass::InvalidArgument)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<RegionError> for InternalError {
    fn from(err: RegionError) -> Self {
        Self {
            class: ErrorClass::InvalidArgument,
            origin: ErrorOrigin::Region,
            message: err.to_string(),
            detail: Some(ErrorDetail::Region(err)),
        }
    }
}

impl From<MemberEditError> for InternalError {
    fn from(err: MemberEditError) -> Self {
        let class = if err.is_unsupported() {
            ErrorClass::Unsupported
        } else {
            ErrorClass::InvalidArgument
        };

        Self {
            class,
            origin: ErrorOrigin::Member,
            message: err.to_string(),
            detail: Some(ErrorDetail::Member(err)),
        }
    }
}

impl From<SqlError> for InternalError {
    fn from(err: SqlError) -> Self {
        Self {
            class: ErrorClass::Execution,
            origin: ErrorOrigin::Sql,
            message: err.to_string(),
            detail: Some(ErrorDetail::Sql(err)),
        }
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Region(RegionError),

    #[error("{0}")]
    Member(MemberEditError),

    #[error("{0}")]
    Sql(SqlError),
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Rejected synchronously at construction time.
    InvalidArgument,
    Unsupported,
    /// SQL execution failed; surfaced through a load handle.
    Execution,
    InvariantViolation,
    Internal,
    Shutdown,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Unsupported => "unsupported",
            Self::Execution => "execution",
            Self::InvariantViolation => "invariant_violation",
            Self::Internal => "internal",
            Self::Shutdown => "shutdown",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
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

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Predicate => "predicate",
            Self::Batch => "batch",
            Self::Sql => "sql",
            Self::Segment => "segment",
            Self::Region => "region",
            Self::Member => "member",
            Self::Executor => "executor",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_class_includes_origin_and_class() {
        let err = InternalError::predicate_invalid("or predicate requires operands");

        assert_eq!(
            err.display_with_class(),
            "predicate:invalid_argument: or predicate requires operands"
        );
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn sql_errors_classify_as_execution() {
        let err: InternalError = SqlError::Failed {
            message: "connection reset".to_string(),
        }
        .into();

        assert_eq!(err.class, ErrorClass::Execution);
        assert_eq!(err.origin, ErrorOrigin::Sql);
        assert!(matches!(err.detail, Some(ErrorDetail::Sql(_))));
    }
}
