//!
//! IPP error
//!
use std::io;

use crate::model::{IppVersion, StatusCode};

/// Wire-level codec error
#[derive(Debug, thiserror::Error)]
pub enum IppCodecError {
    #[error("Invalid tag: {0:#04x}")]
    InvalidTag(u8),

    #[error("Invalid value for tag {tag:#04x}: {reason}")]
    InvalidValue { tag: u8, reason: String },

    #[error("Invalid IPP collection tag: {0:#04x}")]
    InvalidCollection(u8),

    #[error("Missing required attribute: {0}")]
    MissingField(String),

    #[error("Attribute {after} must precede {before}")]
    FieldOrder { before: String, after: String },

    #[error("Charset not supported: {0}")]
    InvalidCharset(String),

    #[error("Unexpected group tag {actual:#04x}, expected {expected:#04x}")]
    UnexpectedGroup { expected: u8, actual: u8 },

    #[error("Unknown attribute: {0}")]
    UnknownField(String),

    #[error("Value for '{name}' does not match its declared type (tag {tag:#04x})")]
    TypeMismatch { name: String, tag: u8 },

    #[error("Value of {0} bytes is too long to encode")]
    ValueTooLong(usize),

    #[error(transparent)]
    IoError(#[from] io::Error),
}

impl IppCodecError {
    /// Status reported to the client for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            IppCodecError::InvalidCharset(_) => StatusCode::ClientErrorCharsetNotSupported,
            IppCodecError::UnknownField(_) | IppCodecError::TypeMismatch { .. } | IppCodecError::ValueTooLong(_) => {
                StatusCode::ServerErrorInternalError
            }
            _ => StatusCode::ClientErrorBadRequest,
        }
    }
}

/// IPP error
#[derive(Debug, thiserror::Error)]
pub enum IppError {
    #[error("Malformed IPP message: {0}")]
    /// Unreadable header or truncated stream
    MalformedMessage(String),

    #[error("IPP version {0} is not supported")]
    VersionNotSupported(IppVersion),

    #[error("Invalid request id: {0}")]
    InvalidRequestId(i32),

    #[error(transparent)]
    /// Codec or schema error
    ParseError(#[from] IppCodecError),

    #[error("Operation {0:#06x} is not supported")]
    OperationNotSupported(u16),

    #[error("Document format not supported: {0}")]
    DocumentFormatNotSupported(String),

    #[error("Attribute value not supported: {0}")]
    ValueNotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not possible: {0}")]
    NotPossible(String),

    #[error("Multiple document jobs are not supported")]
    MultipleDocumentJobsNotSupported,

    #[error(transparent)]
    /// Failure inside the job backend
    BackendError(Box<dyn std::error::Error + Send + Sync>),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IppError {
    /// Wrap an arbitrary backend failure
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        IppError::BackendError(err.into())
    }

    /// Status reported to the client for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            IppError::MalformedMessage(_) | IppError::InvalidRequestId(_) => StatusCode::ClientErrorBadRequest,
            IppError::VersionNotSupported(_) => StatusCode::ServerErrorVersionNotSupported,
            IppError::ParseError(e) => e.status_code(),
            IppError::OperationNotSupported(_) => StatusCode::ServerErrorOperationNotSupported,
            IppError::DocumentFormatNotSupported(_) => StatusCode::ClientErrorDocumentFormatNotSupported,
            IppError::ValueNotSupported(_) => StatusCode::ClientErrorAttributesOrValuesNotSupported,
            IppError::NotFound(_) => StatusCode::ClientErrorNotFound,
            IppError::NotPossible(_) => StatusCode::ClientErrorNotPossible,
            IppError::MultipleDocumentJobsNotSupported => StatusCode::ServerErrorMultipleDocumentJobsNotSupported,
            IppError::BackendError(_) | IppError::InternalError(_) => StatusCode::ServerErrorInternalError,
        }
    }

    /// Internal faults are logged in full and never described on the wire
    pub fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::ServerErrorInternalError
    }
}

impl From<io::Error> for IppError {
    fn from(e: io::Error) -> Self {
        IppError::ParseError(IppCodecError::IoError(e))
    }
}
