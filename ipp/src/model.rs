//!
//! Base IPP definitions and tags
//!
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use enum_primitive_derive::Primitive;

/// IPP protocol version, major in the high byte and minor in the low byte
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct IppVersion(pub u16);

impl IppVersion {
    pub const fn v1_0() -> Self {
        IppVersion(0x0100)
    }
    pub const fn v1_1() -> Self {
        IppVersion(0x0101)
    }
    pub const fn v2_0() -> Self {
        IppVersion(0x0200)
    }
    pub const fn v2_1() -> Self {
        IppVersion(0x0201)
    }

    /// Build a version from its two header bytes
    pub const fn new(major: u8, minor: u8) -> Self {
        IppVersion(((major as u16) << 8) | minor as u16)
    }

    pub const fn major(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn minor(&self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Versions accepted by the engine
    pub fn supported() -> &'static [IppVersion] {
        const SUPPORTED: [IppVersion; 3] = [IppVersion::v1_0(), IppVersion::v1_1(), IppVersion::v2_0()];
        &SUPPORTED
    }

    pub fn is_supported(&self) -> bool {
        IppVersion::supported().contains(self)
    }
}

impl fmt::Display for IppVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

/// IPP operation constants
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Primitive, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Operation {
    PrintJob = 0x0002,
    ValidateJob = 0x0004,
    CreateJob = 0x0005,
    SendDocument = 0x0006,
    CancelJob = 0x0008,
    GetJobAttributes = 0x0009,
    GetJobs = 0x000A,
    GetPrinterAttributes = 0x000B,
    HoldJob = 0x000C,
    ReleaseJob = 0x000D,
    RestartJob = 0x000E,
    PausePrinter = 0x0010,
    ResumePrinter = 0x0011,
    PurgeJobs = 0x0012,
    CancelMyJobs = 0x0039,
    CloseJob = 0x003B,
    IdentifyPrinter = 0x003C,
}

/// printer-state constants
#[derive(Primitive, Debug, Copy, Clone, Eq, PartialEq)]
pub enum PrinterState {
    Idle = 3,
    Processing = 4,
    Stopped = 5,
}

/// paper orientation constants
#[derive(Primitive, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Orientation {
    Portrait = 3,
    Landscape = 4,
    ReverseLandscape = 5,
    ReversePortrait = 6,
    None = 7,
}

/// print-quality constants
#[derive(Primitive, Debug, Copy, Clone, Eq, PartialEq)]
pub enum PrintQuality {
    Draft = 3,
    Normal = 4,
    High = 5,
}

/// finishings constants
#[derive(Primitive, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Finishings {
    None = 3,
    Staple = 4,
    Punch = 5,
    Cover = 6,
    Bind = 7,
    SaddleStitch = 8,
    EdgeStitch = 9,
    StapleTopLeft = 20,
    StapleBottomLeft = 21,
    StapleTopRight = 22,
    StapleBottomRight = 23,
}

/// job-state constants
#[derive(Primitive, Debug, Copy, Clone, Eq, PartialEq)]
pub enum JobState {
    Pending = 3,
    PendingHeld = 4,
    Processing = 5,
    ProcessingStopped = 6,
    Canceled = 7,
    Aborted = 8,
    Completed = 9,
}

impl JobState {
    /// Jobs in these states can still be canceled
    pub fn is_cancelable(&self) -> bool {
        matches!(
            self,
            JobState::Pending | JobState::PendingHeld | JobState::Processing | JobState::ProcessingStopped
        )
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_cancelable()
    }
}

/// resolution units
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Primitive, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResolutionUnit {
    Unknown = 0,
    DotsPerInch = 3,
    DotsPerCm = 4,
}

/// group delimiter tags
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Primitive, Debug, Copy, Clone, PartialEq, Hash, Eq)]
pub enum DelimiterTag {
    OperationAttributes = 0x01,
    JobAttributes = 0x02,
    EndOfAttributes = 0x03,
    PrinterAttributes = 0x04,
    UnsupportedAttributes = 0x05,
}

impl DelimiterTag {
    /// Any tag with a zero high nibble starts a new section
    pub const fn is_section_tag(tag: u8) -> bool {
        tag & 0xf0 == 0x00
    }
}

/// IPP value tags
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Primitive, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ValueTag {
    Unsupported = 0x10,
    Unknown = 0x12,
    NoValue = 0x13,
    Integer = 0x21,
    Boolean = 0x22,
    Enum = 0x23,
    OctetStringUnspecified = 0x30,
    DateTime = 0x31,
    Resolution = 0x32,
    RangeOfInteger = 0x33,
    BegCollection = 0x34,
    TextWithLanguage = 0x35,
    NameWithLanguage = 0x36,
    EndCollection = 0x37,
    TextWithoutLanguage = 0x41,
    NameWithoutLanguage = 0x42,
    Keyword = 0x44,
    Uri = 0x45,
    UriScheme = 0x46,
    Charset = 0x47,
    NaturalLanguage = 0x48,
    MimeMediaType = 0x49,
    MemberAttrName = 0x4a,
}

/// IPP status codes
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Primitive, Debug, Copy, Clone, Eq, PartialEq)]
pub enum StatusCode {
    SuccessfulOk = 0x0000,
    SuccessfulOkIgnoredOrSubstitutedAttributes = 0x0001,
    SuccessfulOkConflictingAttributes = 0x0002,
    ClientErrorBadRequest = 0x0400,
    ClientErrorForbidden = 0x0401,
    ClientErrorNotAuthenticated = 0x0402,
    ClientErrorNotAuthorized = 0x0403,
    ClientErrorNotPossible = 0x0404,
    ClientErrorTimeout = 0x0405,
    ClientErrorNotFound = 0x0406,
    ClientErrorGone = 0x0407,
    ClientErrorRequestEntityTooLong = 0x0408,
    ClientErrorRequestValueTooLong = 0x0409,
    ClientErrorDocumentFormatNotSupported = 0x040A,
    ClientErrorAttributesOrValuesNotSupported = 0x040B,
    ClientErrorUriSchemeNotSupported = 0x040C,
    ClientErrorCharsetNotSupported = 0x040D,
    ClientErrorConflictingAttributes = 0x040E,
    ClientErrorCompressionNotSupported = 0x040F,
    ClientErrorCompressionError = 0x0410,
    ClientErrorDocumentFormatError = 0x0411,
    ClientErrorDocumentAccessError = 0x0412,
    ServerErrorInternalError = 0x0500,
    ServerErrorOperationNotSupported = 0x0501,
    ServerErrorServiceUnavailable = 0x0502,
    ServerErrorVersionNotSupported = 0x0503,
    ServerErrorDeviceError = 0x0504,
    ServerErrorTemporaryError = 0x0505,
    ServerErrorNotAcceptingJobs = 0x0506,
    ServerErrorBusy = 0x0507,
    ServerErrorJobCanceled = 0x0508,
    ServerErrorMultipleDocumentJobsNotSupported = 0x0509,
    UnknownStatusCode = 0xffff,
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            StatusCode::SuccessfulOk
                | StatusCode::SuccessfulOkIgnoredOrSubstitutedAttributes
                | StatusCode::SuccessfulOkConflictingAttributes
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            StatusCode::SuccessfulOk => "successful-ok",
            StatusCode::SuccessfulOkIgnoredOrSubstitutedAttributes => "successful-ok-ignored-or-substituted-attributes",
            StatusCode::SuccessfulOkConflictingAttributes => "successful-ok-conflicting-attributes",
            StatusCode::ClientErrorBadRequest => "client-error-bad-request",
            StatusCode::ClientErrorForbidden => "client-error-forbidden",
            StatusCode::ClientErrorNotAuthenticated => "client-error-not-authenticated",
            StatusCode::ClientErrorNotAuthorized => "client-error-not-authorized",
            StatusCode::ClientErrorNotPossible => "client-error-not-possible",
            StatusCode::ClientErrorTimeout => "client-error-timeout",
            StatusCode::ClientErrorNotFound => "client-error-not-found",
            StatusCode::ClientErrorGone => "client-error-gone",
            StatusCode::ClientErrorRequestEntityTooLong => "client-error-request-entity-too-large",
            StatusCode::ClientErrorRequestValueTooLong => "client-error-request-value-too-long",
            StatusCode::ClientErrorDocumentFormatNotSupported => "client-error-document-format-not-supported",
            StatusCode::ClientErrorAttributesOrValuesNotSupported => "client-error-attributes-or-values-not-supported",
            StatusCode::ClientErrorUriSchemeNotSupported => "client-error-uri-scheme-not-supported",
            StatusCode::ClientErrorCharsetNotSupported => "client-error-charset-not-supported",
            StatusCode::ClientErrorConflictingAttributes => "client-error-conflicting-attributes",
            StatusCode::ClientErrorCompressionNotSupported => "client-error-compression-not-supported",
            StatusCode::ClientErrorCompressionError => "client-error-compression-error",
            StatusCode::ClientErrorDocumentFormatError => "client-error-document-format-error",
            StatusCode::ClientErrorDocumentAccessError => "client-error-document-access-error",
            StatusCode::ServerErrorInternalError => "server-error-internal-error",
            StatusCode::ServerErrorOperationNotSupported => "server-error-operation-not-supported",
            StatusCode::ServerErrorServiceUnavailable => "server-error-service-unavailable",
            StatusCode::ServerErrorVersionNotSupported => "server-error-version-not-supported",
            StatusCode::ServerErrorDeviceError => "server-error-device-error",
            StatusCode::ServerErrorTemporaryError => "server-error-temporary-error",
            StatusCode::ServerErrorNotAcceptingJobs => "server-error-not-accepting-jobs",
            StatusCode::ServerErrorBusy => "server-error-busy",
            StatusCode::ServerErrorJobCanceled => "server-error-job-canceled",
            StatusCode::ServerErrorMultipleDocumentJobsNotSupported => {
                "server-error-multiple-document-jobs-not-supported"
            }
            StatusCode::UnknownStatusCode => "unknown-status-code",
        };
        f.write_str(text)
    }
}
