//!
//! Server-side IPP print protocol engine. The crate is organized in layers:
//! * a tag/value codec and a parser cursor for the RFC 8010 binary encoding.
//! * declarative attribute group schemas with requested-attributes filtering, collections and merged groups.
//! * request/response framing and the catalog of supported operations.
//! * an [`IppService`](service::IppService) dispatching requests to a pluggable [`JobBackend`](backend::JobBackend).
//!
//! The HTTP transport is left to the caller: feed the POST body of an `application/ipp` request
//! to [`IppService::handle_request`](service::IppService::handle_request) and send back the returned bytes
//! with [`IPP_CONTENT_TYPE`].
//!
//! The following feature flags are supported:
//! * `serde` - derive `Serialize`/`Deserialize` for protocol constants, headers and the printer configuration
//!
//! Usage example:
//!
//!```rust,no_run
//! use std::fs::File;
//!
//! use ipp_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PrinterConfig {
//!         name: "office".to_owned(),
//!         uri: "ipp://localhost:631/ipp/print".to_owned(),
//!         ..PrinterConfig::default()
//!     };
//!     let service = IppService::new(config.clone(), MemoryBackend::new(config.uri));
//!
//!     let response = service.handle_request(File::open("request.ipp")?, "/ipp/print");
//!     std::fs::write("response.ipp", &response)?;
//!     Ok(())
//! }
//!```

use bytes::{BufMut, Bytes, BytesMut};
use num_traits::FromPrimitive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::model::{IppVersion, StatusCode};

pub mod attribute;
pub mod backend;
pub mod config;
pub mod error;
pub mod field;
pub mod job;
pub mod model;
pub mod operation;
pub mod parser;
pub mod payload;
pub mod reader;
pub mod request;
pub mod response;
pub mod service;
pub mod util;
pub mod value;

/// MIME type of IPP message bodies
pub const IPP_CONTENT_TYPE: &str = "application/ipp";

pub mod prelude {
    //!
    //! Common imports
    //!
    pub use num_traits::FromPrimitive as _;

    pub use crate::{
        attribute::{AttributeGroup, GroupSchema, RequestedAttributes},
        backend::{JobBackend, MemoryBackend},
        config::PrinterConfig,
        field::{FieldDef, FieldKind},
        job::{JobRecord, JobStatus},
        model::*,
        operation::attr,
        payload::IppPayload,
        request::IppRequest,
        response::IppResponse,
        service::IppService,
        value::IppValue,
    };

    pub use super::error::{IppCodecError, IppError};

    pub use super::{IppHeader, IPP_CONTENT_TYPE};
}

/// IPP request and response header
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IppHeader {
    /// IPP protocol version
    pub version: IppVersion,
    /// Operation tag for requests, status for responses
    pub operation_or_status: u16,
    /// ID of the request
    pub request_id: i32,
}

impl IppHeader {
    /// Create IPP header
    pub fn new(version: IppVersion, operation_or_status: u16, request_id: i32) -> IppHeader {
        IppHeader {
            version,
            operation_or_status,
            request_id,
        }
    }

    /// Write header to a given writer
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::new();
        buffer.put_u16(self.version.0);
        buffer.put_u16(self.operation_or_status);
        buffer.put_i32(self.request_id);

        buffer.freeze()
    }

    /// Decode and get IPP status code from the header
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.operation_or_status).unwrap_or(StatusCode::UnknownStatusCode)
    }
}
