//!
//! IPP response
//!
use std::io::{self, Write};

use bytes::{BufMut, Bytes, BytesMut};
use log::warn;

use crate::{
    attribute::{AttributeGroup, RequestedAttributes},
    error::IppCodecError,
    model::{DelimiterTag, IppVersion, StatusCode, ValueTag},
    operation::{attr, BASE_OPERATION},
    value::IppValue,
    IppHeader,
};

/// Outgoing IPP message: header, groups and end-of-attributes tag.
///
/// Client code can build requests with it too by passing an operation id instead of a status.
#[derive(Clone, Debug)]
pub struct IppResponse {
    header: IppHeader,
    groups: Vec<AttributeGroup>,
    requested: Option<RequestedAttributes>,
}

impl IppResponse {
    pub fn new(version: IppVersion, operation_or_status: u16, request_id: i32) -> Self {
        IppResponse {
            header: IppHeader::new(version, operation_or_status, request_id),
            groups: Vec::new(),
            requested: None,
        }
    }

    /// Response carrying only the operation group with charset and natural language
    pub fn minimal(version: IppVersion, status: StatusCode, request_id: i32) -> Self {
        let mut operation = AttributeGroup::new(&BASE_OPERATION);
        if !status.is_success() {
            if let Err(e) = operation.set(attr::STATUS_MESSAGE, IppValue::TextWithoutLanguage(status.to_string())) {
                warn!("Cannot attach status message to {status}: {e}");
            }
        }
        IppResponse::new(version, status as u16, request_id).with_group(operation)
    }

    /// Response to a message whose header could not be read
    pub fn unparsable() -> Self {
        IppResponse::minimal(IppVersion::v2_0(), StatusCode::ClientErrorBadRequest, 0)
    }

    pub fn header(&self) -> &IppHeader {
        &self.header
    }

    pub fn groups(&self) -> &[AttributeGroup] {
        &self.groups
    }

    pub fn push_group(&mut self, group: AttributeGroup) {
        self.groups.push(group);
    }

    pub fn with_group(mut self, group: AttributeGroup) -> Self {
        self.push_group(group);
        self
    }

    /// Attribute selection applied to every group when writing
    pub fn with_requested(mut self, requested: Option<RequestedAttributes>) -> Self {
        self.requested = requested;
        self
    }

    /// Serialize the message
    pub fn to_bytes(&self) -> Result<Bytes, IppCodecError> {
        let mut buffer = BytesMut::new();
        buffer.put(self.header.to_bytes());

        for group in &self.groups {
            let tag = group
                .tag()
                .ok_or_else(|| IppCodecError::TypeMismatch {
                    name: "group".into(),
                    tag: ValueTag::BegCollection as u8,
                })?;
            buffer.put_u8(tag as u8);
            group.write_to(&mut buffer, self.requested.as_ref())?;
        }
        buffer.put_u8(DelimiterTag::EndOfAttributes as u8);

        Ok(buffer.freeze())
    }

    /// Serialize the message into a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let bytes = self
            .to_bytes()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writer.write_all(&bytes)
    }
}
