//!
//! IPP request
//!
use std::{io::Read, sync::Arc};

use log::debug;

use crate::{
    attribute::{AttributeGroup, GroupSchema},
    error::{IppCodecError, IppError},
    field::skip_value,
    model::{DelimiterTag, IppVersion},
    parser::ParserState,
    payload::IppPayload,
    reader::IppReader,
    IppHeader,
};

/// Incoming IPP message read group by group from a blocking stream.
///
/// The framing is the same for requests and responses, so this type also decodes responses
/// when the caller knows which groups to expect.
pub struct IppRequest<R> {
    header: IppHeader,
    state: ParserState<R>,
}

impl<R> IppRequest<R>
where
    R: Read,
{
    /// Parse the header and position the cursor on the first group tag
    pub fn from_reader(reader: R) -> Result<Self, IppError> {
        let mut reader = IppReader::new(reader);
        let header = reader
            .read_header()
            .map_err(|e| IppError::MalformedMessage(format!("unreadable header: {e}")))?;
        Self::start(header, reader)
    }

    /// Wrap a stream positioned right after an already parsed header
    pub fn with_header(header: IppHeader, reader: R) -> Result<Self, IppError> {
        Self::start(header, IppReader::new(reader))
    }

    fn start(header: IppHeader, reader: IppReader<R>) -> Result<Self, IppError> {
        let mut state = ParserState::new(reader);
        state
            .read_field_header()
            .map_err(|e| IppError::MalformedMessage(format!("unreadable attributes: {e}")))?;
        Ok(IppRequest { header, state })
    }

    pub fn header(&self) -> &IppHeader {
        &self.header
    }

    pub fn version(&self) -> IppVersion {
        self.header.version
    }

    pub fn operation_id(&self) -> u16 {
        self.header.operation_or_status
    }

    pub fn request_id(&self) -> i32 {
        self.header.request_id
    }

    /// Check version and request id before any dispatch
    pub fn validate(&self) -> Result<(), IppError> {
        if !self.header.version.is_supported() {
            return Err(IppError::VersionNotSupported(self.header.version));
        }
        if self.header.request_id <= 0 {
            return Err(IppError::InvalidRequestId(self.header.request_id));
        }
        Ok(())
    }

    /// Section tag of the group the cursor is positioned on
    pub fn next_group_tag(&self) -> u8 {
        self.state.current_tag()
    }

    /// True until the end-of-attributes tag is reached
    pub fn has_next(&self) -> bool {
        self.state.current_tag() != DelimiterTag::EndOfAttributes as u8
    }

    /// Read the next group, which must carry the schema's section tag
    pub fn read_group(&mut self, schema: &Arc<GroupSchema>) -> Result<AttributeGroup, IppError> {
        let expected = schema
            .tag()
            .ok_or_else(|| IppError::InternalError("collection schema used as a group".into()))?
            as u8;
        let actual = self.state.current_tag();
        if actual != expected {
            return Err(IppCodecError::UnexpectedGroup { expected, actual }.into());
        }
        Ok(AttributeGroup::read_from(schema, &mut self.state)?)
    }

    /// Read the next group if it carries the schema's section tag
    pub fn read_optional_group(&mut self, schema: &Arc<GroupSchema>) -> Result<Option<AttributeGroup>, IppError> {
        if self.has_next() && schema.tag().map(|t| t as u8) == Some(self.state.current_tag()) {
            return self.read_group(schema).map(Some);
        }
        Ok(None)
    }

    /// Discard the next group whatever it contains
    pub fn skip_group(&mut self) -> Result<(), IppError> {
        debug!("Skipping group {:#04x}", self.state.current_tag());
        self.state.read_field_header()?;
        while !self.state.is_section_tag() {
            skip_value(&mut self.state)?;
        }
        Ok(())
    }

    /// Skip any unread groups and return the document data
    pub fn payload(&mut self) -> Result<IppPayload<&mut R>, IppError> {
        while self.has_next() {
            self.skip_group()?;
        }
        Ok(IppPayload::new(self.state.stream_mut()))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::{
        field::{FieldDef, FieldKind},
        model::StatusCode,
        value::IppValue,
    };

    fn request(header: &[u8], body: &[u8]) -> Result<IppRequest<io::Cursor<Vec<u8>>>, IppError> {
        let mut data = header.to_vec();
        data.extend_from_slice(body);
        IppRequest::from_reader(io::Cursor::new(data))
    }

    fn job_schema() -> Arc<GroupSchema> {
        GroupSchema::builder(DelimiterTag::JobAttributes)
            .field(FieldDef::new("copies", FieldKind::Integer))
            .build()
    }

    fn operation_schema() -> Arc<GroupSchema> {
        GroupSchema::builder(DelimiterTag::OperationAttributes)
            .field(FieldDef::new("job_name", FieldKind::NameWithoutLanguage))
            .build()
    }

    const HEADER: [u8; 8] = [0x02, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x07];
    const OP_GROUP: [u8; 13] = [
        0x01, 0x42, 0x00, 0x08, b'j', b'o', b'b', b'-', b'n', b'a', b'm', b'e', 0x00,
    ];

    fn op_group() -> Vec<u8> {
        let mut data = OP_GROUP.to_vec();
        data.extend_from_slice(&[0x01, b'x']);
        data
    }

    #[test]
    fn test_parse_header() {
        let req = request(&HEADER, &[0x03]).unwrap();
        assert_eq!(req.version(), IppVersion::v2_0());
        assert_eq!(req.operation_id(), 0x02);
        assert_eq!(req.request_id(), 7);
        assert!(!req.has_next());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_short_header() {
        let err = request(&[0x02, 0x00, 0x00, 0x0b], &[]).err().unwrap();
        assert!(matches!(err, IppError::MalformedMessage(_)));
        assert_eq!(err.status_code(), StatusCode::ClientErrorBadRequest);
    }

    #[test]
    fn test_validate_version() {
        let req = request(&[0x02, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01], &[0x03]).unwrap();
        assert!(matches!(req.validate(), Err(IppError::VersionNotSupported(_))));

        let req = request(&[0x01, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01], &[0x03]).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_request_id() {
        let req = request(&[0x02, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00], &[0x03]).unwrap();
        assert!(matches!(req.validate(), Err(IppError::InvalidRequestId(0))));

        let req = request(&[0x02, 0x00, 0x00, 0x02, 0xff, 0xff, 0xff, 0xff], &[0x03]).unwrap();
        assert!(matches!(req.validate(), Err(IppError::InvalidRequestId(-1))));
    }

    #[test]
    fn test_read_groups_in_sequence() {
        let mut body = op_group();
        body.extend_from_slice(&[0x02, 0x21, 0x00, 0x06, b'c', b'o', b'p', b'i', b'e', b's', 0x00, 0x04, 0, 0, 0, 2]);
        body.push(0x03);
        let mut req = request(&HEADER, &body).unwrap();

        assert_eq!(req.next_group_tag(), 0x01);
        let op = req.read_group(&operation_schema()).unwrap();
        assert_eq!(op.get("job_name"), Some(&IppValue::NameWithoutLanguage("x".into())));

        assert!(req.has_next());
        assert_eq!(req.next_group_tag(), 0x02);
        let job = req.read_group(&job_schema()).unwrap();
        assert_eq!(job.get("copies"), Some(&IppValue::Integer(2)));
        assert!(!req.has_next());
    }

    #[test]
    fn test_read_unexpected_group() {
        let mut body = op_group();
        body.push(0x03);
        let mut req = request(&HEADER, &body).unwrap();
        let err = req.read_group(&job_schema()).err().unwrap();
        assert!(matches!(
            err,
            IppError::ParseError(IppCodecError::UnexpectedGroup {
                expected: 0x02,
                actual: 0x01
            })
        ));
        assert_eq!(err.status_code(), StatusCode::ClientErrorBadRequest);
    }

    #[test]
    fn test_optional_group() {
        let mut body = op_group();
        body.push(0x03);
        let mut req = request(&HEADER, &body).unwrap();
        req.read_group(&operation_schema()).unwrap();
        assert!(req.read_optional_group(&job_schema()).unwrap().is_none());
    }

    #[test]
    fn test_payload_skips_unread_groups() {
        let mut body = op_group();
        body.extend_from_slice(&[0x05, 0x44, 0x00, 0x01, b'k', 0x00, 0x01, b'v', 0x03]);
        body.extend_from_slice(b"%PDF");
        let mut req = request(&HEADER, &body).unwrap();
        req.read_group(&operation_schema()).unwrap();

        let mut data = Vec::new();
        req.payload().unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"%PDF");
    }

    #[test]
    fn test_missing_end_tag_is_end() {
        let mut req = request(&HEADER, &op_group()).unwrap();
        req.read_group(&operation_schema()).unwrap();
        assert!(!req.has_next());
    }

    #[test]
    fn test_truncated_group() {
        let mut req = request(&HEADER, &OP_GROUP[..9]).unwrap();
        let err = req.read_group(&operation_schema()).err().unwrap();
        assert_eq!(err.status_code(), StatusCode::ClientErrorBadRequest);
    }

    #[test]
    fn test_with_header() {
        let header = IppHeader::new(IppVersion::v1_1(), 0x0b, 3);
        let req = IppRequest::with_header(header, io::Cursor::new(op_group())).unwrap();
        assert_eq!(req.next_group_tag(), 0x01);
        assert_eq!(req.request_id(), 3);
    }
}
