//!
//! Typed field codecs
//!
use std::{io::Read, sync::Arc};

use bytes::{BufMut, BytesMut};
use log::trace;

use crate::{
    attribute::{AttributeGroup, GroupSchema},
    error::IppCodecError,
    model::{DelimiterTag, ValueTag},
    parser::ParserState,
    util::to_wire_name,
    value::IppValue,
};

/// Read, write and tag capability shared by every field kind
pub trait FieldCodec {
    /// Value tag this codec accepts, `None` for multi-type fields
    fn tag(&self) -> Option<u8>;

    /// Consume the value of the current field and advance the cursor to the next header
    fn read<R: Read>(&self, state: &mut ParserState<R>) -> Result<IppValue, IppCodecError>;

    /// Append the complete field (tag, name, value) to the buffer
    fn write(&self, buffer: &mut BytesMut, name: &str, value: &IppValue) -> Result<(), IppCodecError>;
}

/// Closed set of field types a schema can declare
#[derive(Clone, Debug)]
pub enum FieldKind {
    Integer,
    Boolean,
    Enum,
    OctetString,
    DateTime,
    Resolution,
    RangeOfInteger,
    TextWithLanguage,
    NameWithLanguage,
    TextWithoutLanguage,
    NameWithoutLanguage,
    Keyword,
    Uri,
    UriScheme,
    Charset,
    NaturalLanguage,
    MimeMediaType,
    /// Out-of-band `unknown` value, written with an empty value
    Unknown,
    /// Nested attribute structure described by its own schema
    Collection(Arc<GroupSchema>),
    /// One or more values, each of any of the accepted kinds
    OneSet(Vec<FieldKind>),
    /// Exactly one value of any of the accepted kinds
    Union(Vec<FieldKind>),
}

pub(crate) fn put_len(buffer: &mut BytesMut, len: usize) -> Result<(), IppCodecError> {
    let len = i16::try_from(len).map_err(|_| IppCodecError::ValueTooLong(len))?;
    buffer.put_i16(len);
    Ok(())
}

/// Write `[tag][len][name]`
pub(crate) fn put_header(buffer: &mut BytesMut, tag: u8, name: &str) -> Result<(), IppCodecError> {
    let name = to_wire_name(name);
    buffer.put_u8(tag);
    put_len(buffer, name.len())?;
    buffer.put_slice(name.as_bytes());
    Ok(())
}

/// Write `[len][value]`
pub(crate) fn put_value(buffer: &mut BytesMut, value: &[u8]) -> Result<(), IppCodecError> {
    put_len(buffer, value.len())?;
    buffer.put_slice(value);
    Ok(())
}

/// Discard the current attribute regardless of its tag, together with its additional values.
/// A collection value is skipped through its matching endCollection.
pub fn skip_value<R: Read>(state: &mut ParserState<R>) -> Result<(), IppCodecError> {
    trace!("Skipping '{}' ({:#04x})", state.current_name(), state.current_tag());
    let mut depth = 0usize;
    loop {
        let tag = state.current_tag();
        if DelimiterTag::is_section_tag(tag) {
            return Err(IppCodecError::InvalidCollection(tag));
        }
        if tag == ValueTag::BegCollection as u8 {
            depth += 1;
        } else if tag == ValueTag::EndCollection as u8 {
            depth = depth.saturating_sub(1);
        }
        state.read_value()?;
        state.read_field_header()?;
        if depth == 0 && !state.is_next_set_value() {
            return Ok(());
        }
    }
}

impl FieldKind {
    /// Value tag for single-typed kinds
    pub fn value_tag(&self) -> Option<ValueTag> {
        let tag = match self {
            FieldKind::Integer => ValueTag::Integer,
            FieldKind::Boolean => ValueTag::Boolean,
            FieldKind::Enum => ValueTag::Enum,
            FieldKind::OctetString => ValueTag::OctetStringUnspecified,
            FieldKind::DateTime => ValueTag::DateTime,
            FieldKind::Resolution => ValueTag::Resolution,
            FieldKind::RangeOfInteger => ValueTag::RangeOfInteger,
            FieldKind::TextWithLanguage => ValueTag::TextWithLanguage,
            FieldKind::NameWithLanguage => ValueTag::NameWithLanguage,
            FieldKind::TextWithoutLanguage => ValueTag::TextWithoutLanguage,
            FieldKind::NameWithoutLanguage => ValueTag::NameWithoutLanguage,
            FieldKind::Keyword => ValueTag::Keyword,
            FieldKind::Uri => ValueTag::Uri,
            FieldKind::UriScheme => ValueTag::UriScheme,
            FieldKind::Charset => ValueTag::Charset,
            FieldKind::NaturalLanguage => ValueTag::NaturalLanguage,
            FieldKind::MimeMediaType => ValueTag::MimeMediaType,
            FieldKind::Unknown => ValueTag::Unknown,
            FieldKind::Collection(_) => ValueTag::BegCollection,
            FieldKind::OneSet(_) | FieldKind::Union(_) => return None,
        };
        Some(tag)
    }

    /// Shorthand for a one-set of a single kind
    pub fn set_of(kind: FieldKind) -> FieldKind {
        FieldKind::OneSet(vec![kind])
    }

    // the accepted kind that handles the given tag
    fn accepted<'a>(kinds: &'a [FieldKind], tag: u8) -> Option<&'a FieldKind> {
        kinds.iter().find(|kind| kind.tag() == Some(tag))
    }

    fn read_collection<R: Read>(
        schema: &Arc<GroupSchema>,
        state: &mut ParserState<R>,
    ) -> Result<IppValue, IppCodecError> {
        // begCollection value is empty by definition, whatever the client sent is dropped
        state.read_value()?;
        state.read_field_header()?;

        let group = AttributeGroup::read_members(schema, state)?;

        // cursor is at endCollection
        state.read_value()?;
        state.read_field_header()?;

        Ok(IppValue::Collection(group))
    }

    fn write_collection(
        buffer: &mut BytesMut,
        name: &str,
        group: &AttributeGroup,
    ) -> Result<(), IppCodecError> {
        put_header(buffer, ValueTag::BegCollection as u8, name)?;
        put_value(buffer, &[])?;
        group.write_members(buffer)?;
        put_header(buffer, ValueTag::EndCollection as u8, "")?;
        put_value(buffer, &[])
    }
}

impl FieldCodec for FieldKind {
    fn tag(&self) -> Option<u8> {
        self.value_tag().map(|tag| tag as u8)
    }

    fn read<R: Read>(&self, state: &mut ParserState<R>) -> Result<IppValue, IppCodecError> {
        match self {
            FieldKind::OneSet(kinds) => {
                let mut values = Vec::new();
                loop {
                    let kind = Self::accepted(kinds, state.current_tag())
                        .ok_or(IppCodecError::InvalidTag(state.current_tag()))?;
                    values.push(kind.read(state)?);
                    if !state.is_next_set_value() {
                        break;
                    }
                }
                Ok(IppValue::Array(values))
            }
            FieldKind::Union(kinds) => {
                let kind = Self::accepted(kinds, state.current_tag())
                    .ok_or(IppCodecError::InvalidTag(state.current_tag()))?;
                kind.read(state)
            }
            other => {
                if other.tag() != Some(state.current_tag()) {
                    return Err(IppCodecError::InvalidTag(state.current_tag()));
                }
                match other {
                    FieldKind::Collection(schema) => Self::read_collection(schema, state),
                    _ => {
                        let value = IppValue::parse(state.current_tag(), state.read_value()?)?;
                        state.read_field_header()?;
                        Ok(value)
                    }
                }
            }
        }
    }

    fn write(&self, buffer: &mut BytesMut, name: &str, value: &IppValue) -> Result<(), IppCodecError> {
        let mismatch = || IppCodecError::TypeMismatch {
            name: name.to_owned(),
            tag: value.to_tag(),
        };

        match self {
            FieldKind::OneSet(kinds) => {
                let mut name = name;
                for element in value.iter() {
                    let kind = Self::accepted(kinds, element.to_tag()).ok_or_else(mismatch)?;
                    kind.write(buffer, name, element)?;
                    name = "";
                }
                Ok(())
            }
            FieldKind::Union(kinds) => {
                let kind = Self::accepted(kinds, value.to_tag()).ok_or_else(mismatch)?;
                kind.write(buffer, name, value)
            }
            FieldKind::Collection(_) => match value {
                IppValue::Collection(group) => Self::write_collection(buffer, name, group),
                _ => Err(mismatch()),
            },
            other => {
                if other.tag() != Some(value.to_tag()) || value.is_array() {
                    return Err(mismatch());
                }
                put_header(buffer, value.to_tag(), name)?;
                put_value(buffer, &value.to_bytes()?)
            }
        }
    }
}

/// Declaration of one named field in a group schema
#[derive(Clone, Debug)]
pub struct FieldDef {
    name: &'static str,
    kind: FieldKind,
    required: bool,
    default: Option<IppValue>,
    order: Option<i32>,
}

impl FieldDef {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldDef {
            name,
            kind,
            required: false,
            default: None,
            order: None,
        }
    }

    /// Field must be present after a read
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when the field is absent
    pub fn with_default<V: Into<IppValue>>(mut self, value: V) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Relative position among ordered fields, lower first
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&IppValue> {
        self.default.as_ref()
    }

    pub fn order_key(&self) -> Option<i32> {
        self.order
    }
}
