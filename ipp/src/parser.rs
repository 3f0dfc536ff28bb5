//!
//! IPP stream parser cursor
//!
use std::io::Read;

use bytes::Bytes;
use log::trace;

use crate::{
    error::IppCodecError,
    model::{DelimiterTag, ValueTag},
    reader::IppReader,
    util::to_field_name,
};

/// Forward-only cursor over an IPP attribute stream.
///
/// After [`ParserState::read_field_header`] the cursor holds the tag and, for value tags,
/// the attribute name of the next field. The value itself stays in the stream until a codec consumes it.
pub struct ParserState<R> {
    reader: IppReader<R>,
    current_tag: u8,
    current_name: String,
}

impl<R> ParserState<R>
where
    R: Read,
{
    pub fn new(reader: IppReader<R>) -> Self {
        ParserState {
            reader,
            current_tag: DelimiterTag::EndOfAttributes as u8,
            current_name: String::new(),
        }
    }

    /// Read the next tag and, for non-section tags, the attribute name.
    /// A stream ending before the tag byte is treated as end-of-attributes.
    pub fn read_field_header(&mut self) -> Result<(), IppCodecError> {
        let tag = match self.reader.read_tag()? {
            Some(tag) => tag,
            None => {
                trace!("End of stream, assuming end-of-attributes");
                self.current_tag = DelimiterTag::EndOfAttributes as u8;
                self.current_name.clear();
                return Ok(());
            }
        };

        self.current_tag = tag;
        if DelimiterTag::is_section_tag(tag) {
            trace!("Delimiter tag: {tag:#04x}");
            self.current_name.clear();
        } else {
            self.current_name = to_field_name(&self.reader.read_name()?);
            trace!("Value tag: {tag:#04x}, name: '{}'", self.current_name);
        }
        Ok(())
    }

    /// Read the raw value of the current field, leaving the cursor before the next header
    pub fn read_value(&mut self) -> Result<Bytes, IppCodecError> {
        Ok(self.reader.read_value()?)
    }

    /// True when the current field is an additional value of the previous attribute
    pub fn is_next_set_value(&self) -> bool {
        self.current_name.is_empty()
            && self.current_tag != ValueTag::MemberAttrName as u8
            && self.current_tag != ValueTag::EndCollection as u8
            && !DelimiterTag::is_section_tag(self.current_tag)
    }

    pub fn current_tag(&self) -> u8 {
        self.current_tag
    }

    pub fn current_name(&self) -> &str {
        &self.current_name
    }

    pub fn is_section_tag(&self) -> bool {
        DelimiterTag::is_section_tag(self.current_tag)
    }

    /// Mutable access to the underlying stream
    pub fn stream_mut(&mut self) -> &mut R {
        self.reader.inner_mut()
    }
}
