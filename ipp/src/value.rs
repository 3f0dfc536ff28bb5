//!
//! IPP value
//!
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use enum_as_inner::EnumAsInner;

use crate::{
    attribute::AttributeGroup,
    error::IppCodecError,
    model::{ResolutionUnit, ValueTag},
    util::decode_text,
    FromPrimitive as _,
};

/// Printer or job resolution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub cross_feed: i32,
    pub feed: i32,
    pub units: ResolutionUnit,
}

impl Resolution {
    pub fn new(cross_feed: i32, feed: i32, units: ResolutionUnit) -> Self {
        Resolution { cross_feed, feed, units }
    }
}

/// Inclusive integer range
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntRange {
    pub lower: i32,
    pub upper: i32,
}

impl IntRange {
    pub fn new(lower: i32, upper: i32) -> Self {
        IntRange { lower, upper }
    }
}

/// Text or name tagged with a natural language
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocalizedText {
    pub language: String,
    pub text: String,
}

/// IPP attribute values as defined in [RFC 8010](https://tools.ietf.org/html/rfc8010).
///
/// Each variant maps to exactly one value tag, so a decoded value re-encodes with the tag it was read with.
#[derive(Clone, Debug, PartialEq, EnumAsInner)]
pub enum IppValue {
    Integer(i32),
    Boolean(bool),
    Enum(i32),
    OctetString(Bytes),
    DateTime(DateTime<FixedOffset>),
    Resolution(Resolution),
    RangeOfInteger(IntRange),
    TextWithLanguage(LocalizedText),
    NameWithLanguage(LocalizedText),
    TextWithoutLanguage(String),
    NameWithoutLanguage(String),
    Keyword(String),
    Uri(String),
    UriScheme(String),
    Charset(String),
    NaturalLanguage(String),
    MimeMediaType(String),
    /// Ordered values of a multi-valued attribute
    Array(Vec<IppValue>),
    Collection(AttributeGroup),
    Unsupported,
    Unknown,
    NoValue,
}

fn expect_len(tag: ValueTag, data: &Bytes, len: usize) -> Result<(), IppCodecError> {
    if data.len() != len {
        return Err(IppCodecError::InvalidValue {
            tag: tag as u8,
            reason: format!("expected {len} bytes, got {}", data.len()),
        });
    }
    Ok(())
}

fn invalid(tag: ValueTag, reason: &str) -> IppCodecError {
    IppCodecError::InvalidValue {
        tag: tag as u8,
        reason: reason.to_owned(),
    }
}

fn parse_localized(tag: ValueTag, mut data: Bytes) -> Result<LocalizedText, IppCodecError> {
    let part = |data: &mut Bytes| {
        if data.remaining() < 2 {
            return Err(invalid(tag, "truncated length"));
        }
        let len = usize::try_from(data.get_i16()).map_err(|_| invalid(tag, "negative length"))?;
        if data.remaining() < len {
            return Err(invalid(tag, "truncated text"));
        }
        Ok(decode_text(&data.split_to(len)))
    };
    let language = part(&mut data)?;
    let text = part(&mut data)?;
    Ok(LocalizedText { language, text })
}

fn parse_datetime(mut data: Bytes) -> Result<DateTime<FixedOffset>, IppCodecError> {
    expect_len(ValueTag::DateTime, &data, 11)?;

    let year = data.get_i16();
    let month = data.get_u8();
    let day = data.get_u8();
    let hour = data.get_u8();
    let minute = data.get_u8();
    let second = data.get_u8();
    let deci_seconds = data.get_u8();
    let direction = data.get_u8();
    let tz_hours = data.get_u8() as i32;
    let tz_minutes = data.get_u8() as i32;

    let sign = if direction == b'+' { 1 } else { -1 };
    let offset = FixedOffset::east_opt(sign * (tz_hours * 3600 + tz_minutes * 60))
        .ok_or_else(|| invalid(ValueTag::DateTime, "invalid timezone"))?;

    let naive = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| {
            date.and_hms_milli_opt(hour as u32, minute as u32, second as u32, deci_seconds as u32 * 100)
        })
        .ok_or_else(|| invalid(ValueTag::DateTime, "invalid date"))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| invalid(ValueTag::DateTime, "ambiguous date"))
}

fn put_datetime(buffer: &mut BytesMut, value: &DateTime<FixedOffset>) -> Result<(), IppCodecError> {
    let utc = value.with_timezone(&Utc);
    let year = i16::try_from(utc.year()).map_err(|_| invalid(ValueTag::DateTime, "year out of range"))?;
    buffer.put_i16(year);
    buffer.put_u8(utc.month() as u8);
    buffer.put_u8(utc.day() as u8);
    buffer.put_u8(utc.hour() as u8);
    buffer.put_u8(utc.minute() as u8);
    buffer.put_u8(utc.second() as u8);
    buffer.put_u8(((utc.nanosecond() % 1_000_000_000) / 100_000_000) as u8);
    buffer.put_u8(b'+');
    buffer.put_u8(0);
    buffer.put_u8(0);
    Ok(())
}

fn put_localized(buffer: &mut BytesMut, value: &LocalizedText) -> Result<(), IppCodecError> {
    for part in [&value.language, &value.text] {
        let len = i16::try_from(part.len()).map_err(|_| IppCodecError::ValueTooLong(part.len()))?;
        buffer.put_i16(len);
        buffer.put_slice(part.as_bytes());
    }
    Ok(())
}

impl IppValue {
    /// Convert to binary tag
    pub fn to_tag(&self) -> u8 {
        let tag = match self {
            IppValue::Integer(_) => ValueTag::Integer,
            IppValue::Boolean(_) => ValueTag::Boolean,
            IppValue::Enum(_) => ValueTag::Enum,
            IppValue::OctetString(_) => ValueTag::OctetStringUnspecified,
            IppValue::DateTime(_) => ValueTag::DateTime,
            IppValue::Resolution(_) => ValueTag::Resolution,
            IppValue::RangeOfInteger(_) => ValueTag::RangeOfInteger,
            IppValue::TextWithLanguage(_) => ValueTag::TextWithLanguage,
            IppValue::NameWithLanguage(_) => ValueTag::NameWithLanguage,
            IppValue::TextWithoutLanguage(_) => ValueTag::TextWithoutLanguage,
            IppValue::NameWithoutLanguage(_) => ValueTag::NameWithoutLanguage,
            IppValue::Keyword(_) => ValueTag::Keyword,
            IppValue::Uri(_) => ValueTag::Uri,
            IppValue::UriScheme(_) => ValueTag::UriScheme,
            IppValue::Charset(_) => ValueTag::Charset,
            IppValue::NaturalLanguage(_) => ValueTag::NaturalLanguage,
            IppValue::MimeMediaType(_) => ValueTag::MimeMediaType,
            IppValue::Array(array) => return array.first().map(|v| v.to_tag()).unwrap_or(ValueTag::Unknown as u8),
            IppValue::Collection(_) => ValueTag::BegCollection,
            IppValue::Unsupported => ValueTag::Unsupported,
            IppValue::Unknown => ValueTag::Unknown,
            IppValue::NoValue => ValueTag::NoValue,
        };
        tag as u8
    }

    /// Decode a single scalar value given its tag and raw value bytes
    pub fn parse(value_tag: u8, data: Bytes) -> Result<IppValue, IppCodecError> {
        let tag = ValueTag::from_u8(value_tag).ok_or(IppCodecError::InvalidTag(value_tag))?;

        let value = match tag {
            ValueTag::Integer => {
                expect_len(tag, &data, 4)?;
                IppValue::Integer(data.clone().get_i32())
            }
            ValueTag::Enum => {
                expect_len(tag, &data, 4)?;
                IppValue::Enum(data.clone().get_i32())
            }
            ValueTag::Boolean => {
                expect_len(tag, &data, 1)?;
                IppValue::Boolean(data[0] != 0)
            }
            ValueTag::OctetStringUnspecified => IppValue::OctetString(data),
            ValueTag::DateTime => IppValue::DateTime(parse_datetime(data)?),
            ValueTag::Resolution => {
                expect_len(tag, &data, 9)?;
                let mut data = data;
                let cross_feed = data.get_i32();
                let feed = data.get_i32();
                let units = data.get_i8();
                let units = ResolutionUnit::from_i8(units).ok_or_else(|| invalid(tag, "unknown resolution unit"))?;
                IppValue::Resolution(Resolution::new(cross_feed, feed, units))
            }
            ValueTag::RangeOfInteger => {
                expect_len(tag, &data, 8)?;
                let mut data = data;
                IppValue::RangeOfInteger(IntRange::new(data.get_i32(), data.get_i32()))
            }
            ValueTag::TextWithLanguage => IppValue::TextWithLanguage(parse_localized(tag, data)?),
            ValueTag::NameWithLanguage => IppValue::NameWithLanguage(parse_localized(tag, data)?),
            ValueTag::TextWithoutLanguage => IppValue::TextWithoutLanguage(decode_text(&data)),
            ValueTag::NameWithoutLanguage => IppValue::NameWithoutLanguage(decode_text(&data)),
            ValueTag::Keyword => IppValue::Keyword(decode_text(&data)),
            ValueTag::Uri => IppValue::Uri(decode_text(&data)),
            ValueTag::UriScheme => IppValue::UriScheme(decode_text(&data)),
            ValueTag::Charset => IppValue::Charset(decode_text(&data)),
            ValueTag::NaturalLanguage => IppValue::NaturalLanguage(decode_text(&data)),
            ValueTag::MimeMediaType => IppValue::MimeMediaType(decode_text(&data)),
            ValueTag::Unsupported => IppValue::Unsupported,
            ValueTag::Unknown => IppValue::Unknown,
            ValueTag::NoValue => IppValue::NoValue,
            ValueTag::BegCollection | ValueTag::EndCollection | ValueTag::MemberAttrName => {
                return Err(IppCodecError::InvalidTag(value_tag))
            }
        };
        Ok(value)
    }

    /// Encode the value bytes of a scalar value, without the length prefix
    pub fn to_bytes(&self) -> Result<Bytes, IppCodecError> {
        let mut buffer = BytesMut::new();

        match self {
            IppValue::Integer(i) | IppValue::Enum(i) => buffer.put_i32(*i),
            IppValue::Boolean(b) => buffer.put_u8(*b as u8),
            IppValue::OctetString(data) => buffer.put_slice(data),
            IppValue::DateTime(date) => put_datetime(&mut buffer, date)?,
            IppValue::Resolution(res) => {
                buffer.put_i32(res.cross_feed);
                buffer.put_i32(res.feed);
                buffer.put_i8(res.units as i8);
            }
            IppValue::RangeOfInteger(range) => {
                buffer.put_i32(range.lower);
                buffer.put_i32(range.upper);
            }
            IppValue::TextWithLanguage(text) | IppValue::NameWithLanguage(text) => put_localized(&mut buffer, text)?,
            IppValue::TextWithoutLanguage(s)
            | IppValue::NameWithoutLanguage(s)
            | IppValue::Keyword(s)
            | IppValue::Uri(s)
            | IppValue::UriScheme(s)
            | IppValue::Charset(s)
            | IppValue::NaturalLanguage(s)
            | IppValue::MimeMediaType(s) => buffer.put_slice(s.as_bytes()),
            IppValue::Unsupported | IppValue::Unknown | IppValue::NoValue => {}
            IppValue::Array(_) | IppValue::Collection(_) => {
                return Err(IppCodecError::TypeMismatch {
                    name: String::new(),
                    tag: self.to_tag(),
                })
            }
        }

        Ok(buffer.freeze())
    }

    /// String content of any textual value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            IppValue::TextWithoutLanguage(s)
            | IppValue::NameWithoutLanguage(s)
            | IppValue::Keyword(s)
            | IppValue::Uri(s)
            | IppValue::UriScheme(s)
            | IppValue::Charset(s)
            | IppValue::NaturalLanguage(s)
            | IppValue::MimeMediaType(s) => Some(s),
            IppValue::TextWithLanguage(t) | IppValue::NameWithLanguage(t) => Some(&t.text),
            _ => None,
        }
    }

    /// Integer content of an integer or enum value
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            IppValue::Integer(i) | IppValue::Enum(i) => Some(*i),
            _ => None,
        }
    }

    /// Iterate over the values of an array, or the value itself for a single value
    pub fn iter(&self) -> Box<dyn Iterator<Item = &IppValue> + '_> {
        match self {
            IppValue::Array(values) => Box::new(values.iter()),
            other => Box::new(std::iter::once(other)),
        }
    }

    /// Array of keywords
    pub fn keywords<I, S>(keywords: I) -> IppValue
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IppValue::Array(keywords.into_iter().map(|k| IppValue::Keyword(k.into())).collect())
    }
}

impl fmt::Display for IppValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IppValue::Integer(i) | IppValue::Enum(i) => write!(f, "{i}"),
            IppValue::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            IppValue::OctetString(data) => write!(f, "<{} bytes>", data.len()),
            IppValue::DateTime(date) => write!(f, "{}", date.to_rfc3339()),
            IppValue::Resolution(res) => {
                let units = match res.units {
                    ResolutionUnit::DotsPerInch => "dpi",
                    ResolutionUnit::DotsPerCm => "dpcm",
                    ResolutionUnit::Unknown => "",
                };
                write!(f, "{}x{}{}", res.cross_feed, res.feed, units)
            }
            IppValue::RangeOfInteger(range) => write!(f, "{}-{}", range.lower, range.upper),
            IppValue::TextWithLanguage(t) | IppValue::NameWithLanguage(t) => write!(f, "{} [{}]", t.text, t.language),
            IppValue::Array(array) => {
                let s: Vec<String> = array.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", s.join(", "))
            }
            IppValue::Collection(group) => {
                let s: Vec<String> = group.values().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "<{}>", s.join(", "))
            }
            IppValue::Unsupported => write!(f, "unsupported"),
            IppValue::Unknown => write!(f, "unknown"),
            IppValue::NoValue => write!(f, "no-value"),
            other => write!(f, "{}", other.as_str().unwrap_or_default()),
        }
    }
}

impl From<bool> for IppValue {
    fn from(b: bool) -> Self {
        IppValue::Boolean(b)
    }
}

impl From<i32> for IppValue {
    fn from(i: i32) -> Self {
        IppValue::Integer(i)
    }
}

impl From<DateTime<Utc>> for IppValue {
    fn from(date: DateTime<Utc>) -> Self {
        IppValue::DateTime(date.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: IppValue) {
        let bytes = value.to_bytes().unwrap();
        let decoded = IppValue::parse(value.to_tag(), bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_scalar_round_trip() {
        round_trip(IppValue::Integer(i32::MIN));
        round_trip(IppValue::Integer(i32::MAX));
        round_trip(IppValue::Enum(9));
        round_trip(IppValue::Boolean(true));
        round_trip(IppValue::Boolean(false));
        round_trip(IppValue::RangeOfInteger(IntRange::new(1, 99)));
        round_trip(IppValue::Resolution(Resolution::new(300, 300, ResolutionUnit::DotsPerInch)));
        round_trip(IppValue::Resolution(Resolution::new(118, 118, ResolutionUnit::DotsPerCm)));
        round_trip(IppValue::Resolution(Resolution::new(1, 2, ResolutionUnit::Unknown)));
        round_trip(IppValue::Keyword("one-sided".into()));
        round_trip(IppValue::OctetString(Bytes::from_static(&[0, 1, 0xff])));
        round_trip(IppValue::TextWithLanguage(LocalizedText {
            language: "de".into(),
            text: "Grüße".into(),
        }));
        round_trip(IppValue::NoValue);
    }

    #[test]
    fn test_datetime_round_trip_keeps_instant() {
        let offset = FixedOffset::west_opt(16 * 3600 + 17 * 60).unwrap();
        let date = offset.with_ymd_and_hms(2024, 2, 29, 23, 59, 58).unwrap();
        let bytes = IppValue::DateTime(date).to_bytes().unwrap();
        let decoded = IppValue::parse(ValueTag::DateTime as u8, bytes).unwrap();
        assert_eq!(decoded.as_date_time().copied(), Some(date));
    }

    #[test]
    fn test_datetime_to_bytes() {
        let date = Utc.timestamp_opt(12345678, 123_400_000).unwrap();
        let bytes = IppValue::from(date).to_bytes().unwrap();
        assert_eq!(
            bytes,
            vec![0x07, 0xb2, 0x05, 0x17, 0x15, 0x15, 0x12, 0x01, b'+', 0x00, 0x00]
        );
    }

    #[test]
    fn test_datetime_parse_with_offset() {
        let data = Bytes::from_static(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x10, 0x11]);
        let value = IppValue::parse(ValueTag::DateTime as u8, data).unwrap();

        let offset = FixedOffset::west_opt(16 * 3600 + 17 * 60).unwrap();
        let expected = offset.with_ymd_and_hms(258, 3, 4, 5, 6, 7).unwrap() + chrono::Duration::milliseconds(800);
        assert_eq!(value, IppValue::DateTime(expected));
    }

    #[test]
    fn test_datetime_year_out_of_range() {
        let date = Utc.with_ymd_and_hms(40000, 1, 1, 0, 0, 0).unwrap();
        let err = IppValue::from(date).to_bytes().unwrap_err();
        assert!(matches!(err, IppCodecError::InvalidValue { tag: 0x31, .. }));
    }

    #[test]
    fn test_localized_text_lengths() {
        let value = IppValue::NameWithLanguage(LocalizedText {
            language: "en".into(),
            text: "x".repeat(i16::MAX as usize + 1),
        });
        assert!(matches!(value.to_bytes(), Err(IppCodecError::ValueTooLong(_))));

        let data = Bytes::from_static(&[0xff, 0xff, b'e', b'n', 0x00, 0x01, b'x']);
        let err = IppValue::parse(ValueTag::TextWithLanguage as u8, data).unwrap_err();
        assert!(matches!(err, IppCodecError::InvalidValue { tag: 0x35, .. }));
    }

    #[test]
    fn test_text_drops_invalid_bytes() {
        let value = IppValue::parse(ValueTag::TextWithoutLanguage as u8, Bytes::from_static(b"ab\xffcd")).unwrap();
        assert_eq!(value, IppValue::TextWithoutLanguage("abcd".into()));
    }

    #[test]
    fn test_invalid_size() {
        let err = IppValue::parse(ValueTag::Integer as u8, Bytes::from_static(&[0, 1])).unwrap_err();
        assert!(matches!(err, IppCodecError::InvalidValue { tag: 0x21, .. }));
    }

    #[test]
    fn test_invalid_resolution_unit() {
        let data = Bytes::from_static(&[0, 0, 0, 1, 0, 0, 0, 1, 9]);
        assert!(IppValue::parse(ValueTag::Resolution as u8, data).is_err());
    }

    #[test]
    fn test_collection_tag_is_not_scalar() {
        assert!(IppValue::parse(ValueTag::BegCollection as u8, Bytes::new()).is_err());
        assert!(IppValue::parse(0x7f, Bytes::new()).is_err());
    }

    #[test]
    fn test_boolean_bytes() {
        assert_eq!(IppValue::Boolean(true).to_bytes().unwrap(), vec![0x01]);
        assert_eq!(
            IppValue::parse(ValueTag::Boolean as u8, Bytes::from_static(&[0x00])).unwrap(),
            IppValue::Boolean(false)
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(IppValue::keywords(["a", "b"]).to_string(), "[a, b]");
        assert_eq!(
            IppValue::Resolution(Resolution::new(300, 600, ResolutionUnit::DotsPerInch)).to_string(),
            "300x600dpi"
        );
        assert_eq!(IppValue::RangeOfInteger(IntRange::new(1, 99)).to_string(), "1-99");
    }
}
