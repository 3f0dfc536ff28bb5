//!
//! Helper functions shared by the codec and the service
//!
use chrono::{DateTime, Datelike, TimeZone, Timelike};
use http::Uri;

/// Decode UTF-8 text dropping invalid byte sequences
pub fn decode_text(data: &[u8]) -> String {
    let mut text = String::with_capacity(data.len());
    for chunk in data.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Attribute name as sent on the wire: `printer_uri` -> `printer-uri`
pub fn to_wire_name(name: &str) -> String {
    name.replace('_', "-")
}

/// Attribute name as used in schemas: `printer-uri` -> `printer_uri`
pub fn to_field_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Seconds-style counter used for `printer-up-time` and the `time-at-*` job attributes.
///
/// Built from the weekday and the wall clock: `((weekday * 7 + hour) * 60 + minute) * 60 + second`.
pub fn ipp_timestamp<Tz: TimeZone>(date: &DateTime<Tz>) -> i32 {
    let weekday = date.weekday().num_days_from_monday() as i32;
    ((weekday * 7 + date.hour() as i32) * 60 + date.minute() as i32) * 60 + date.second() as i32
}

/// Extract the numeric job id from the last path segment of a job URI
pub fn job_id_from_uri(uri: &str) -> Option<i32> {
    let uri: Uri = uri.parse().ok()?;
    uri.path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}
