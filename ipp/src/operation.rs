//!
//! Operation catalog: request and response group schemas
//!
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::{
    attribute::{GroupSchema, RequestedAttributes},
    field::{FieldDef, FieldKind},
    model::{DelimiterTag, Finishings, IppVersion, Operation, Orientation, PrintQuality, ResolutionUnit},
    value::{IntRange, IppValue, Resolution},
};

macro_rules! define_attributes {
    ($($name:ident => $value:literal),* $(,)?) => {
        /// Field names referenced by the operation handlers
        pub mod attr {
            $(pub const $name: &str = $value;)*
        }
    };
}

define_attributes! {
    ATTRIBUTES_CHARSET => "attributes_charset",
    ATTRIBUTES_NATURAL_LANGUAGE => "attributes_natural_language",
    REQUESTING_USER_NAME => "requesting_user_name",
    REQUESTED_ATTRIBUTES => "requested_attributes",
    STATUS_MESSAGE => "status_message",
    PRINTER_URI => "printer_uri",
    DOCUMENT_FORMAT => "document_format",
    DOCUMENT_NAME => "document_name",
    JOB_ID => "job_id",
    JOB_URI => "job_uri",
    JOB_NAME => "job_name",
    JOB_STATE => "job_state",
    JOB_STATE_REASONS => "job_state_reasons",
    JOB_STATE_MESSAGE => "job_state_message",
    LAST_DOCUMENT => "last_document",
    LIMIT => "limit",
    FIRST_INDEX => "first_index",
    WHICH_JOBS => "which_jobs",
    MESSAGE => "message",
}

type Schema = Lazy<Arc<GroupSchema>>;

fn keyword(s: &str) -> IppValue {
    IppValue::Keyword(s.to_owned())
}

fn text(s: &str) -> IppValue {
    IppValue::TextWithoutLanguage(s.to_owned())
}

fn enums<I: IntoIterator<Item = i32>>(values: I) -> IppValue {
    IppValue::Array(values.into_iter().map(IppValue::Enum).collect())
}

fn keywords(kind: FieldKind) -> FieldKind {
    FieldKind::set_of(kind)
}

fn default_resolution() -> IppValue {
    IppValue::Resolution(Resolution::new(300, 300, ResolutionUnit::DotsPerInch))
}

/// Operations dispatched by the service, advertised in `operations-supported`
pub const SUPPORTED_OPERATIONS: [Operation; 10] = [
    Operation::PrintJob,
    Operation::ValidateJob,
    Operation::CreateJob,
    Operation::SendDocument,
    Operation::CancelJob,
    Operation::GetJobAttributes,
    Operation::GetJobs,
    Operation::GetPrinterAttributes,
    Operation::CloseJob,
    Operation::IdentifyPrinter,
];

/// Operation group shared by every request and response
pub static BASE_OPERATION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::OperationAttributes)
        .permanent(&[attr::ATTRIBUTES_CHARSET, attr::ATTRIBUTES_NATURAL_LANGUAGE, attr::STATUS_MESSAGE])
        .field(
            FieldDef::new(attr::ATTRIBUTES_CHARSET, FieldKind::Charset)
                .required()
                .with_default(IppValue::Charset("utf-8".into()))
                .order(-2),
        )
        .field(
            FieldDef::new(attr::ATTRIBUTES_NATURAL_LANGUAGE, FieldKind::NaturalLanguage)
                .required()
                .with_default(IppValue::NaturalLanguage("en".into()))
                .order(-1),
        )
        .field(FieldDef::new(attr::REQUESTING_USER_NAME, FieldKind::NameWithoutLanguage))
        .field(FieldDef::new(attr::REQUESTED_ATTRIBUTES, keywords(FieldKind::Keyword)))
        .field(FieldDef::new(attr::STATUS_MESSAGE, FieldKind::TextWithoutLanguage))
        .build()
});

pub static GET_PRINTER_ATTRIBUTES_OPERATION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::OperationAttributes)
        .extend(&BASE_OPERATION)
        .field(FieldDef::new(attr::PRINTER_URI, FieldKind::Uri).required())
        .field(FieldDef::new(attr::DOCUMENT_FORMAT, FieldKind::MimeMediaType))
        .build()
});

/// `printer-description` attributes, the configuration dependent ones are filled in by the service
pub static PRINTER_DESCRIPTION: Schema = Lazy::new(|| {
    let operations = SUPPORTED_OPERATIONS.iter().map(|op| *op as i32);
    GroupSchema::builder(DelimiterTag::PrinterAttributes)
        .filter("printer-description")
        .field(
            FieldDef::new("charset_configured", FieldKind::Charset)
                .required()
                .with_default(IppValue::Charset("utf-8".into())),
        )
        .field(
            FieldDef::new("charset_supported", keywords(FieldKind::Charset))
                .required()
                .with_default(IppValue::Array(vec![IppValue::Charset("utf-8".into())])),
        )
        .field(FieldDef::new("color_supported", FieldKind::Boolean).with_default(true))
        .field(
            FieldDef::new("compression_supported", keywords(FieldKind::Keyword))
                .required()
                .with_default(IppValue::keywords(["none"])),
        )
        .field(FieldDef::new("document_format_supported", keywords(FieldKind::MimeMediaType)).required())
        .field(FieldDef::new("document_format_default", FieldKind::MimeMediaType).required())
        .field(
            FieldDef::new("generated_natural_language_supported", keywords(FieldKind::NaturalLanguage))
                .required()
                .with_default(IppValue::Array(vec![IppValue::NaturalLanguage("en".into())])),
        )
        .field(
            FieldDef::new("ipp_versions_supported", keywords(FieldKind::Keyword))
                .required()
                .with_default(IppValue::keywords(IppVersion::supported().iter().map(ToString::to_string))),
        )
        .field(
            FieldDef::new("ipp_features_supported", keywords(FieldKind::Keyword))
                .with_default(IppValue::keywords(["ipp-everywhere"])),
        )
        .field(FieldDef::new("multiple_document_jobs_supported", FieldKind::Boolean).with_default(false))
        .field(FieldDef::new("multiple_operation_time_out", FieldKind::Integer).with_default(60))
        .field(
            FieldDef::new("natural_language_configured", FieldKind::NaturalLanguage)
                .required()
                .with_default(IppValue::NaturalLanguage("en".into())),
        )
        .field(
            FieldDef::new("operations_supported", keywords(FieldKind::Enum))
                .required()
                .with_default(enums(operations)),
        )
        .field(
            FieldDef::new("pdl_override_supported", FieldKind::Keyword)
                .required()
                .with_default(keyword("not-attempted")),
        )
        .field(FieldDef::new("printer_info", FieldKind::TextWithoutLanguage))
        .field(FieldDef::new("printer_make_and_model", FieldKind::TextWithoutLanguage))
        .field(FieldDef::new("printer_location", FieldKind::TextWithoutLanguage))
        .field(FieldDef::new("printer_more_info_manufacturer", FieldKind::Uri))
        .field(FieldDef::new("pages_per_minute_color", FieldKind::Integer).with_default(60))
        .field(FieldDef::new("pages_per_minute", FieldKind::Integer).with_default(60))
        .field(FieldDef::new("printer_current_time", FieldKind::DateTime))
        .field(FieldDef::new("printer_is_accepting_jobs", FieldKind::Boolean).required().with_default(true))
        .field(
            FieldDef::new("printer_state_reasons", keywords(FieldKind::Keyword))
                .required()
                .with_default(IppValue::keywords(["none"])),
        )
        .field(FieldDef::new("printer_up_time", FieldKind::Integer).required())
        .field(
            FieldDef::new("uri_authentication_supported", keywords(FieldKind::Keyword))
                .required()
                .with_default(IppValue::keywords(["none"])),
        )
        .field(
            FieldDef::new("uri_security_supported", keywords(FieldKind::Keyword))
                .required()
                .with_default(IppValue::keywords(["none"])),
        )
        .field(FieldDef::new("device_service_count", FieldKind::Integer).with_default(1))
        .field(FieldDef::new("print_color_mode_default", FieldKind::Keyword).with_default(keyword("monochrome")))
        .field(
            FieldDef::new("print_color_mode_supported", keywords(FieldKind::Keyword))
                .with_default(IppValue::keywords(["monochrome"])),
        )
        .field(
            FieldDef::new("printer_get_attributes_supported", keywords(FieldKind::Keyword))
                .with_default(IppValue::keywords(["document-format"])),
        )
        .field(FieldDef::new("printer_icons", keywords(FieldKind::Uri)))
        .field(FieldDef::new("printer_uri_supported", keywords(FieldKind::Uri)).required())
        .field(FieldDef::new("printer_name", FieldKind::NameWithoutLanguage).required())
        .field(FieldDef::new("printer_more_info", FieldKind::Uri))
        .field(FieldDef::new("printer_state", FieldKind::Enum).required())
        .field(FieldDef::new("printer_state_message", FieldKind::TextWithoutLanguage))
        .field(FieldDef::new("queued_job_count", FieldKind::Integer).required())
        .field(FieldDef::new("printer_uuid", FieldKind::Uri).required())
        .field(FieldDef::new("device_uuid", FieldKind::Uri).required())
        .build()
});

/// `job-template` defaults and supported values advertised by the printer
pub static JOB_TEMPLATE_PRINTER: Schema = Lazy::new(|| {
    let media = || FieldKind::OneSet(vec![FieldKind::Keyword, FieldKind::NameWithoutLanguage]);
    GroupSchema::builder(DelimiterTag::PrinterAttributes)
        .filter("job-template")
        .field(FieldDef::new("copies_default", FieldKind::Integer).with_default(1))
        .field(
            FieldDef::new("copies_supported", FieldKind::RangeOfInteger)
                .with_default(IppValue::RangeOfInteger(IntRange::new(1, 99))),
        )
        .field(
            FieldDef::new("sides_supported", keywords(FieldKind::Keyword))
                .with_default(IppValue::keywords(["one-sided"])),
        )
        .field(FieldDef::new("sides_default", FieldKind::Keyword).with_default(keyword("one-sided")))
        .field(FieldDef::new("media_supported", media()).with_default(IppValue::keywords(["iso_a4_210x297mm"])))
        .field(FieldDef::new("media_default", FieldKind::Keyword).with_default(keyword("iso_a4_210x297mm")))
        .field(
            FieldDef::new("finishings_supported", keywords(FieldKind::Enum))
                .with_default(enums([Finishings::None as i32])),
        )
        .field(
            FieldDef::new("finishings_default", keywords(FieldKind::Enum))
                .with_default(enums([Finishings::None as i32])),
        )
        .field(
            FieldDef::new("orientation_requested_supported", keywords(FieldKind::Enum))
                .with_default(enums([Orientation::Portrait as i32, Orientation::Landscape as i32])),
        )
        .field(
            FieldDef::new("orientation_requested_default", FieldKind::Enum)
                .with_default(IppValue::Enum(Orientation::Portrait as i32)),
        )
        .field(
            FieldDef::new("output_bin_supported", keywords(FieldKind::Keyword))
                .with_default(IppValue::keywords(["face-up"])),
        )
        .field(FieldDef::new("output_bin_default", FieldKind::Keyword).with_default(keyword("face-up")))
        .field(
            FieldDef::new("print_quality_supported", keywords(FieldKind::Enum))
                .with_default(enums([PrintQuality::Normal as i32])),
        )
        .field(
            FieldDef::new("print_quality_default", FieldKind::Enum)
                .with_default(IppValue::Enum(PrintQuality::Normal as i32)),
        )
        .field(
            FieldDef::new("printer_resolution_supported", keywords(FieldKind::Resolution))
                .with_default(IppValue::Array(vec![default_resolution()])),
        )
        .field(FieldDef::new("printer_resolution_default", FieldKind::Resolution).with_default(default_resolution()))
        .field(
            FieldDef::new("print_color_mode_supported", keywords(FieldKind::Keyword))
                .with_default(IppValue::keywords(["monochrome"])),
        )
        .field(FieldDef::new("print_color_mode_default", FieldKind::Keyword).with_default(keyword("monochrome")))
        .build()
});

/// Everything Get-Printer-Attributes can return
pub static PRINTER_ATTRIBUTES: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::PrinterAttributes)
        .part(&PRINTER_DESCRIPTION)
        .part(&JOB_TEMPLATE_PRINTER)
        .build()
});

pub static GET_JOBS_OPERATION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::OperationAttributes)
        .extend(&BASE_OPERATION)
        .field(FieldDef::new(attr::PRINTER_URI, FieldKind::Uri).required())
        .field(FieldDef::new(attr::LIMIT, FieldKind::Integer).with_default(10000))
        .field(FieldDef::new(attr::FIRST_INDEX, FieldKind::Integer).with_default(0))
        .field(FieldDef::new(attr::WHICH_JOBS, FieldKind::Keyword).with_default(keyword("not-completed")))
        .field(FieldDef::new("my_jobs", FieldKind::Boolean))
        .build()
});

pub static PRINT_JOB_OPERATION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::OperationAttributes)
        .extend(&BASE_OPERATION)
        .field(FieldDef::new(attr::PRINTER_URI, FieldKind::Uri).required())
        .field(FieldDef::new(attr::JOB_NAME, FieldKind::NameWithoutLanguage))
        .field(FieldDef::new("ipp_attribute_fidelity", FieldKind::Boolean).with_default(false))
        .field(FieldDef::new(attr::DOCUMENT_NAME, FieldKind::NameWithoutLanguage))
        .field(FieldDef::new("compression", FieldKind::Keyword).with_default(keyword("none")))
        .field(FieldDef::new(attr::DOCUMENT_FORMAT, FieldKind::MimeMediaType))
        .field(FieldDef::new("document_natural_language", FieldKind::NaturalLanguage))
        .field(FieldDef::new("job_k_octets", FieldKind::Integer))
        .field(FieldDef::new("job_impressions", FieldKind::Integer))
        .field(FieldDef::new("job_media_sheets", FieldKind::Integer))
        .field(FieldDef::new("document_metadata", keywords(FieldKind::OctetString)))
        .build()
});

pub static CREATE_JOB_OPERATION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::OperationAttributes)
        .extend(&BASE_OPERATION)
        .field(FieldDef::new(attr::PRINTER_URI, FieldKind::Uri).required())
        .field(FieldDef::new(attr::JOB_NAME, FieldKind::NameWithoutLanguage))
        .field(FieldDef::new("ipp_attribute_fidelity", FieldKind::Boolean).with_default(false))
        .field(FieldDef::new("job_k_octets", FieldKind::Integer))
        .field(FieldDef::new("job_impressions", FieldKind::Integer))
        .field(FieldDef::new("job_media_sheets", FieldKind::Integer))
        .build()
});

pub static SEND_DOCUMENT_OPERATION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::OperationAttributes)
        .extend(&BASE_OPERATION)
        .field(FieldDef::new(attr::PRINTER_URI, FieldKind::Uri).required())
        .field(FieldDef::new(attr::JOB_ID, FieldKind::Integer))
        .field(FieldDef::new(attr::JOB_URI, FieldKind::Uri))
        .field(FieldDef::new(attr::DOCUMENT_NAME, FieldKind::NameWithoutLanguage))
        .field(FieldDef::new("compression", FieldKind::Keyword).with_default(keyword("none")))
        .field(FieldDef::new(attr::DOCUMENT_FORMAT, FieldKind::MimeMediaType))
        .field(FieldDef::new("document_natural_language", FieldKind::NaturalLanguage))
        .field(FieldDef::new("document_metadata", keywords(FieldKind::OctetString)))
        .field(FieldDef::new(attr::LAST_DOCUMENT, FieldKind::Boolean).required())
        .build()
});

/// Job group returned by Print-Job, Create-Job, Send-Document and Close-Job
pub static JOB_PRINT_RESPONSE: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::JobAttributes)
        .field(
            FieldDef::new(attr::JOB_STATE_REASONS, keywords(FieldKind::Keyword))
                .with_default(IppValue::keywords(["none"])),
        )
        .field(FieldDef::new(attr::JOB_STATE_MESSAGE, FieldKind::TextWithoutLanguage))
        .field(FieldDef::new(attr::JOB_URI, FieldKind::Uri).required())
        .field(FieldDef::new(attr::JOB_ID, FieldKind::Integer).required())
        .field(FieldDef::new(attr::JOB_STATE, FieldKind::Enum).required())
        .build()
});

/// `job-template` attributes supplied by the client
pub static JOB_TEMPLATE: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::JobAttributes)
        .filter("job-template")
        .field(FieldDef::new("copies", FieldKind::Integer).with_default(1))
        .field(FieldDef::new("sides", FieldKind::Keyword).with_default(keyword("one-sided")))
        .field(
            FieldDef::new("media", FieldKind::Union(vec![FieldKind::Keyword, FieldKind::NameWithoutLanguage]))
                .with_default(keyword("iso_a4_210x297mm")),
        )
        .field(
            FieldDef::new("finishings", keywords(FieldKind::Enum)).with_default(enums([Finishings::None as i32])),
        )
        .field(
            FieldDef::new("orientation_requested", FieldKind::Enum)
                .with_default(IppValue::Enum(Orientation::Portrait as i32)),
        )
        .field(FieldDef::new("output_bin", FieldKind::Keyword).with_default(keyword("face-up")))
        .field(FieldDef::new("print_quality", FieldKind::Enum).with_default(IppValue::Enum(PrintQuality::Normal as i32)))
        .field(FieldDef::new("printer_resolution", FieldKind::Resolution).with_default(default_resolution()))
        .field(FieldDef::new("print_color_mode", FieldKind::Keyword).with_default(keyword("auto")))
        .build()
});

/// `job-description` attributes reported for a job
pub static JOB_DESCRIPTION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::JobAttributes)
        .filter("job-description")
        .field(
            FieldDef::new(attr::JOB_STATE_REASONS, keywords(FieldKind::Keyword))
                .with_default(IppValue::keywords(["none"])),
        )
        .field(FieldDef::new(attr::JOB_STATE_MESSAGE, FieldKind::TextWithoutLanguage).with_default(text("")))
        .field(FieldDef::new(attr::JOB_URI, FieldKind::Uri).required())
        .field(FieldDef::new(attr::JOB_ID, FieldKind::Integer).required())
        .field(FieldDef::new(attr::JOB_STATE, FieldKind::Enum).required())
        .field(FieldDef::new("job_printer_uri", FieldKind::Uri).required())
        .field(FieldDef::new(attr::JOB_NAME, FieldKind::NameWithoutLanguage).required())
        .field(FieldDef::new("job_more_info", FieldKind::Uri))
        .field(FieldDef::new("job_originating_user_name", FieldKind::NameWithoutLanguage).required())
        .field(FieldDef::new("time_at_creation", FieldKind::Integer).required())
        .field(FieldDef::new("time_at_processing", FieldKind::Integer).required())
        .field(FieldDef::new("time_at_completed", FieldKind::Integer).required())
        .field(FieldDef::new("job_printer_up_time", FieldKind::Integer).required())
        .field(FieldDef::new("date_time_at_creation", FieldKind::DateTime))
        .field(FieldDef::new("date_time_at_processing", FieldKind::DateTime))
        .field(FieldDef::new("date_time_at_completed", FieldKind::DateTime))
        .field(FieldDef::new("job_media_sheets", FieldKind::Integer))
        .field(FieldDef::new("job_media_sheets_completed", FieldKind::Integer))
        .build()
});

/// Job object as listed by Get-Jobs, only id and uri unless more is requested
pub static JOB_OBJECT: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::JobAttributes)
        .default_filter(Some(RequestedAttributes::from_keywords(["job-id", "job-uri"])))
        .part(&JOB_TEMPLATE)
        .part(&JOB_DESCRIPTION)
        .build()
});

/// Job object as returned by Get-Job-Attributes
pub static JOB_OBJECT_FULL: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::JobAttributes)
        .part(&JOB_TEMPLATE)
        .part(&JOB_DESCRIPTION)
        .build()
});

pub static GET_JOB_ATTRIBUTES_OPERATION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::OperationAttributes)
        .extend(&BASE_OPERATION)
        .field(FieldDef::new(attr::PRINTER_URI, FieldKind::Uri))
        .field(FieldDef::new(attr::JOB_ID, FieldKind::Integer))
        .field(FieldDef::new(attr::JOB_URI, FieldKind::Uri))
        .build()
});

pub static CANCEL_JOB_OPERATION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::OperationAttributes)
        .extend(&BASE_OPERATION)
        .field(FieldDef::new(attr::PRINTER_URI, FieldKind::Uri))
        .field(FieldDef::new(attr::JOB_ID, FieldKind::Integer))
        .field(FieldDef::new(attr::JOB_URI, FieldKind::Uri))
        .field(FieldDef::new(attr::MESSAGE, FieldKind::TextWithoutLanguage))
        .build()
});

pub static CLOSE_JOB_OPERATION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::OperationAttributes)
        .extend(&BASE_OPERATION)
        .field(FieldDef::new(attr::PRINTER_URI, FieldKind::Uri))
        .field(FieldDef::new(attr::JOB_ID, FieldKind::Integer))
        .field(FieldDef::new(attr::JOB_URI, FieldKind::Uri))
        .build()
});

pub static IDENTIFY_PRINTER_OPERATION: Schema = Lazy::new(|| {
    GroupSchema::builder(DelimiterTag::OperationAttributes)
        .extend(&BASE_OPERATION)
        .field(FieldDef::new(attr::PRINTER_URI, FieldKind::Uri).required())
        .field(FieldDef::new("identify_actions", keywords(FieldKind::Keyword)))
        .field(FieldDef::new(attr::MESSAGE, FieldKind::TextWithoutLanguage))
        .build()
});
