//!
//! Operation dispatch service
//!
use std::{
    io::Read,
    panic::{self, AssertUnwindSafe},
};

use bytes::Bytes;
use chrono::Utc;
use log::{debug, error, info, warn};

use crate::{
    attribute::{AttributeGroup, RequestedAttributes},
    backend::JobBackend,
    config::PrinterConfig,
    error::{IppCodecError, IppError},
    job::{JobRecord, JobStatus},
    model::{IppVersion, Operation, PrinterState, StatusCode},
    operation::{
        attr, BASE_OPERATION, CANCEL_JOB_OPERATION, CLOSE_JOB_OPERATION, CREATE_JOB_OPERATION,
        GET_JOBS_OPERATION, GET_JOB_ATTRIBUTES_OPERATION, GET_PRINTER_ATTRIBUTES_OPERATION,
        IDENTIFY_PRINTER_OPERATION, JOB_PRINT_RESPONSE, JOB_TEMPLATE, PRINTER_ATTRIBUTES, PRINT_JOB_OPERATION,
        SEND_DOCUMENT_OPERATION,
    },
    request::IppRequest,
    response::IppResponse,
    util::{ipp_timestamp, job_id_from_uri},
    value::IppValue,
    FromPrimitive as _,
};

/// A repeated Send-Document with `last-document` and at most this many body bytes is a status query
pub const NEAR_EMPTY_DOCUMENT_LEN: usize = 16;

fn requested(operation: &AttributeGroup) -> Option<RequestedAttributes> {
    operation.get(attr::REQUESTED_ATTRIBUTES).map(RequestedAttributes::from_value)
}

fn text(operation: &AttributeGroup, name: &str) -> Option<String> {
    operation.get(name).and_then(|v| v.as_str()).map(ToOwned::to_owned)
}

// job-id, or the trailing segment of job-uri
fn target_job_id(operation: &AttributeGroup) -> Result<i32, IppError> {
    operation
        .get(attr::JOB_ID)
        .and_then(IppValue::as_i32)
        .or_else(|| {
            operation
                .get(attr::JOB_URI)
                .and_then(IppValue::as_str)
                .and_then(job_id_from_uri)
        })
        .ok_or_else(|| IppCodecError::MissingField("job-id".into()).into())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

/// IPP printer service: decodes requests, calls the backend and encodes responses
pub struct IppService<B> {
    config: PrinterConfig,
    backend: B,
}

impl<B> IppService<B>
where
    B: JobBackend,
{
    pub fn new(config: PrinterConfig, backend: B) -> Self {
        IppService { config, backend }
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Handle one `application/ipp` request body and return the encoded response.
    ///
    /// Never fails: any error is reported as a minimal response with the matching status code.
    pub fn handle_request<R: Read>(&self, body: R, path: &str) -> Bytes {
        let mut request = match IppRequest::from_reader(body) {
            Ok(request) => request,
            Err(e) => {
                warn!("Unparsable IPP request on '{path}': {e}");
                return encode(IppResponse::unparsable());
            }
        };

        let version = request.version();
        let request_id = request.request_id();
        debug!(
            "IPP request on '{path}': version {version}, operation {:#06x}, id {request_id}",
            request.operation_id()
        );

        let result = request.validate().and_then(|_| {
            panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&mut request))).unwrap_or_else(|payload| {
                Err(IppError::InternalError(format!(
                    "handler panicked: {}",
                    panic_message(payload.as_ref())
                )))
            })
        });

        match result {
            Ok(response) => encode(response),
            Err(e) => {
                if e.is_internal() {
                    error!("Request {request_id} on '{path}' failed: {e}");
                } else {
                    warn!("Request {request_id} on '{path}' rejected: {e}");
                }
                encode(IppResponse::minimal(version, e.status_code(), request_id))
            }
        }
    }

    /// Route a validated request to its handler
    pub fn dispatch<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let op = request.operation_id();
        let operation = Operation::from_u16(op).ok_or(IppError::OperationNotSupported(op))?;
        debug!("Dispatching {operation:?}");

        match operation {
            Operation::GetPrinterAttributes => self.get_printer_attributes(request),
            Operation::PrintJob => self.print_job(request),
            Operation::ValidateJob => self.validate_job(request),
            Operation::CreateJob => self.create_job(request),
            Operation::SendDocument => self.send_document(request),
            Operation::GetJobs => self.get_jobs(request),
            Operation::GetJobAttributes => self.get_job_attributes(request),
            Operation::CancelJob => self.cancel_job(request),
            Operation::CloseJob => self.close_job(request),
            Operation::IdentifyPrinter => self.identify_printer(request),
            _ => Err(IppError::OperationNotSupported(op)),
        }
    }

    /// Get-Printer-Attributes operation
    pub fn get_printer_attributes<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let operation = request.read_group(&GET_PRINTER_ATTRIBUTES_OPERATION)?;
        self.check_format(&operation)?;

        let printer = self.printer_attributes()?;
        Ok(ok_response(request.version(), request.request_id())
            .with_group(printer)
            .with_requested(requested(&operation)))
    }

    /// Print-Job operation
    pub fn print_job<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let operation = request.read_group(&PRINT_JOB_OPERATION)?;
        self.check_format(&operation)?;
        let template = read_template(request)?;

        let job_id = self.backend.create_job(&operation, &template)?;
        let mut payload = request.payload()?;
        let job_id = self.backend.submit_job(&mut payload, &operation, job_id)?;

        self.job_response(request, job_id, JobStatus::Pending)
    }

    /// Validate-Job operation
    pub fn validate_job<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let operation = request.read_group(&PRINT_JOB_OPERATION)?;
        self.check_format(&operation)?;
        read_template(request)?;

        Ok(ok_response(request.version(), request.request_id()))
    }

    /// Create-Job operation
    pub fn create_job<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let operation = request.read_group(&CREATE_JOB_OPERATION)?;
        let template = read_template(request)?;

        let job_id = self.backend.create_job(&operation, &template)?;
        self.job_response(request, job_id, JobStatus::Incoming)
    }

    /// Send-Document operation
    pub fn send_document<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let operation = request.read_group(&SEND_DOCUMENT_OPERATION)?;
        self.check_format(&operation)?;
        let record = self.find_job(target_job_id(&operation)?)?;
        let last_document = matches!(operation.get(attr::LAST_DOCUMENT), Some(IppValue::Boolean(true)));

        let mut payload = request.payload()?;
        if record.submitted {
            // some clients poll the job with an empty last document
            if last_document && payload.probe(NEAR_EMPTY_DOCUMENT_LEN + 1)? <= NEAR_EMPTY_DOCUMENT_LEN {
                debug!("Send-Document status query for job {}", record.id);
                return self.job_response(request, record.id, record.status);
            }
            return Err(IppError::MultipleDocumentJobsNotSupported);
        }
        if record.status != JobStatus::Incoming {
            return Err(IppError::NotPossible(format!(
                "job {} is {:?}",
                record.id,
                record.status.job_state()
            )));
        }

        let queued_as = self.backend.submit_job(&mut payload, &operation, record.id)?;
        if queued_as != record.id {
            debug!("Document for job {} queued as job {queued_as}", record.id);
        }
        let status = self
            .backend
            .get_job(record.id)?
            .map_or(JobStatus::Pending, |job| job.status);
        self.job_response(request, record.id, status)
    }

    /// Get-Jobs operation
    pub fn get_jobs<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let operation = request.read_group(&GET_JOBS_OPERATION)?;

        let which_jobs = text(&operation, attr::WHICH_JOBS).unwrap_or_else(|| "not-completed".to_owned());
        if !matches!(which_jobs.as_str(), "not-completed" | "completed" | "all") {
            return Err(IppError::ValueNotSupported(format!("which-jobs '{which_jobs}'")));
        }
        let first_index = operation.get(attr::FIRST_INDEX).and_then(IppValue::as_i32).unwrap_or(0);
        let limit = operation.get(attr::LIMIT).and_then(IppValue::as_i32).unwrap_or(10000);

        let jobs = self
            .backend
            .get_jobs(first_index, limit, which_jobs == "all", which_jobs != "completed")?;

        let mut response =
            ok_response(request.version(), request.request_id()).with_requested(requested(&operation));
        for job in &jobs {
            response.push_group(self.backend.build_job_attributes(job, false)?);
        }
        Ok(response)
    }

    /// Get-Job-Attributes operation
    pub fn get_job_attributes<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let operation = request.read_group(&GET_JOB_ATTRIBUTES_OPERATION)?;
        let record = self.find_job(target_job_id(&operation)?)?;

        let job = self.backend.build_job_attributes(&record.job, true)?;
        Ok(ok_response(request.version(), request.request_id())
            .with_group(job)
            .with_requested(requested(&operation)))
    }

    /// Cancel-Job operation
    pub fn cancel_job<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let operation = request.read_group(&CANCEL_JOB_OPERATION)?;
        let record = self.find_job(target_job_id(&operation)?)?;

        if !record.status.is_cancelable() {
            return Err(IppError::NotPossible(format!(
                "job {} is {:?}",
                record.id,
                record.status.job_state()
            )));
        }
        self.backend.cancel_job(&record.job)?;
        info!(
            "Job {} canceled{}",
            record.id,
            text(&operation, attr::MESSAGE).map(|m| format!(": {m}")).unwrap_or_default()
        );

        Ok(ok_response(request.version(), request.request_id()))
    }

    /// Close-Job operation
    pub fn close_job<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let operation = request.read_group(&CLOSE_JOB_OPERATION)?;
        let record = self.find_job(target_job_id(&operation)?)?;

        self.job_response(request, record.id, record.status)
    }

    /// Identify-Printer operation
    pub fn identify_printer<R: Read>(&self, request: &mut IppRequest<R>) -> Result<IppResponse, IppError> {
        let operation = request.read_group(&IDENTIFY_PRINTER_OPERATION)?;
        let actions = operation
            .get("identify_actions")
            .map(|v| v.iter().filter_map(IppValue::as_str).collect::<Vec<_>>().join(","))
            .unwrap_or_else(|| "display".to_owned());
        info!(
            "Identify-Printer requested by {}: {actions} {}",
            text(&operation, attr::REQUESTING_USER_NAME).unwrap_or_else(|| "anonymous".to_owned()),
            text(&operation, attr::MESSAGE).unwrap_or_default()
        );

        Ok(ok_response(request.version(), request.request_id()))
    }

    fn check_format(&self, operation: &AttributeGroup) -> Result<(), IppError> {
        match operation.get(attr::DOCUMENT_FORMAT).and_then(IppValue::as_str) {
            Some(format) if !self.config.is_format_supported(format) => {
                Err(IppError::DocumentFormatNotSupported(format.to_owned()))
            }
            _ => Ok(()),
        }
    }

    fn find_job(&self, job_id: i32) -> Result<JobRecord<B::Job>, IppError> {
        self.backend
            .get_job(job_id)?
            .ok_or_else(|| IppError::NotFound(format!("job {job_id}")))
    }

    fn job_response<R: Read>(
        &self,
        request: &IppRequest<R>,
        job_id: i32,
        status: JobStatus,
    ) -> Result<IppResponse, IppError> {
        let job = AttributeGroup::new(&JOB_PRINT_RESPONSE)
            .with(attr::JOB_URI, IppValue::Uri(self.backend.get_job_uri(job_id)))?
            .with(attr::JOB_ID, IppValue::Integer(job_id))?
            .with(attr::JOB_STATE, IppValue::Enum(status.job_state() as i32))?
            .with(attr::JOB_STATE_REASONS, IppValue::keywords([status.state_reason()]))?;
        Ok(ok_response(request.version(), request.request_id()).with_group(job))
    }

    /// Printer attributes built from the configuration and the backend's queue
    pub fn printer_attributes(&self) -> Result<AttributeGroup, IppError> {
        let config = &self.config;
        let now = Utc::now();
        let queued = self.backend.get_jobs(0, i32::MAX, false, true)?.len();

        let formats = config
            .supported_formats
            .iter()
            .map(|f| IppValue::MimeMediaType(f.clone()))
            .collect();

        let mut printer = AttributeGroup::new(&PRINTER_ATTRIBUTES)
            .with("printer_name", IppValue::NameWithoutLanguage(config.name.clone()))?
            .with("printer_uri_supported", IppValue::Array(vec![IppValue::Uri(config.uri.clone())]))?
            .with("printer_uuid", IppValue::Uri(config.uuid.clone()))?
            .with("device_uuid", IppValue::Uri(config.uuid.clone()))?
            .with("printer_state", IppValue::Enum(PrinterState::Idle as i32))?
            .with("printer_state_message", IppValue::TextWithoutLanguage("idle".into()))?
            .with("queued_job_count", IppValue::Integer(i32::try_from(queued).unwrap_or(i32::MAX)))?
            .with("document_format_supported", IppValue::Array(formats))?
            .with("document_format_default", IppValue::MimeMediaType(config.default_format.clone()))?
            .with("printer_current_time", now.into())?
            .with("printer_up_time", IppValue::Integer(ipp_timestamp(&now)))?
            .with("color_supported", IppValue::Boolean(config.color))?
            .with(
                "print_color_mode_supported",
                keyword_choice(config.color, &["auto", "monochrome", "color"], &["monochrome"]),
            )?
            .with(
                "print_color_mode_default",
                IppValue::Keyword(if config.color { "auto" } else { "monochrome" }.into()),
            )?
            .with(
                "sides_supported",
                keyword_choice(
                    config.duplex,
                    &["one-sided", "two-sided-long-edge", "two-sided-short-edge"],
                    &["one-sided"],
                ),
            )?
            .with("uri_security_supported", keyword_choice(config.tls, &["tls"], &["none"]))?
            .with("uri_authentication_supported", keyword_choice(config.basic_auth, &["basic"], &["none"]))?;

        let optional = [
            ("printer_info", config.info.clone().map(IppValue::TextWithoutLanguage)),
            ("printer_location", config.location.clone().map(IppValue::TextWithoutLanguage)),
            (
                "printer_make_and_model",
                config.make_and_model.clone().map(IppValue::TextWithoutLanguage),
            ),
            ("printer_more_info", config.info_uri.clone().map(IppValue::Uri)),
            (
                "printer_icons",
                config.icon_uri.clone().map(|uri| IppValue::Array(vec![IppValue::Uri(uri)])),
            ),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                printer.set(name, value)?;
            }
        }
        Ok(printer)
    }
}

fn keyword_choice(enabled: bool, on: &[&str], off: &[&str]) -> IppValue {
    IppValue::keywords((if enabled { on } else { off }).iter().copied())
}

fn ok_response(version: IppVersion, request_id: i32) -> IppResponse {
    IppResponse::new(version, StatusCode::SuccessfulOk as u16, request_id)
        .with_group(AttributeGroup::new(&BASE_OPERATION))
}

// job-template group if the client sent one, the defaults otherwise
fn read_template<R: Read>(request: &mut IppRequest<R>) -> Result<AttributeGroup, IppError> {
    Ok(request
        .read_optional_group(&JOB_TEMPLATE)?
        .unwrap_or_else(|| AttributeGroup::new(&JOB_TEMPLATE)))
}

fn encode(response: IppResponse) -> Bytes {
    match response.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Cannot encode IPP response: {e}");
            let header = response.header();
            let fallback = IppResponse::minimal(header.version, StatusCode::ServerErrorInternalError, header.request_id);
            fallback.to_bytes().unwrap_or_else(|_| {
                IppResponse::new(header.version, StatusCode::ServerErrorInternalError as u16, header.request_id)
                    .to_bytes()
                    .unwrap_or_default()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io, sync::Arc};

    use super::*;
    use crate::{
        attribute::GroupSchema,
        backend::{MemoryBackend, MemoryJob},
        field::{FieldDef, FieldKind},
        model::{DelimiterTag, JobState},
        operation::{JOB_OBJECT, JOB_OBJECT_FULL},
    };

    const PRINTER_URI: &str = "ipp://localhost/ipp/print";

    fn service() -> IppService<MemoryBackend> {
        let config = PrinterConfig {
            name: "test-printer".into(),
            uri: PRINTER_URI.into(),
            color: true,
            tls: true,
            icon_uri: Some("https://localhost/icon.png".into()),
            ..PrinterConfig::default()
        };
        IppService::new(config, MemoryBackend::new(PRINTER_URI))
    }

    fn operation_group(schema: &Arc<GroupSchema>) -> AttributeGroup {
        AttributeGroup::new(schema)
            .with(attr::PRINTER_URI, IppValue::Uri(PRINTER_URI.into()))
            .unwrap()
    }

    fn encode_request(operation: Operation, id: i32, groups: Vec<AttributeGroup>, document: &[u8]) -> Vec<u8> {
        let mut request = IppResponse::new(IppVersion::v2_0(), operation as u16, id);
        for group in groups {
            request.push_group(group);
        }
        let mut data = request.to_bytes().unwrap().to_vec();
        data.extend_from_slice(document);
        data
    }

    fn call(service: &IppService<MemoryBackend>, data: Vec<u8>) -> IppRequest<io::Cursor<Vec<u8>>> {
        let response = service.handle_request(io::Cursor::new(data), "/ipp/print");
        let mut parsed = IppRequest::from_reader(io::Cursor::new(response.to_vec())).unwrap();
        parsed.read_group(&BASE_OPERATION).unwrap();
        parsed
    }

    fn status(response: &IppRequest<io::Cursor<Vec<u8>>>) -> StatusCode {
        response.header().status_code()
    }

    fn print_job(service: &IppService<MemoryBackend>, document: &[u8]) -> i32 {
        let data = encode_request(
            Operation::PrintJob,
            1,
            vec![operation_group(&PRINT_JOB_OPERATION)],
            document,
        );
        let mut response = call(service, data);
        assert_eq!(status(&response), StatusCode::SuccessfulOk);
        let job = response.read_group(&JOB_PRINT_RESPONSE).unwrap();
        job.get(attr::JOB_ID).and_then(IppValue::as_i32).unwrap()
    }

    fn create_job(service: &IppService<MemoryBackend>) -> i32 {
        let data = encode_request(Operation::CreateJob, 1, vec![operation_group(&CREATE_JOB_OPERATION)], &[]);
        let mut response = call(service, data);
        assert_eq!(status(&response), StatusCode::SuccessfulOk);
        let job = response.read_group(&JOB_PRINT_RESPONSE).unwrap();
        job.get(attr::JOB_ID).and_then(IppValue::as_i32).unwrap()
    }

    fn job_request(operation: Operation, schema: &Arc<GroupSchema>, job_id: i32) -> Vec<u8> {
        let group = operation_group(schema)
            .with(attr::JOB_ID, IppValue::Integer(job_id))
            .unwrap();
        encode_request(operation, 9, vec![group], &[])
    }

    fn send_document(service: &IppService<MemoryBackend>, job_id: i32, last: bool, document: &[u8]) -> StatusCode {
        let group = operation_group(&SEND_DOCUMENT_OPERATION)
            .with(attr::JOB_ID, IppValue::Integer(job_id))
            .unwrap()
            .with(attr::LAST_DOCUMENT, IppValue::Boolean(last))
            .unwrap();
        status(&call(service, encode_request(Operation::SendDocument, 3, vec![group], document)))
    }

    #[test]
    fn test_get_printer_attributes() {
        let service = service();
        let group = operation_group(&GET_PRINTER_ATTRIBUTES_OPERATION)
            .with(attr::DOCUMENT_FORMAT, IppValue::MimeMediaType("application/pdf".into()))
            .unwrap();
        let mut response = call(&service, encode_request(Operation::GetPrinterAttributes, 100, vec![group], &[]));

        assert_eq!(status(&response), StatusCode::SuccessfulOk);
        assert_eq!(response.request_id(), 100);
        let printer = response.read_group(&PRINTER_ATTRIBUTES).unwrap();
        assert!(printer
            .get("printer_uri_supported")
            .unwrap()
            .iter()
            .any(|v| v.as_str() == Some(PRINTER_URI)));
        assert_eq!(
            printer.get("printer_name"),
            Some(&IppValue::NameWithoutLanguage("test-printer".into()))
        );
        assert_eq!(printer.get("uri_security_supported"), Some(&IppValue::keywords(["tls"])));
        assert_eq!(printer.get("queued_job_count"), Some(&IppValue::Integer(0)));
        assert!(printer.get("printer_icons").is_some());
        assert!(printer.get("printer_location").is_none());
    }

    #[test]
    fn test_get_printer_attributes_unsupported_format() {
        let service = service();
        let group = operation_group(&GET_PRINTER_ATTRIBUTES_OPERATION)
            .with(
                attr::DOCUMENT_FORMAT,
                IppValue::MimeMediaType("application/octet-stream".into()),
            )
            .unwrap();
        let response = call(&service, encode_request(Operation::GetPrinterAttributes, 100, vec![group], &[]));
        assert_eq!(status(&response), StatusCode::ClientErrorDocumentFormatNotSupported);
        assert_eq!(response.request_id(), 100);
    }

    #[test]
    fn test_get_printer_attributes_requested() {
        let service = service();
        let group = operation_group(&GET_PRINTER_ATTRIBUTES_OPERATION)
            .with(attr::REQUESTED_ATTRIBUTES, IppValue::keywords(["printer-name", "copies-default"]))
            .unwrap();
        let mut response = call(&service, encode_request(Operation::GetPrinterAttributes, 5, vec![group], &[]));
        assert_eq!(status(&response), StatusCode::SuccessfulOk);

        let schema = GroupSchema::builder(DelimiterTag::PrinterAttributes)
            .field(FieldDef::new("printer_name", FieldKind::NameWithoutLanguage))
            .field(FieldDef::new("copies_default", FieldKind::Integer))
            .field(FieldDef::new("printer_uri_supported", FieldKind::set_of(FieldKind::Uri)))
            .build();
        let printer = response.read_group(&schema).unwrap();
        assert!(printer.contains("printer_name"));
        assert_eq!(printer.get("copies_default"), Some(&IppValue::Integer(1)));
        assert!(!printer.contains("printer_uri_supported"));
        assert!(!response.has_next());
    }

    #[test]
    fn test_print_job_then_get_job_attributes() {
        let service = service();
        let job_id = print_job(&service, b"%PDF-1.7");

        let job = service.backend().job(job_id).unwrap().unwrap();
        assert_eq!(job.document.as_deref(), Some(&b"%PDF-1.7"[..]));

        let mut response = call(
            &service,
            job_request(Operation::GetJobAttributes, &GET_JOB_ATTRIBUTES_OPERATION, job_id),
        );
        assert_eq!(status(&response), StatusCode::SuccessfulOk);
        let job = response.read_group(&JOB_OBJECT_FULL).unwrap();
        assert_eq!(job.get(attr::JOB_STATE), Some(&IppValue::Enum(JobState::Pending as i32)));
        assert_eq!(job.get(attr::JOB_ID), Some(&IppValue::Integer(job_id)));
    }

    #[test]
    fn test_print_job_with_template() {
        let service = service();
        let template = AttributeGroup::new(&JOB_TEMPLATE)
            .with("copies", IppValue::Integer(10))
            .unwrap();
        let data = encode_request(
            Operation::PrintJob,
            1,
            vec![operation_group(&PRINT_JOB_OPERATION), template],
            b"data",
        );
        assert_eq!(status(&call(&service, data)), StatusCode::SuccessfulOk);

        let job = service.backend().job(1).unwrap().unwrap();
        assert_eq!(job.template.get("copies"), Some(&IppValue::Integer(10)));
    }

    #[test]
    fn test_get_job_attributes_by_uri() {
        let service = service();
        let job_id = print_job(&service, b"x");
        let group = operation_group(&GET_JOB_ATTRIBUTES_OPERATION)
            .with(attr::JOB_URI, IppValue::Uri(format!("{PRINTER_URI}/job/{job_id}")))
            .unwrap();
        let mut response = call(&service, encode_request(Operation::GetJobAttributes, 2, vec![group], &[]));
        assert_eq!(status(&response), StatusCode::SuccessfulOk);
        let job = response.read_group(&JOB_OBJECT_FULL).unwrap();
        assert_eq!(job.get(attr::JOB_ID), Some(&IppValue::Integer(job_id)));
    }

    #[test]
    fn test_get_job_attributes_not_found() {
        let response = call(
            &service(),
            job_request(Operation::GetJobAttributes, &GET_JOB_ATTRIBUTES_OPERATION, 77),
        );
        assert_eq!(status(&response), StatusCode::ClientErrorNotFound);
    }

    #[test]
    fn test_cancel_job_twice() {
        let service = service();
        let job_id = create_job(&service);

        let response = call(&service, job_request(Operation::CancelJob, &CANCEL_JOB_OPERATION, job_id));
        assert_eq!(status(&response), StatusCode::SuccessfulOk);

        let response = call(&service, job_request(Operation::CancelJob, &CANCEL_JOB_OPERATION, job_id));
        assert_eq!(status(&response), StatusCode::ClientErrorNotPossible);
    }

    #[test]
    fn test_cancel_unknown_job() {
        let response = call(&service(), job_request(Operation::CancelJob, &CANCEL_JOB_OPERATION, 5));
        assert_eq!(status(&response), StatusCode::ClientErrorNotFound);
    }

    #[test]
    fn test_cancel_job_without_id() {
        let data = encode_request(Operation::CancelJob, 2, vec![operation_group(&CANCEL_JOB_OPERATION)], &[]);
        assert_eq!(status(&call(&service(), data)), StatusCode::ClientErrorBadRequest);
    }

    #[test]
    fn test_send_document() {
        let service = service();
        let job_id = create_job(&service);
        assert_eq!(send_document(&service, job_id, true, b"%PDF"), StatusCode::SuccessfulOk);

        let job = service.backend().job(job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.document.as_deref(), Some(&b"%PDF"[..]));
    }

    #[test]
    fn test_send_document_again_last_empty() {
        let service = service();
        let job_id = print_job(&service, b"first");
        let group = operation_group(&SEND_DOCUMENT_OPERATION)
            .with(attr::JOB_ID, IppValue::Integer(job_id))
            .unwrap()
            .with(attr::LAST_DOCUMENT, IppValue::Boolean(true))
            .unwrap();
        let mut response = call(&service, encode_request(Operation::SendDocument, 3, vec![group], &[]));
        assert_eq!(status(&response), StatusCode::SuccessfulOk);
        let job = response.read_group(&JOB_PRINT_RESPONSE).unwrap();
        assert_eq!(job.get(attr::JOB_ID), Some(&IppValue::Integer(job_id)));
    }

    #[test]
    fn test_send_document_again_rejected() {
        let service = service();
        let job_id = print_job(&service, b"first");
        assert_eq!(
            send_document(&service, job_id, false, b"12345678901234567890"),
            StatusCode::ServerErrorMultipleDocumentJobsNotSupported
        );
        assert_eq!(
            send_document(&service, job_id, true, &[0u8; 200]),
            StatusCode::ServerErrorMultipleDocumentJobsNotSupported
        );
        assert_eq!(
            send_document(&service, job_id, true, &[0u8; NEAR_EMPTY_DOCUMENT_LEN]),
            StatusCode::SuccessfulOk
        );
    }

    #[test]
    fn test_send_document_after_cancel() {
        let service = service();
        let job_id = create_job(&service);
        let response = call(&service, job_request(Operation::CancelJob, &CANCEL_JOB_OPERATION, job_id));
        assert_eq!(status(&response), StatusCode::SuccessfulOk);

        assert_eq!(
            send_document(&service, job_id, true, b"%PDF-1.7"),
            StatusCode::ClientErrorNotPossible
        );
        let job = service.backend().job(job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Canceled);
        assert!(job.document.is_none());
    }

    #[test]
    fn test_send_document_to_completed_job() {
        let service = service();
        let job_id = create_job(&service);
        service.backend().set_status(job_id, JobStatus::Completed).unwrap();

        assert_eq!(
            send_document(&service, job_id, true, b"%PDF-1.7"),
            StatusCode::ClientErrorNotPossible
        );
        assert_eq!(
            service.backend().job(job_id).unwrap().unwrap().status,
            JobStatus::Completed
        );
    }

    // hands documents over to a spooler job with its own numbering
    struct SpoolingBackend(MemoryBackend);

    impl JobBackend for SpoolingBackend {
        type Job = MemoryJob;

        fn create_job(&self, operation: &AttributeGroup, template: &AttributeGroup) -> Result<i32, IppError> {
            self.0.create_job(operation, template)
        }

        fn submit_job(&self, document: &mut dyn Read, operation: &AttributeGroup, job_id: i32) -> Result<i32, IppError> {
            self.0.submit_job(document, operation, job_id)?;
            self.0.set_status(job_id, JobStatus::Processing)?;
            Ok(job_id + 1000)
        }

        fn get_job(&self, job_id: i32) -> Result<Option<JobRecord<MemoryJob>>, IppError> {
            self.0.get_job(job_id)
        }

        fn get_jobs(&self, first: i32, limit: i32, all: bool, exclude: bool) -> Result<Vec<MemoryJob>, IppError> {
            self.0.get_jobs(first, limit, all, exclude)
        }

        fn build_job_attributes(&self, job: &MemoryJob, full: bool) -> Result<AttributeGroup, IppError> {
            self.0.build_job_attributes(job, full)
        }

        fn cancel_job(&self, job: &MemoryJob) -> Result<(), IppError> {
            self.0.cancel_job(job)
        }

        fn get_job_uri(&self, job_id: i32) -> String {
            self.0.get_job_uri(job_id)
        }

        fn get_printer_uri(&self) -> String {
            self.0.get_printer_uri()
        }
    }

    #[test]
    fn test_send_document_describes_target_job() {
        let service = IppService::new(PrinterConfig::default(), SpoolingBackend(MemoryBackend::new(PRINTER_URI)));
        let job_id = service
            .backend()
            .create_job(
                &operation_group(&CREATE_JOB_OPERATION),
                &AttributeGroup::new(&JOB_TEMPLATE),
            )
            .unwrap();

        let group = operation_group(&SEND_DOCUMENT_OPERATION)
            .with(attr::JOB_ID, IppValue::Integer(job_id))
            .unwrap()
            .with(attr::LAST_DOCUMENT, IppValue::Boolean(true))
            .unwrap();
        let data = encode_request(Operation::SendDocument, 100, vec![group], b"%PDF-1.7");
        let response = service.handle_request(io::Cursor::new(data), "/ipp/print");

        let mut response = IppRequest::from_reader(io::Cursor::new(response.to_vec())).unwrap();
        assert_eq!(response.header().status_code(), StatusCode::SuccessfulOk);
        assert_eq!(response.request_id(), 100);
        response.read_group(&BASE_OPERATION).unwrap();
        let job = response.read_group(&JOB_PRINT_RESPONSE).unwrap();
        assert_eq!(job.get(attr::JOB_ID), Some(&IppValue::Integer(job_id)));
        assert_eq!(
            job.get(attr::JOB_URI),
            Some(&IppValue::Uri(format!("{PRINTER_URI}/job/{job_id}")))
        );
        assert_eq!(job.get(attr::JOB_STATE), Some(&IppValue::Enum(JobState::Processing as i32)));
    }

    #[test]
    fn test_send_document_unknown_job() {
        assert_eq!(send_document(&service(), 12, true, b""), StatusCode::ClientErrorNotFound);
    }

    #[test]
    fn test_get_jobs() {
        let service = service();
        let first = print_job(&service, b"a");
        let second = print_job(&service, b"b");
        service.backend().set_status(second, JobStatus::Completed).unwrap();

        let jobs = |which: &str| {
            let group = operation_group(&GET_JOBS_OPERATION)
                .with(attr::WHICH_JOBS, IppValue::Keyword(which.into()))
                .unwrap();
            let mut response = call(&service, encode_request(Operation::GetJobs, 4, vec![group], &[]));
            assert_eq!(status(&response), StatusCode::SuccessfulOk);
            let mut ids = Vec::new();
            while response.has_next() {
                let job = response.read_group(&JOB_OBJECT.relaxed()).unwrap();
                assert!(job.get(attr::JOB_URI).is_some());
                ids.push(job.get(attr::JOB_ID).and_then(IppValue::as_i32).unwrap());
            }
            ids
        };

        assert_eq!(jobs("not-completed"), vec![first]);
        assert_eq!(jobs("completed"), vec![second]);
        assert_eq!(jobs("all"), vec![first, second]);
    }

    #[test]
    fn test_get_jobs_default_attributes() {
        let service = service();
        print_job(&service, b"a");
        let data = encode_request(Operation::GetJobs, 4, vec![operation_group(&GET_JOBS_OPERATION)], &[]);
        let mut response = call(&service, data);

        let job = response.read_group(&JOB_OBJECT_FULL).err();
        // the listing omits required description attributes
        assert!(matches!(job, Some(IppError::ParseError(IppCodecError::MissingField(_)))));
    }

    #[test]
    fn test_get_jobs_requested_attributes() {
        let service = service();
        let job_id = print_job(&service, b"a");
        let group = operation_group(&GET_JOBS_OPERATION)
            .with(attr::REQUESTED_ATTRIBUTES, IppValue::keywords(["job-description"]))
            .unwrap();
        let mut response = call(&service, encode_request(Operation::GetJobs, 4, vec![group], &[]));

        let job = response.read_group(&JOB_OBJECT).unwrap();
        assert_eq!(job.get(attr::JOB_ID), Some(&IppValue::Integer(job_id)));
        assert!(job.contains("job_originating_user_name"));
        assert!(!response.has_next());
    }

    #[test]
    fn test_get_jobs_unsupported_which() {
        let group = operation_group(&GET_JOBS_OPERATION)
            .with(attr::WHICH_JOBS, IppValue::Keyword("fetchable".into()))
            .unwrap();
        let response = call(&service(), encode_request(Operation::GetJobs, 4, vec![group], &[]));
        assert_eq!(status(&response), StatusCode::ClientErrorAttributesOrValuesNotSupported);
    }

    #[test]
    fn test_validate_job() {
        let service = service();
        let group = operation_group(&PRINT_JOB_OPERATION)
            .with(attr::DOCUMENT_FORMAT, IppValue::MimeMediaType("application/pdf".into()))
            .unwrap();
        let response = call(&service, encode_request(Operation::ValidateJob, 8, vec![group], &[]));
        assert_eq!(status(&response), StatusCode::SuccessfulOk);
        assert!(service.backend().job(1).unwrap().is_none());

        let group = operation_group(&PRINT_JOB_OPERATION)
            .with(attr::DOCUMENT_FORMAT, IppValue::MimeMediaType("image/png".into()))
            .unwrap();
        let response = call(&service, encode_request(Operation::ValidateJob, 8, vec![group], &[]));
        assert_eq!(status(&response), StatusCode::ClientErrorDocumentFormatNotSupported);
    }

    #[test]
    fn test_close_job() {
        let service = service();
        let job_id = print_job(&service, b"a");
        let mut response = call(&service, job_request(Operation::CloseJob, &CLOSE_JOB_OPERATION, job_id));
        assert_eq!(status(&response), StatusCode::SuccessfulOk);
        let job = response.read_group(&JOB_PRINT_RESPONSE).unwrap();
        assert_eq!(job.get(attr::JOB_STATE), Some(&IppValue::Enum(JobState::Pending as i32)));
    }

    #[test]
    fn test_identify_printer() {
        let group = operation_group(&IDENTIFY_PRINTER_OPERATION)
            .with("identify_actions", IppValue::keywords(["sound"]))
            .unwrap();
        let response = call(&service(), encode_request(Operation::IdentifyPrinter, 6, vec![group], &[]));
        assert_eq!(status(&response), StatusCode::SuccessfulOk);
        assert_eq!(response.request_id(), 6);
    }

    #[test]
    fn test_malformed_message() {
        let response = service().handle_request(io::Cursor::new(vec![0x02, 0x00, 0x00, 0x0b]), "/");
        let parsed = IppRequest::from_reader(io::Cursor::new(response.to_vec())).unwrap();
        assert_eq!(parsed.header().status_code(), StatusCode::ClientErrorBadRequest);
        assert_eq!(parsed.request_id(), 0);
        assert_eq!(parsed.version(), IppVersion::v2_0());
    }

    fn with_header(header: [u8; 8]) -> Vec<u8> {
        let group = operation_group(&GET_PRINTER_ATTRIBUTES_OPERATION);
        let mut data = encode_request(Operation::GetPrinterAttributes, 1, vec![group], &[]);
        data[..8].copy_from_slice(&header);
        data
    }

    #[test]
    fn test_unknown_operation() {
        let data = encode_request(Operation::HoldJob, 11, vec![AttributeGroup::new(&BASE_OPERATION)], &[]);
        let response = call(&service(), data);
        assert_eq!(status(&response), StatusCode::ServerErrorOperationNotSupported);
        assert_eq!(response.request_id(), 11);

        let response = call(&service(), with_header([0x02, 0x00, 0x12, 0x34, 0, 0, 0, 12]));
        assert_eq!(status(&response), StatusCode::ServerErrorOperationNotSupported);
        assert_eq!(response.request_id(), 12);
    }

    #[test]
    fn test_unsupported_version() {
        let response = call(&service(), with_header([0x02, 0x01, 0x00, 0x0b, 0, 0, 0, 1]));
        assert_eq!(status(&response), StatusCode::ServerErrorVersionNotSupported);
        assert_eq!(response.version(), IppVersion::v2_1());
    }

    #[test]
    fn test_invalid_request_id() {
        let data = with_header([0x02, 0x00, 0x00, 0x0b, 0, 0, 0, 0]);
        let response = call(&service(), data);
        assert_eq!(status(&response), StatusCode::ClientErrorBadRequest);
    }

    #[test]
    fn test_unsupported_charset() {
        let group = operation_group(&GET_PRINTER_ATTRIBUTES_OPERATION)
            .with(attr::ATTRIBUTES_CHARSET, IppValue::Charset("iso-8859-1".into()))
            .unwrap();
        let response = call(&service(), encode_request(Operation::GetPrinterAttributes, 3, vec![group], &[]));
        assert_eq!(status(&response), StatusCode::ClientErrorCharsetNotSupported);
        assert_eq!(response.request_id(), 3);
    }

    #[test]
    fn test_missing_required_attribute() {
        let group = AttributeGroup::new(&GET_PRINTER_ATTRIBUTES_OPERATION);
        let response = call(&service(), encode_request(Operation::GetPrinterAttributes, 3, vec![group], &[]));
        assert_eq!(status(&response), StatusCode::ClientErrorBadRequest);
    }

    struct FailingBackend {
        panic: bool,
    }

    impl FailingBackend {
        fn fail<T>(&self) -> Result<T, IppError> {
            if self.panic {
                panic!("backend exploded");
            }
            Err(IppError::backend(io::Error::new(io::ErrorKind::Other, "database is down")))
        }
    }

    impl JobBackend for FailingBackend {
        type Job = MemoryJob;

        fn create_job(&self, _: &AttributeGroup, _: &AttributeGroup) -> Result<i32, IppError> {
            self.fail()
        }

        fn submit_job(&self, _: &mut dyn Read, _: &AttributeGroup, _: i32) -> Result<i32, IppError> {
            self.fail()
        }

        fn get_job(&self, _: i32) -> Result<Option<JobRecord<MemoryJob>>, IppError> {
            self.fail()
        }

        fn get_jobs(&self, _: i32, _: i32, _: bool, _: bool) -> Result<Vec<MemoryJob>, IppError> {
            self.fail()
        }

        fn build_job_attributes(&self, _: &MemoryJob, _: bool) -> Result<AttributeGroup, IppError> {
            self.fail()
        }

        fn cancel_job(&self, _: &MemoryJob) -> Result<(), IppError> {
            self.fail()
        }

        fn get_job_uri(&self, job_id: i32) -> String {
            format!("{PRINTER_URI}/job/{job_id}")
        }

        fn get_printer_uri(&self) -> String {
            PRINTER_URI.to_owned()
        }
    }

    fn failing_call(panic: bool) -> (StatusCode, AttributeGroup) {
        let service = IppService::new(PrinterConfig::default(), FailingBackend { panic });
        let data = encode_request(
            Operation::GetPrinterAttributes,
            42,
            vec![operation_group(&GET_PRINTER_ATTRIBUTES_OPERATION)],
            &[],
        );
        let response = service.handle_request(io::Cursor::new(data), "/ipp/print");
        let mut parsed = IppRequest::from_reader(io::Cursor::new(response.to_vec())).unwrap();
        assert_eq!(parsed.request_id(), 42);
        let operation = parsed.read_group(&BASE_OPERATION).unwrap();
        (parsed.header().status_code(), operation)
    }

    #[test]
    fn test_backend_error_is_internal() {
        let (status, operation) = failing_call(false);
        assert_eq!(status, StatusCode::ServerErrorInternalError);
        assert_eq!(
            operation.get(attr::STATUS_MESSAGE),
            Some(&IppValue::TextWithoutLanguage("server-error-internal-error".into()))
        );
    }

    #[test]
    fn test_backend_panic_is_internal() {
        let (status, _) = failing_call(true);
        assert_eq!(status, StatusCode::ServerErrorInternalError);
    }
}
