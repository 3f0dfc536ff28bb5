//!
//! Command-line utility to run IPP requests through the engine or query its printer
//!
use std::{
    fs,
    io::{self, BufReader, Read, Write},
    path::PathBuf,
};

use clap::Parser;
use log::{debug, info};

use ipp_engine::{
    operation::{BASE_OPERATION, GET_PRINTER_ATTRIBUTES_OPERATION, PRINTER_ATTRIBUTES},
    prelude::*,
    util::to_wire_name,
};

fn new_service(params: &PrinterParams) -> IppService<MemoryBackend> {
    let config = PrinterConfig {
        name: params.name.clone(),
        uri: params.uri.clone(),
        uuid: params.uuid.clone(),
        info: params.info.clone(),
        location: params.location.clone(),
        make_and_model: params.make_and_model.clone(),
        color: params.color,
        duplex: params.duplex,
        tls: params.tls,
        basic_auth: params.basic_auth,
        icon_uri: params.icon_uri.clone(),
        info_uri: params.info_uri.clone(),
        supported_formats: params.formats.clone(),
        default_format: params
            .formats
            .first()
            .cloned()
            .unwrap_or_else(|| "application/octet-stream".to_owned()),
    };
    debug!("Printer configuration: {config:?}");
    IppService::new(config, MemoryBackend::new(params.uri.clone()))
}

fn do_handle(params: &PrinterParams, cmd: IppHandleCmd) -> Result<(), Box<dyn std::error::Error>> {
    let service = new_service(params);

    let input: Box<dyn Read> = match cmd.input {
        Some(ref filename) => Box::new(BufReader::new(fs::File::open(filename)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let response = service.handle_request(input, &cmd.path);
    info!("Response: {} bytes, {}", response.len(), IPP_CONTENT_TYPE);

    match cmd.output {
        Some(ref filename) => fs::write(filename, &response)?,
        None => io::stdout().write_all(&response)?,
    }
    Ok(())
}

fn do_probe(params: &PrinterParams, cmd: IppProbeCmd) -> Result<(), Box<dyn std::error::Error>> {
    let service = new_service(params);

    let mut operation = AttributeGroup::new(&GET_PRINTER_ATTRIBUTES_OPERATION)
        .with(attr::PRINTER_URI, IppValue::Uri(params.uri.clone()))?;
    if !cmd.attributes.is_empty() {
        operation.set(attr::REQUESTED_ATTRIBUTES, IppValue::keywords(cmd.attributes.iter().cloned()))?;
    }
    if let Some(format) = cmd.format {
        operation.set(attr::DOCUMENT_FORMAT, IppValue::MimeMediaType(format))?;
    }

    let request = IppResponse::new(IppVersion::v2_0(), Operation::GetPrinterAttributes as u16, 1).with_group(operation);
    let response = service.handle_request(io::Cursor::new(request.to_bytes()?), &cmd.path);

    let mut response = IppRequest::from_reader(io::Cursor::new(response))?;
    let status = response.header().status_code();
    response.read_group(&BASE_OPERATION)?;
    if !status.is_success() {
        return Err(format!("printer returned {status}").into());
    }

    let printer = response.read_group(&PRINTER_ATTRIBUTES.relaxed())?;
    for (name, value) in printer.values() {
        println!("{}: {}", to_wire_name(name), value);
    }
    Ok(())
}

#[derive(Parser)]
#[clap(about = "IPP engine utility", name = "ipputil", rename_all = "kebab-case")]
struct PrinterParams {
    #[clap(long = "name", global = true, env = "IPP_PRINTER_NAME", default_value = "ipp-engine", help = "Printer name")]
    name: String,

    #[clap(
        long = "uri",
        global = true,
        env = "IPP_PRINTER_URI",
        default_value = "ipp://localhost:631/ipp/print",
        help = "Printer URI"
    )]
    uri: String,

    #[clap(
        long = "uuid",
        global = true,
        env = "IPP_PRINTER_UUID",
        default_value = "urn:uuid:12345678-9abc-def0-1234-56789abcdef0",
        help = "Printer and device UUID"
    )]
    uuid: String,

    #[clap(long = "info", global = true, env = "IPP_PRINTER_INFO", help = "Printer description")]
    info: Option<String>,

    #[clap(long = "location", global = true, env = "IPP_PRINTER_LOCATION", help = "Printer location")]
    location: Option<String>,

    #[clap(long = "make-and-model", global = true, env = "IPP_PRINTER_MAKE_AND_MODEL", help = "Printer make and model")]
    make_and_model: Option<String>,

    #[clap(long = "color", global = true, env = "IPP_PRINTER_COLOR", help = "Advertise color printing")]
    color: bool,

    #[clap(long = "duplex", global = true, env = "IPP_PRINTER_DUPLEX", help = "Advertise two-sided printing")]
    duplex: bool,

    #[clap(long = "tls", global = true, env = "IPP_PRINTER_TLS", help = "Advertise TLS security")]
    tls: bool,

    #[clap(long = "basic-auth", global = true, env = "IPP_PRINTER_BASIC_AUTH", help = "Advertise basic authentication")]
    basic_auth: bool,

    #[clap(long = "icon-uri", global = true, env = "IPP_PRINTER_ICON", help = "Printer icon URI")]
    icon_uri: Option<String>,

    #[clap(long = "info-uri", global = true, env = "IPP_PRINTER_INFO_URI", help = "Printer web page URI")]
    info_uri: Option<String>,

    #[clap(
        long = "format",
        global = true,
        env = "IPP_PRINTER_FORMATS",
        value_delimiter = ',',
        default_value = "application/pdf",
        help = "Supported document formats, the first one is the default"
    )]
    formats: Vec<String>,

    #[clap(subcommand)]
    command: IppCommand,
}

#[derive(Parser)]
enum IppCommand {
    #[clap(name = "handle", about = "Handle a raw IPP request and write the raw response")]
    Handle(IppHandleCmd),
    #[clap(name = "probe", about = "Query the printer attributes served by the engine")]
    Probe(IppProbeCmd),
}

#[derive(Parser, Clone)]
#[clap(rename_all = "kebab-case")]
struct IppHandleCmd {
    #[clap(long = "input", short = 'f', help = "Request file [default: standard input]")]
    input: Option<PathBuf>,

    #[clap(long = "output", short = 'o', help = "Response file [default: standard output]")]
    output: Option<PathBuf>,

    #[clap(long = "path", short = 'p', default_value = "/ipp/print", help = "Logical request path")]
    path: String,
}

#[derive(Parser, Clone)]
#[clap(rename_all = "kebab-case")]
struct IppProbeCmd {
    #[clap(long = "attribute", short = 'a', help = "Attributes to query, default is to get all")]
    attributes: Vec<String>,

    #[clap(long = "document-format", short = 'd', help = "Document format to check")]
    format: Option<String>,

    #[clap(long = "path", short = 'p', default_value = "/ipp/print", help = "Logical request path")]
    path: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let params = PrinterParams::parse();

    match params.command {
        IppCommand::Handle(ref cmd) => do_handle(&params, cmd.clone())?,
        IppCommand::Probe(ref cmd) => do_probe(&params, cmd.clone())?,
    }
    Ok(())
}
