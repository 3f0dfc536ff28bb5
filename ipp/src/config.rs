//!
//! Printer configuration
//!

/// Static description of the printer served by [`IppService`](crate::service::IppService)
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
    pub name: String,
    pub uri: String,
    /// `urn:uuid:` URI used for both printer and device uuid
    pub uuid: String,
    pub info: Option<String>,
    pub location: Option<String>,
    pub make_and_model: Option<String>,
    pub color: bool,
    pub duplex: bool,
    /// Advertise TLS in `uri-security-supported`
    pub tls: bool,
    /// Advertise basic authentication in `uri-authentication-supported`
    pub basic_auth: bool,
    pub icon_uri: Option<String>,
    pub info_uri: Option<String>,
    pub supported_formats: Vec<String>,
    pub default_format: String,
}

impl PrinterConfig {
    pub fn is_format_supported(&self, format: &str) -> bool {
        self.supported_formats.iter().any(|f| f.eq_ignore_ascii_case(format))
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        PrinterConfig {
            name: "ipp-engine".to_owned(),
            uri: "ipp://localhost:631/ipp/print".to_owned(),
            uuid: "urn:uuid:12345678-9abc-def0-1234-56789abcdef0".to_owned(),
            info: None,
            location: None,
            make_and_model: None,
            color: false,
            duplex: false,
            tls: false,
            basic_auth: false,
            icon_uri: None,
            info_uri: None,
            supported_formats: vec!["application/pdf".to_owned()],
            default_format: "application/pdf".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_check() {
        let config = PrinterConfig::default();
        assert!(config.is_format_supported("application/pdf"));
        assert!(config.is_format_supported("Application/PDF"));
        assert!(!config.is_format_supported("application/octet-stream"));
    }
}
