use crate::settings::app_settings::Settings;
use color_eyre::{eyre, Report};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt;
use url::Url;

/// Characters escaped when a content identifier is placed in a URL path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Server address every request is built from.
///
/// Resolved once at startup and never changed afterwards. The value has no
/// trailing slash, so paths are appended with a plain `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseAddress(String);

impl BaseAddress {
    /// Development mode targets the loopback dev server, otherwise the
    /// configured origin the application is served from
    pub fn resolve(settings: &Settings) -> eyre::Result<Self> {
        if settings.dev_mode {
            return Self::parse(&settings.dev_address);
        }
        match settings.origin.as_deref() {
            Some(origin) => Self::parse(origin),
            None => Err(Report::msg(
                "No server origin configured: set `origin` in config.toml, NETDROP_ORIGIN, or pass --origin",
            )),
        }
    }

    pub fn parse(address: &str) -> eyre::Result<Self> {
        let url = Url::parse(address.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Report::msg(format!("Unsupported scheme in server address: {}", address)));
        }
        if url.host_str().is_none() {
            return Err(Report::msg(format!("Server address has no host: {}", address)));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(Report::msg(format!(
                "Server address must not carry a query or fragment: {}",
                address
            )));
        }
        Ok(BaseAddress(url.as_str().trim_end_matches('/').to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn upload_endpoint(&self) -> String {
        format!("{}/api/v1/upload", self.0)
    }

    pub fn download_url(&self, file_hash: &str) -> String {
        format!("{}/download/{}", self.0, utf8_percent_encode(file_hash, PATH_SEGMENT))
    }
}

impl fmt::Display for BaseAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
