//! SHIORI response formatting.

use serde::{Deserialize, Serialize};

use crate::error::{ShioriError, ShioriResult};

pub const STATUS_OK: u16 = 200;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// A SHIORI response: status plus headers in output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// 200 with the `Value`/`Surface`/`Event` triple.
    pub fn talk(value: impl Into<String>, surface: impl Into<String>, event: impl Into<String>) -> Self {
        Self::new(STATUS_OK)
            .with_header("Value", value)
            .with_header("Surface", surface)
            .with_header("Event", event)
    }

    pub fn no_content() -> Self {
        Self::new(STATUS_NO_CONTENT)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(STATUS_INTERNAL_ERROR).with_header("Error", message)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn value(&self) -> Option<&str> {
        self.header("Value")
    }

    pub fn to_wire(&self) -> String {
        format_response(self.status, &self.headers)
    }

    /// Parse response text produced by an engine. Used by hosts to read `Value`/`Surface`.
    pub fn parse(raw: &str) -> ShioriResult<Self> {
        let mut lines = raw.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));
        let status_line = lines.next().unwrap_or_default().trim();
        let status = status_line
            .split_once(' ')
            .and_then(|(_, code)| code.trim().parse::<u16>().ok())
            .ok_or_else(|| ShioriError::MalformedRequest(format!("bad status line: {:?}", status_line)))?;

        let mut response = Response::new(status);
        for line in lines {
            if let Some((key, value)) = line.split_once(':') {
                response.headers.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        Ok(response)
    }
}

/// Render `SHIORI/3.0 <status>`, one `Key: Value` line per header in order, then a blank line.
/// Values are written as-is; callers keep CRLF out of them.
pub fn format_response(status: u16, headers: &[(String, String)]) -> String {
    let mut out = format!("SHIORI/3.0 {}\r\n", status);
    for (key, value) in headers {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out
}
