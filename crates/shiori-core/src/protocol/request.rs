//! SHIORI request parsing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ShioriError, ShioriResult};

/// Highest `Reference<N>` index placed into the reference list.
/// Larger indices are kept as plain headers so one line cannot force a huge allocation.
pub const MAX_REFERENCE_INDEX: usize = 255;

/// A parsed SHIORI request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub version: String,
    /// Value of the `ID` header; empty when absent.
    pub event: String,
    /// `Reference0..N`; unset positions below the highest seen index are empty strings.
    pub references: Vec<String>,
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Parse raw request text. Only an unusable first line is an error.
    pub fn parse(raw: &str) -> ShioriResult<Self> {
        let mut lines = raw.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));

        let first = lines.next().unwrap_or_default();
        let (method, version) = split_request_line(first)?;

        let mut request = Request {
            method: method.to_string(),
            version: version.to_string(),
            ..Default::default()
        };

        for line in lines {
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            if key == "ID" {
                request.event = value.to_string();
            } else if let Some(index) = reference_index(key) {
                if request.references.len() <= index {
                    request.references.resize(index + 1, String::new());
                }
                request.references[index] = value.to_string();
            } else {
                request.headers.insert(key.to_string(), value.to_string());
            }
        }

        Ok(request)
    }

    /// Reference at `index`, or empty string.
    pub fn reference(&self, index: usize) -> &str {
        self.references.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

fn split_request_line(line: &str) -> ShioriResult<(&str, &str)> {
    let line = line.trim();
    let (method, version) = line
        .split_once(' ')
        .ok_or_else(|| ShioriError::MalformedRequest(format!("bad request line: {:?}", line)))?;
    let version = version.trim();
    if method.is_empty() || version.is_empty() || version.contains(char::is_whitespace) {
        return Err(ShioriError::MalformedRequest(format!("bad request line: {:?}", line)));
    }
    Ok((method, version))
}

/// `Reference<N>` with N a plain non-negative integer within [`MAX_REFERENCE_INDEX`].
fn reference_index(key: &str) -> Option<usize> {
    let digits = key.strip_prefix("Reference")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok().filter(|n| *n <= MAX_REFERENCE_INDEX)
}

/// Build request text for `event` with positional references.
pub fn build_request(event: &str, references: &[&str]) -> String {
    let mut request = format!("GET SHIORI/3.0\r\nID: {}\r\n", event);
    for (i, reference) in references.iter().enumerate() {
        request.push_str(&format!("Reference{}: {}\r\n", i, reference));
    }
    request.push_str("\r\n");
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_request() {
        let req = Request::parse("GET SHIORI/3.0\r\nID: OnBoot\r\nReference0: a\r\n\r\n").unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.version, "SHIORI/3.0");
        assert_eq!(req.event, "OnBoot");
        assert_eq!(req.references, vec!["a".to_string()]);
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_sparse_references_fill_with_empty() {
        let req = Request::parse("GET SHIORI/3.0\nReference2: head\nReference0: 10\n").unwrap();
        assert_eq!(req.references, vec!["10", "", "head"]);
        assert_eq!(req.reference(1), "");
        assert_eq!(req.reference(7), "");
    }

    #[test]
    fn test_value_split_on_first_colon_and_last_header_wins() {
        let raw = "NOTIFY SHIORI/3.0\r\nSender: a\r\nCharset: UTF-8\r\nSender: http://x:80/\r\n";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.header("Sender"), Some("http://x:80/"));
        assert_eq!(req.header("Charset"), Some("UTF-8"));
    }

    #[test]
    fn test_lines_without_colon_are_ignored() {
        let req = Request::parse("GET SHIORI/3.0\r\ngarbage line\r\nID: OnRandom\r\n").unwrap();
        assert_eq!(req.event, "OnRandom");
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_non_numeric_reference_suffix_is_plain_header() {
        let req = Request::parse("GET SHIORI/3.0\r\nReferenceX: 1\r\nReference: 2\r\nReference999: 3\r\n").unwrap();
        assert!(req.references.is_empty());
        assert_eq!(req.header("ReferenceX"), Some("1"));
        assert_eq!(req.header("Reference"), Some("2"));
        assert_eq!(req.header("Reference999"), Some("3"));
    }

    #[test]
    fn test_malformed_first_line() {
        assert!(matches!(Request::parse(""), Err(ShioriError::MalformedRequest(_))));
        assert!(matches!(Request::parse("\r\nID: OnBoot\r\n"), Err(ShioriError::MalformedRequest(_))));
        assert!(matches!(Request::parse("GET\r\n"), Err(ShioriError::MalformedRequest(_))));
        assert!(matches!(Request::parse("GET SHIORI/3.0 extra\r\n"), Err(ShioriError::MalformedRequest(_))));
    }

    #[test]
    fn test_build_request_parses_back() {
        let raw = build_request("OnMouseClick", &["120", "", "head"]);
        assert!(raw.ends_with("\r\n\r\n"));
        let req = Request::parse(&raw).unwrap();
        assert_eq!(req.event, "OnMouseClick");
        assert_eq!(req.references, vec!["120", "", "head"]);
    }
}
