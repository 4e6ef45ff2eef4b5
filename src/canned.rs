use bytes::Bytes;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the pseudo-header carrying the status code and reason phrase.
pub const STATUS_FIELD: &str = "Status";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read response file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed header on line {line}: {reason}")]
    MalformedHeader { line: usize, reason: &'static str },
    #[error("response file has no `Status` field")]
    MissingStatus,
    #[error("`Status` code {0:?} is not an integer between 100 and 999")]
    InvalidStatusCode(String),
    #[error("`Status: {0}` has no reason phrase")]
    MissingReason(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A pre-recorded response, played back unchanged for every request.
///
/// Built once at startup. `headers` keeps the file's order, spelling and
/// duplicates, minus the `Status` pseudo-header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedResponse {
    pub status_code: u16,
    pub status_reason: String,
    pub headers: Vec<Header>,
    pub body: Bytes,
}

impl CannedResponse {
    /// Read and parse a response file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let raw = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Parse an RFC-822 style message: `Name: value` lines, a blank line,
    /// then the raw body.
    pub fn parse(raw: &[u8]) -> Result<Self, LoadError> {
        let (lines, body) = split_message(raw);

        let mut fields: Vec<Header> = Vec::with_capacity(lines.len());
        for (idx, line) in lines.into_iter().enumerate() {
            let line_no = idx + 1;
            let line = std::str::from_utf8(line).map_err(|_| LoadError::MalformedHeader {
                line: line_no,
                reason: "header block is not valid UTF-8",
            })?;

            // Folded continuation of the previous field
            if line.starts_with([' ', '\t']) {
                let Some(last) = fields.last_mut() else {
                    return Err(LoadError::MalformedHeader {
                        line: line_no,
                        reason: "continuation line before any header",
                    });
                };
                let folded = line.trim();
                if !folded.is_empty() {
                    if !last.value.is_empty() {
                        last.value.push(' ');
                    }
                    last.value.push_str(folded);
                }
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(LoadError::MalformedHeader {
                    line: line_no,
                    reason: "expected `Name: value`",
                });
            };
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic()) {
                return Err(LoadError::MalformedHeader {
                    line: line_no,
                    reason: "invalid header name",
                });
            }
            fields.push(Header::new(name, value.trim()));
        }

        let status = fields
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(STATUS_FIELD))
            .ok_or(LoadError::MissingStatus)?;
        let (status_code, status_reason) = parse_status(&status.value)?;

        fields.retain(|h| !h.name.eq_ignore_ascii_case(STATUS_FIELD));

        Ok(Self {
            status_code,
            status_reason,
            headers: fields,
            body: Bytes::copy_from_slice(body),
        })
    }
}

/// Split into header lines (line endings stripped) and the body that
/// follows the first empty line. Without an empty line the body is empty.
fn split_message(raw: &[u8]) -> (Vec<&[u8]>, &[u8]) {
    let mut lines = Vec::new();
    let mut rest = raw;

    while !rest.is_empty() {
        let (line, next) = match rest.iter().position(|&b| b == b'\n') {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, &rest[rest.len()..]),
        };
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            return (lines, next);
        }
        lines.push(line);
        rest = next;
    }

    (lines, rest)
}

/// `<code> <reason phrase>`; the reason may contain spaces.
fn parse_status(value: &str) -> Result<(u16, String), LoadError> {
    let value = value.trim();
    let (code, reason) = match value.split_once(char::is_whitespace) {
        Some((code, reason)) => (code, reason.trim_start()),
        None => (value, ""),
    };

    let status_code = code
        .parse::<u16>()
        .ok()
        .filter(|c| (100..=999).contains(c))
        .ok_or_else(|| LoadError::InvalidStatusCode(code.to_string()))?;

    if reason.is_empty() {
        return Err(LoadError::MissingReason(status_code));
    }

    Ok((status_code, reason.to_string()))
}

impl fmt::Display for CannedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{STATUS_FIELD}: {} {}", self.status_code, self.status_reason)?;
        for header in &self.headers {
            writeln!(f, "{}: {}", header.name, header.value)?;
        }
        writeln!(f)?;
        write!(f, "{}", String::from_utf8_lossy(&self.body))
    }
}
