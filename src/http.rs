// Minimal HTTP/1.x request head reader.
// Only the request line and headers matter here; request bodies are ignored.

use std::io;
use std::str;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Maximum request head size (16KB)
pub const MAX_REQUEST_SIZE: usize = 16 * 1024;

const READ_CHUNK: usize = 4096;

#[derive(Debug)]
pub struct RequestHead<'a> {
    pub method: &'a str,
    pub target: &'a str,
    pub version: &'a str,
    /// Request line and header lines exactly as received, without the
    /// terminating blank line
    pub raw: &'a str,
    pub headers: Vec<(&'a str, &'a str)>,
}

impl<'a> RequestHead<'a> {
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    Incomplete,
    Invalid,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `buf` holds a complete request head
    Ready,
    /// Peer closed before finishing the head
    Closed,
    TooLarge,
}

/// Offset just past the blank line ending the head. Accepts CRLF and bare LF.
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.iter().enumerate().find_map(|(i, &b)| {
        if b != b'\n' {
            return None;
        }
        match &buf[i + 1..] {
            [b'\n', ..] => Some(i + 2),
            [b'\r', b'\n', ..] => Some(i + 3),
            _ => None,
        }
    })
}

/// Parse HTTP request head from buffer
/// Returns Ok(request, body_offset) or Err
pub fn parse_request(buf: &[u8]) -> Result<(RequestHead<'_>, usize), ParseError> {
    let head_end = find_head_end(buf).ok_or(ParseError::Incomplete)?;
    let s = str::from_utf8(&buf[..head_end]).map_err(|_| ParseError::Invalid)?;
    let raw = s.trim_end_matches(['\r', '\n']);

    let mut lines = raw.lines();

    // Parse request line
    let request_line = lines.next().ok_or(ParseError::Invalid)?;
    let mut parts = request_line.split_whitespace();

    let method = parts.next().ok_or(ParseError::Invalid)?;
    let target = parts.next().ok_or(ParseError::Invalid)?;
    let version = parts.next().ok_or(ParseError::Invalid)?;

    if parts.next().is_some() || !is_token(method) || !version.starts_with("HTTP/") {
        return Err(ParseError::Invalid);
    }

    // Parse headers
    let mut headers = Vec::new();
    for line in lines {
        if let Some(colon_pos) = line.find(':') {
            let name = &line[..colon_pos];
            let value = line[colon_pos + 1..].trim();
            headers.push((name, value));
        }
    }

    Ok((
        RequestHead {
            method,
            target,
            version,
            raw,
            headers,
        },
        head_end,
    ))
}

/// Read from `reader` into `buf` until a full request head is buffered.
pub async fn read_request_head<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<ReadOutcome>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        if find_head_end(buf).is_some() {
            return Ok(ReadOutcome::Ready);
        }
        if buf.len() >= MAX_REQUEST_SIZE {
            return Ok(ReadOutcome::TooLarge);
        }

        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(ReadOutcome::Closed);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
