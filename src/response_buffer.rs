use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::SystemTime;

use crate::canned::CannedResponse;

/// Value of the `Server` header sent ahead of the canned headers.
pub const SERVER_NAME: &str = concat!("asis/", env!("CARGO_PKG_VERSION"));

/// Protocol on the status line. Every response ends with connection close.
const HTTP_VERSION: &str = "HTTP/1.0";

/// Format a timestamp as an IMF-fixdate for the `Date` header
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Complete HTTP response, ready to write to the socket as-is
#[derive(Debug, Clone)]
pub struct ResponseBuffer {
    /// Status line + headers + \r\n + body
    pub buffer: Bytes,
}

impl ResponseBuffer {
    /// Status line and header block of the canned response, no body.
    pub fn head(resp: &CannedResponse, date: &str) -> Self {
        let mut buf = Vec::with_capacity(head_capacity(resp));
        write_head(
            &mut buf,
            resp.status_code,
            &resp.status_reason,
            resp.headers
                .iter()
                .map(|h| (h.name.as_str(), h.value.as_str())),
            date,
        );
        Self {
            buffer: Bytes::from(buf),
        }
    }

    /// Head followed by the canned body bytes, unmodified.
    pub fn full(resp: &CannedResponse, date: &str) -> Self {
        let mut buf = Vec::with_capacity(head_capacity(resp) + resp.body.len());
        write_head(
            &mut buf,
            resp.status_code,
            &resp.status_reason,
            resp.headers
                .iter()
                .map(|h| (h.name.as_str(), h.value.as_str())),
            date,
        );
        buf.extend_from_slice(&resp.body);
        Self {
            buffer: Bytes::from(buf),
        }
    }

    /// Build a response from scratch, used for the stock error pages
    pub fn new(
        status_code: u16,
        status_text: &str,
        headers: &[(&str, &str)],
        body: &[u8],
        date: &str,
    ) -> Self {
        let mut buf = Vec::with_capacity(256 + body.len());
        write_head(
            &mut buf,
            status_code,
            status_text,
            headers.iter().copied(),
            date,
        );
        buf.extend_from_slice(body);
        Self {
            buffer: Bytes::from(buf),
        }
    }

    /// Build 400 response
    pub fn bad_request(date: &str) -> Self {
        error_page(400, "Bad Request", "Bad request syntax", date)
    }

    /// Build 501 response
    pub fn not_implemented(method: &str, date: &str) -> Self {
        let message = format!("Unsupported method ({method:?})");
        error_page(501, "Not Implemented", &message, date)
    }
}

/// The canned response serialized once, at startup. Every GET gets the same
/// bytes, every HEAD the same head; `Date` is the time the buffers were baked.
#[derive(Debug, Clone)]
pub struct Playback {
    pub get: ResponseBuffer,
    pub head: ResponseBuffer,
}

impl Playback {
    pub fn new(resp: &CannedResponse, date: &str) -> Self {
        Self {
            get: ResponseBuffer::full(resp, date),
            head: ResponseBuffer::head(resp, date),
        }
    }

    /// GET plays back the whole response, HEAD only its head. Other methods
    /// get the stock 501, dated `now`.
    pub fn for_method(&self, method: &str, now: &str) -> ResponseBuffer {
        match method {
            "GET" => self.get.clone(),
            "HEAD" => self.head.clone(),
            other => ResponseBuffer::not_implemented(other, now),
        }
    }
}

fn head_capacity(resp: &CannedResponse) -> usize {
    128 + resp
        .headers
        .iter()
        .map(|h| h.name.len() + h.value.len() + 4)
        .sum::<usize>()
}

fn write_head<'a>(
    buf: &mut Vec<u8>,
    status_code: u16,
    status_text: &str,
    headers: impl Iterator<Item = (&'a str, &'a str)>,
    date: &str,
) {
    // Status line
    buf.extend_from_slice(HTTP_VERSION.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(status_code.to_string().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(status_text.as_bytes());
    buf.extend_from_slice(b"\r\n");

    write_header(buf, "Server", SERVER_NAME);
    write_header(buf, "Date", date);

    for (name, value) in headers {
        write_header(buf, name, value);
    }

    // End of headers
    buf.extend_from_slice(b"\r\n");
}

#[inline]
fn write_header(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

fn error_page(status_code: u16, status_text: &str, message: &str, date: &str) -> ResponseBuffer {
    let body = format!(
        "<html><head><title>Error response</title></head>\n\
         <body><h1>Error response</h1>\n\
         <p>Error code {status_code}.</p>\n\
         <p>Message: {message}.</p></body></html>\n"
    );
    let content_length = body.len().to_string();
    ResponseBuffer::new(
        status_code,
        status_text,
        &[
            ("Content-Type", "text/html"),
            ("Content-Length", &content_length),
            ("Connection", "close"),
        ],
        body.as_bytes(),
        date,
    )
}
