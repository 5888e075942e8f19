//! Audit record rendering.
//!
//! # Record Layout
//! ```text
//! 127.0.0.1 - - [18/Oct/2026:09:15:02 +0000] "GET /items HTTP/1.1" 200 12
//! Header:
//! Host: localhost:8080
//! Accept: */*
//! Response header:
//! Content-Type: application/json
//! Response body:
//! {"ok":true}
//! ```
//!
//! `Body:` and `Response body:` sections appear only for non-empty bodies.
//! Bodies are copied as raw bytes; nothing is re-encoded.

use std::io::{self, Write};

use axum::http::{HeaderMap, Uri, Version};

use crate::capture::LogRecord;

/// Timestamp layout of the summary line.
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Renders finished exchanges as human-readable audit records.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditFormatter;

impl AuditFormatter {
    /// Render a record into a fresh buffer.
    pub fn render(&self, record: &LogRecord<'_>) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            256 + record.request.body().len() + record.response.body().len(),
        );
        // Writing into a Vec cannot fail.
        let _ = self.write(&mut out, record);
        out
    }

    /// Write a record to `w`.
    pub fn write<W: Write>(&self, w: &mut W, record: &LogRecord<'_>) -> io::Result<()> {
        let request = record.request;
        let response = record.response;

        writeln!(
            w,
            "{} - {} [{}] \"{} {} {}\" {} {}",
            request.remote_addr().ip(),
            request.user().unwrap_or("-"),
            record.timestamp.format(TIMESTAMP_FORMAT),
            request.method(),
            request_uri(request.uri()),
            protocol(request.version()),
            response.status().as_u16(),
            response.size(),
        )?;

        writeln!(w, "Header:")?;
        write_headers(w, request.headers())?;

        if !request.body().is_empty() {
            writeln!(w, "Body:")?;
            w.write_all(request.body())?;
            writeln!(w)?;
        }

        writeln!(w, "Response header: ")?;
        write_headers(w, response.headers())?;

        if !response.body().is_empty() {
            writeln!(w, "Response body:")?;
            w.write_all(response.body())?;
            writeln!(w)?;
        }

        Ok(())
    }
}

fn write_headers<W: Write>(w: &mut W, headers: &HeaderMap) -> io::Result<()> {
    for (name, value) in headers {
        w.write_all(canonical_name(name.as_str()).as_bytes())?;
        w.write_all(b": ")?;
        w.write_all(value.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// `content-type` → `Content-Type`.
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// Origin-form target of the request (path plus query).
fn request_uri(uri: &Uri) -> &str {
    match uri.path_and_query().map(|pq| pq.as_str()) {
        Some(pq) if !pq.is_empty() => pq,
        _ => "/",
    }
}

fn protocol(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}
