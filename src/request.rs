use std::collections::HashMap;

use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::error::{IngestError, IngestResult};
use crate::form::parse_form;
use crate::multipart::{extract_boundary, MULTIPART_MARKER};
use crate::util::{decode_lossy, CRLF};

/// Field name to ordered values, as produced by query strings and form bodies.
pub type FormMap = HashMap<String, Vec<String>>;

/// Field name to the raw payload of the last part with that name.
pub type PartMap = HashMap<String, Bytes>;

/// A decoded request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// `application/x-www-form-urlencoded`: every value of a repeated key is kept.
    Form(FormMap),
    /// `multipart/form-data`: a repeated field name keeps only its last part.
    Multipart(PartMap),
}

// One HTTP request, owned by the connection that read it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub version: String,
    pub query: FormMap,
    pub content_type: Option<String>,
    pub content_length: Option<usize>,
    pub boundary: Option<String>,
    pub body: Option<Body>,
}

impl Request {
    /// GET requests never carry a body worth reading.
    pub fn expects_body(&self) -> bool {
        self.method != "GET"
    }

    pub fn is_multipart(&self) -> bool {
        self.boundary.is_some()
    }
}

/*
Parses the header block (everything before the blank line) into a Request.

The block is decoded permissively, split on CRLF, and the first line is taken as
the request line. For GET the header fields are not even looked at. For any other
method both Content-Type and Content-Length must turn up, otherwise the request is
rejected before a single body byte is read.
*/
pub fn parse_head(header: &[u8]) -> IngestResult<Request> {
    let text = decode_lossy(header);
    let mut lines = text.split(CRLF);

    let request_line = lines.next().unwrap_or_default();
    let mut request = parse_request_line(request_line)?;

    if !request.expects_body() {
        debug!("request method is GET");
        return Ok(request);
    }

    parse_headers(lines, &mut request)?;
    Ok(request)
}

// METHOD TARGET VERSION, exactly three whitespace-separated tokens.
pub fn parse_request_line(line: &str) -> IngestResult<Request> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [method, target, version] = parts[..] else {
        return Err(IngestError::MalformedRequestLine(line.to_string()));
    };

    let (path, query) = split_target(target);
    return Ok(Request {
        method: method.to_string(),
        path,
        version: version.to_string(),
        query: parse_form(query.as_bytes()),
        ..Request::default()
    });
}

/*
Splits a request-target into its path and raw query string.

Origin-form ("/search?q=cat#top") is cut at '#' and then at the first '?'. The path
is kept exactly as sent. Absolute-form ("http://host/search?q=cat") is handed to
`url::Url` and its path and query components are used.
*/
fn split_target(target: &str) -> (String, String) {
    if target.contains("://") {
        if let Ok(url) = Url::parse(target) {
            return (
                url.path().to_string(),
                url.query().unwrap_or_default().to_string(),
            );
        }
    }

    let target = target.split('#').next().unwrap_or_default();
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (target.to_string(), String::new()),
    }
}

fn parse_headers<'a>(
    lines: impl Iterator<Item = &'a str>,
    request: &mut Request,
) -> IngestResult<()> {
    for line in lines {
        if let Some(value) = header_value(line, "Content-Type:") {
            if value.contains(MULTIPART_MARKER) {
                let (media_type, boundary) = extract_boundary(value)?;
                debug!(%media_type, %boundary, "multipart boundary");
                request.content_type = Some(media_type);
                request.boundary = Some(boundary);
            } else {
                request.content_type = Some(value.to_string());
                request.boundary = None;
            }
        } else if let Some(value) = header_value(line, "Content-Length:") {
            let length = value
                .parse::<usize>()
                .map_err(|_| IngestError::MalformedContentLength(value.to_string()))?;
            request.content_length = Some(length);
        }
    }

    if request.content_type.is_none() || request.content_length.is_none() {
        return Err(IngestError::MissingBodyMetadata {
            method: request.method.clone(),
        });
    }
    Ok(())
}

// Trimmed value of `line` when it starts with `name` (which includes the colon).
fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    line.strip_prefix(name).map(str::trim)
}
