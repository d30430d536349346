use std::io::Read;

use bytes::Bytes;
use tracing::debug;

use crate::error::{IngestError, IngestResult};
use crate::form::{parse_form, FORM_URLENCODED};
use crate::multipart::{parse_multipart, MULTIPART_FORM_DATA};
use crate::reader::read_body;
use crate::request::{Body, Request};

/// Limits for reading a request body.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub chunk_size: usize,
    pub max_body_size: usize,
}

/*
Reads the rest of the body and decodes it into `request.body`.

`prefix` holds whatever the header read already pulled past the blank line; it
counts toward Content-Length. The declared length is checked against the limit
before anything else is read from the connection.
*/
pub fn resolve_body<R: Read>(
    reader: &mut R,
    request: &mut Request,
    prefix: Vec<u8>,
    limits: BodyLimits,
) -> IngestResult<()> {
    let (Some(length), Some(_)) = (request.content_length, request.content_type.as_ref()) else {
        return Err(IngestError::MissingBodyMetadata {
            method: request.method.clone(),
        });
    };

    if length > limits.max_body_size {
        return Err(IngestError::BodyTooLarge {
            length,
            limit: limits.max_body_size,
        });
    }

    let raw = read_body(reader, prefix, length, limits.chunk_size)?;
    debug!(len = raw.len(), "read request body");

    request.body = decode_body(request, Bytes::from(raw));
    Ok(())
}

/// Picks a decoder from the content type. Unknown types are left undecoded.
pub fn decode_body(request: &Request, raw: Bytes) -> Option<Body> {
    match (request.content_type.as_deref(), request.boundary.as_deref()) {
        (Some(FORM_URLENCODED), _) => Some(Body::Form(parse_form(&raw))),
        (Some(MULTIPART_FORM_DATA), Some(boundary)) => {
            Some(Body::Multipart(parse_multipart(&raw, boundary)))
        }
        (content_type, _) => {
            debug!(?content_type, "no decoder for content type, body left as is");
            None
        }
    }
}
