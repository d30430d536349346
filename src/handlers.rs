use crate::error::IngestError;
use crate::request::{Body, Request};
use crate::response::build_response;

// Acknowledges a fully read request with a short plain-text summary.
pub fn accepted(request: &Request) -> Vec<u8> {
    let fields = match &request.body {
        Some(Body::Form(fields)) => fields.len(),
        Some(Body::Multipart(parts)) => parts.len(),
        None => 0,
    };
    let summary = format!(
        "{} {} ({} query keys, {} body fields)",
        request.method,
        request.path,
        request.query.len(),
        fields
    );
    build_response(200, "OK", "text/plain", &summary)
}

pub fn bad_request() -> Vec<u8> {
    build_response(400, "Bad Request", "text/plain", "400 Bad Request")
}

pub fn request_timeout() -> Vec<u8> {
    build_response(408, "Request Timeout", "text/plain", "408 Request Timeout")
}

pub fn content_too_large() -> Vec<u8> {
    build_response(413, "Content Too Large", "text/plain", "413 Content Too Large")
}

pub fn internal_error() -> Vec<u8> {
    build_response(500, "Internal Server Error", "text/plain", "500 Internal Server Error")
}

/*
Best-effort reply for a failed request. Nothing is sent when the peer already went
away (EmptyConnection, ConnectionError, TruncatedBody): there is no one left to read it.
*/
pub fn for_error(err: &IngestError) -> Option<Vec<u8>> {
    match err {
        IngestError::MalformedRequestLine(_)
        | IngestError::MalformedContentLength(_)
        | IngestError::MalformedMultipartHeader(_)
        | IngestError::MissingBodyMetadata { .. } => Some(bad_request()),
        IngestError::Timeout => Some(request_timeout()),
        IngestError::HeaderTooLarge { .. } | IngestError::BodyTooLarge { .. } => {
            Some(content_too_large())
        }
        IngestError::Io(_) => Some(internal_error()),
        IngestError::EmptyConnection
        | IngestError::ConnectionError(_)
        | IngestError::TruncatedBody { .. } => None,
    }
}
