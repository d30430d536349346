//! `multipart/form-data` support: boundary extraction from the Content-Type
//! header and decoding of the body into named parts.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{IngestError, IngestResult};
use crate::request::PartMap;
use crate::util::{decode_lossy, split_bytes, split_once_bytes, HEADER_END};

/// Substring of a Content-Type value that marks a multipart body.
pub const MULTIPART_MARKER: &str = "multipart/form-data;";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

const BOUNDARY_PARAM: &str = "boundary=";
const NAME_ATTR: &str = "name=\"";

/// Splits `multipart/form-data; boundary=XYZ` into its media type and boundary.
///
/// The value must be exactly two whitespace-separated segments and the second
/// must carry a non-empty `boundary=` parameter. The boundary is taken
/// verbatim: surrounding quotes are not removed.
pub fn extract_boundary(content_type: &str) -> IngestResult<(String, String)> {
    let malformed = || IngestError::MalformedMultipartHeader(content_type.to_string());

    let segments: Vec<&str> = content_type.split_whitespace().collect();
    let [media_type, parameter] = segments[..] else {
        return Err(malformed());
    };

    let start = parameter.find(BOUNDARY_PARAM).ok_or_else(malformed)?;
    let boundary = &parameter[start + BOUNDARY_PARAM.len()..];
    if boundary.is_empty() {
        return Err(malformed());
    }

    Ok((
        media_type.trim_end_matches(';').to_string(),
        boundary.to_string(),
    ))
}

/*
Decodes a multipart body.

The body is split on the dash-boundary ("--" + boundary). The preamble before the
first delimiter is dropped, and the segment that starts with "--" is the closing
delimiter: it and everything after it are ignored.

Each remaining part is split once on the blank line into headers and payload. The
field name comes from the first `name="..."` attribute in the headers; a part
without one is skipped. The payload loses one trailing CRLF and is stored as raw
bytes. A repeated name overwrites the earlier part.
*/
pub fn parse_multipart(body: &Bytes, boundary: &str) -> PartMap {
    let delimiter = format!("--{}", boundary);
    let mut parts = PartMap::new();

    let segments = split_bytes(body, delimiter.as_bytes());
    for segment in segments.into_iter().skip(1) {
        if segment.starts_with(b"--") {
            debug!("reached final multipart boundary");
            break;
        }

        let Some((part_header, payload)) = split_once_bytes(segment, HEADER_END) else {
            warn!(len = segment.len(), "multipart part has no header terminator, skipped");
            continue;
        };

        let header_text = decode_lossy(part_header);
        let Some(name) = field_name(&header_text) else {
            warn!("multipart part has no name attribute, skipped");
            continue;
        };

        let payload = strip_line_end(payload);
        debug!(field = name, len = payload.len(), "multipart field");
        parts.insert(name.to_string(), body.slice_ref(payload));
    }

    parts
}

/*
Finds the first `name="<word>"` attribute, where <word> is one or more
alphanumeric characters or underscores closed by a quote. An occurrence glued to a
preceding word character (the tail of `filename="..."`) does not count.
*/
fn field_name(header: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(pos) = header[from..].find(NAME_ATTR) {
        let start = from + pos;
        from = start + NAME_ATTR.len();

        let glued = header[..start].chars().next_back().is_some_and(is_word_char);
        if glued {
            continue;
        }

        let rest = &header[from..];
        let end = rest.find(|c: char| !is_word_char(c)).unwrap_or(rest.len());
        if end > 0 && rest[end..].starts_with('"') {
            return Some(&rest[..end]);
        }
    }
    None
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn strip_line_end(payload: &[u8]) -> &[u8] {
    payload
        .strip_suffix(b"\r\n")
        .or_else(|| payload.strip_suffix(b"\n"))
        .unwrap_or(payload)
}
