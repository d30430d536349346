use crate::util::CRLF;

/// Response payload: text is encoded as UTF-8, bytes are written untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Text(String),
    Bytes(Vec<u8>),
}

impl ResponseBody {
    fn as_bytes(&self) -> &[u8] {
        match self {
            ResponseBody::Text(text) => text.as_bytes(),
            ResponseBody::Bytes(bytes) => bytes,
        }
    }
}

/*
An HTTP/1.1 response: status line, headers in insertion order, blank line, body.

Connections are never kept alive, so serializing adds `Connection: close` unless a
Connection header was set explicitly. `Content-Length` is filled in the same way.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl Response {
    pub fn new(status: u16, reason: &str) -> Self {
        Response {
            status,
            reason: reason.to_string(),
            headers: Vec::new(),
            body: ResponseBody::Text(String::new()),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = ResponseBody::Text(body.into());
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self.body.as_bytes();

        let mut head = format!("HTTP/1.1 {} {}{}", self.status, self.reason, CRLF);
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}{}", name, value, CRLF));
        }
        if !self.has_header("Content-Length") {
            head.push_str(&format!("Content-Length: {}{}", body.len(), CRLF));
        }
        if !self.has_header("Connection") {
            head.push_str(&format!("Connection: close{}", CRLF));
        }
        head.push_str(CRLF);

        let mut out = head.into_bytes();
        out.extend_from_slice(body);
        return out;
    }
}

// Shorthand for a text response with a Content-Type.
pub fn build_response(
    status_code: u16,
    reason_phrase: &str,
    content_type: &str,
    body: &str,
) -> Vec<u8> {
    Response::new(status_code, reason_phrase)
        .header("Content-Type", content_type)
        .text(body)
        .to_bytes()
}
