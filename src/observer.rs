use tracing::info;

use crate::error::IngestError;
use crate::request::{Body, Request};

/// Receives the outcome of every handled connection.
///
/// Called from the connection's own thread, once per connection.
pub trait Observer: Send + Sync {
    fn on_request(&self, id: u64, request: &Request);

    fn on_failure(&self, _id: u64, _error: &IngestError) {}
}

/// Default observer: writes a per-field summary of each request to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    // Runs inside the connection span, which already carries the id.
    fn on_request(&self, _id: u64, request: &Request) {
        for line in summary(request) {
            info!("{}", line);
        }
    }
}

/*
One line per field:

    method         :POST
    path           :/upload
    ...
    body           :
        file           :1024

Query values and form values are comma-joined; multipart values show their byte length.
Keys are sorted so the output is stable.
*/
pub fn summary(request: &Request) -> Vec<String> {
    let mut lines = vec![
        "===== Request =====".to_string(),
        format!("{:<15}:{}", "method", request.method),
        format!("{:<15}:{}", "path", request.path),
        format!("{:<15}:{}", "version", request.version),
        format!("{:<15}:{}", "type", request.content_type.as_deref().unwrap_or("")),
    ];
    if let Some(boundary) = &request.boundary {
        lines.push(format!("{:<15}:{}", "boundary", boundary));
    }

    lines.push(format!("{:<15}:", "query"));
    let mut query: Vec<_> = request.query.iter().collect();
    query.sort();
    for (label, values) in query {
        lines.push(format!("\t{:<15}:{}", label, values.join(",")));
    }

    lines.push(format!("{:<15}:", "body"));
    match &request.body {
        Some(Body::Form(fields)) => {
            let mut fields: Vec<_> = fields.iter().collect();
            fields.sort();
            for (label, values) in fields {
                lines.push(format!("\t{:<15}:{}", label, values.join(",")));
            }
        }
        Some(Body::Multipart(parts)) => {
            let mut parts: Vec<_> = parts.iter().collect();
            parts.sort_by(|a, b| a.0.cmp(b.0));
            for (label, payload) in parts {
                lines.push(format!("\t{:<15}:{}", label, payload.len()));
            }
        }
        None => {}
    }
    lines
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::request::{FormMap, PartMap};

    #[test]
    fn test_summary_form() {
        let mut query = FormMap::new();
        query.insert("q".into(), vec!["cat".into(), "dog".into()]);
        let request = Request {
            method: "GET".into(),
            path: "/search".into(),
            version: "HTTP/1.1".into(),
            query,
            ..Request::default()
        };
        let lines = summary(&request);
        assert!(lines.contains(&"method         :GET".to_string()));
        assert!(lines.contains(&"\tq              :cat,dog".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("boundary")));
    }

    #[test]
    fn test_summary_multipart_lengths() {
        let mut parts = PartMap::new();
        parts.insert("file".into(), Bytes::from_static(&[1, 2, 3, 4]));
        let request = Request {
            method: "POST".into(),
            path: "/up".into(),
            version: "HTTP/1.1".into(),
            content_type: Some("multipart/form-data".into()),
            content_length: Some(100),
            boundary: Some("xyz".into()),
            body: Some(Body::Multipart(parts)),
            ..Request::default()
        };
        let lines = summary(&request);
        assert!(lines.contains(&"boundary       :xyz".to_string()));
        assert_eq!(lines.last().unwrap(), "\tfile           :4");
    }
}
