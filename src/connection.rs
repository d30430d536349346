//! Drives a single accepted connection from the first header byte to a parsed
//! [`Request`], and turns every failure along the way into a logged outcome.

use std::io::{Read, Write};

use tracing::{debug, error, info, trace, warn};

use crate::body::{resolve_body, BodyLimits};
use crate::config::Config;
use crate::error::{IngestError, IngestResult};
use crate::handlers;
use crate::observer::Observer;
use crate::reader::{read_head, ReadLimits};
use crate::request::{parse_head, Request};

/// Where a connection handler is in its lifecycle.
///
/// `Done` and `Failed` are terminal; the socket is closed after either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Accepted,
    ReadingHeaders,
    HeadersParsed,
    ReadingBody,
    BodyDecoded,
    Done,
    Failed,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Done | State::Failed)
    }
}

pub struct ConnectionHandler<'a> {
    id: u64,
    config: &'a Config,
    state: State,
}

impl<'a> ConnectionHandler<'a> {
    pub fn new(id: u64, config: &'a Config) -> Self {
        ConnectionHandler {
            id,
            config,
            state: State::Accepted,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn advance(&mut self, next: State) {
        debug_assert!(!self.state.is_terminal(), "{:?} is terminal", self.state);
        trace!(from = ?self.state, to = ?next, "state change");
        self.state = next;
    }

    /*
    Runs the connection to a terminal state and reports the outcome to `observer`.
    Errors never escape: each one is logged with its kind and ends in `Failed`.
    When `respond` is enabled a best-effort reply is written before returning; the
    caller closes the socket.
    */
    pub fn handle<S: Read + Write>(
        &mut self,
        stream: &mut S,
        observer: &dyn Observer,
    ) -> IngestResult<Request> {
        let outcome = self.ingest(stream);

        match &outcome {
            Ok(request) => {
                self.advance(State::Done);
                info!(
                    method = %request.method,
                    path = %request.path,
                    multipart = request.is_multipart(),
                    "request parsed"
                );
                observer.on_request(self.id, request);
                if self.config.respond {
                    reply(stream, &handlers::accepted(request));
                }
            }
            Err(err) => {
                self.fail(err, observer);
                if self.config.respond {
                    if let Some(response) = handlers::for_error(err) {
                        reply(stream, &response);
                    }
                }
            }
        }
        outcome
    }

    /// Ends the connection as `Failed` before any request bytes are read, e.g. when
    /// the socket cannot be configured.
    pub fn abort(&mut self, err: IngestError, observer: &dyn Observer) {
        self.fail(&err, observer);
    }

    fn fail(&mut self, err: &IngestError, observer: &dyn Observer) {
        self.advance(State::Failed);
        log_failure(err);
        observer.on_failure(self.id, err);
    }

    fn ingest<S: Read>(&mut self, stream: &mut S) -> IngestResult<Request> {
        self.advance(State::ReadingHeaders);
        let head = read_head(
            stream,
            ReadLimits {
                chunk_size: self.config.buffer_size,
                max_header_size: self.config.max_header_size,
            },
        )?;

        let mut request = parse_head(&head.header)?;
        self.advance(State::HeadersParsed);

        if !request.expects_body() {
            return Ok(request);
        }

        self.advance(State::ReadingBody);
        resolve_body(
            stream,
            &mut request,
            head.body_prefix,
            BodyLimits {
                chunk_size: self.config.buffer_size,
                max_body_size: self.config.max_body_size,
            },
        )?;
        self.advance(State::BodyDecoded);

        Ok(request)
    }
}

fn log_failure(err: &IngestError) {
    let kind = err.kind();
    match err {
        IngestError::EmptyConnection | IngestError::Timeout | IngestError::TruncatedBody { .. } => {
            warn!(%kind, "{}", err)
        }
        IngestError::ConnectionError(source) => error!(%kind, error = ?source, "{}", err),
        IngestError::Io(source) => error!(%kind, error = ?source, "unexpected failure: {}", err),
        _ => error!(%kind, "{}", err),
    }
}

fn reply<S: Write>(stream: &mut S, response: &[u8]) {
    if let Err(e) = stream.write_all(response).and_then(|_| stream.flush()) {
        debug!(error = %e, "could not send response");
    }
}
