//! Hand-rolled HTTP/1.1 request ingestion over blocking TCP sockets.
//!
//! Data flows one way: [`server`] accepts a connection and spawns a thread that
//! runs a [`connection::ConnectionHandler`]. The handler reads the header block
//! ([`reader`]), parses it ([`request`]), reads and decodes the body ([`body`],
//! [`form`], [`multipart`]) and hands the finished [`Request`] to an
//! [`observer::Observer`]. Every failure stays inside its own connection.

pub mod body;
pub mod config;
pub mod connection;
pub mod error;
pub mod form;
pub mod handlers;
pub mod multipart;
pub mod observer;
pub mod reader;
pub mod request;
pub mod response;
pub mod server;
pub mod shutdown;
pub mod util;

pub use config::Config;
pub use error::{ErrorKind, IngestError};
pub use request::{Body, Request};
pub use server::Server;
