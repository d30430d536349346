#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use http_ingest::shutdown::Shutdown;
use http_ingest::observer::Observer;
use http_ingest::{Config, ErrorKind, IngestError, Request, Server};

pub const WAIT: Duration = Duration::from_secs(10);

/// What a connection handler reported, as seen from a test.
#[derive(Debug)]
pub enum Event {
    Parsed(u64, Request),
    Failed(u64, ErrorKind),
}

// Forwards every outcome to the test thread.
struct ChannelObserver {
    events: Mutex<Sender<Event>>,
}

impl Observer for ChannelObserver {
    fn on_request(&self, id: u64, request: &Request) {
        let _ = self.events.lock().unwrap().send(Event::Parsed(id, request.clone()));
    }

    fn on_failure(&self, id: u64, error: &IngestError) {
        let _ = self.events.lock().unwrap().send(Event::Failed(id, error.kind()));
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub events: Receiver<Event>,
    pub shutdown: Shutdown,
    runner: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn next_event(&self) -> Event {
        self.events.recv_timeout(WAIT).expect("handler did not report in time")
    }

    pub fn expect_request(&self) -> Request {
        match self.next_event() {
            Event::Parsed(_, request) => request,
            Event::Failed(_, kind) => panic!("expected a parsed request, got {:?}", kind),
        }
    }

    pub fn expect_failure(&self) -> ErrorKind {
        match self.next_event() {
            Event::Failed(_, kind) => kind,
            Event::Parsed(_, request) => panic!("expected a failure, got {:?}", request),
        }
    }

    /// Triggers shutdown and hands back the thread running the accept loop.
    pub fn stop(&mut self) -> JoinHandle<()> {
        self.shutdown.trigger();
        self.runner.take().expect("server already stopped")
    }

    pub fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).expect("Failed to connect")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Starts a server on an ephemeral loopback port.
pub fn start(config: Config) -> TestServer {
    let (tx, rx) = mpsc::channel();
    let config = Config {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        ..config
    };

    let server = Server::bind(config)
        .expect("Failed to bind")
        .with_observer(Arc::new(ChannelObserver {
            events: Mutex::new(tx),
        }));
    let addr = server.local_addr().expect("no local address");
    let shutdown = server.shutdown_handle();
    let runner = thread::spawn(move || server.run());

    TestServer {
        addr,
        events: rx,
        shutdown,
        runner: Some(runner),
    }
}

// Sends raw bytes, half-closes, and returns whatever the server wrote back.
pub fn send_request(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).expect("Failed to connect");
    stream.write_all(request).unwrap();
    stream.shutdown(std::net::Shutdown::Write).unwrap();

    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response);
    return response;
}
