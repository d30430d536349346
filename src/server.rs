use std::any::Any;
use std::io::ErrorKind;
use std::net::{Shutdown as SocketShutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use crate::config::Config;
use crate::connection::ConnectionHandler;
use crate::error::IngestError;
use crate::observer::{LogObserver, Observer};
use crate::shutdown::Shutdown;

// How long the accept loop sleeps when no connection is pending. This bounds how
// late a shutdown request is noticed.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not resolve {0}")]
    Resolve(String),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct Server {
    listener: TcpListener,
    config: Arc<Config>,
    observer: Arc<dyn Observer>,
    shutdown: Shutdown,
    // Connection ids, handed out by the accept loop only.
    next_id: AtomicU64,
    // Handler threads that have not finished yet.
    active: Arc<AtomicUsize>,
}

// Counts one running handler for as long as it is alive, unwinding included.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        ActiveGuard(Arc::clone(active))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /*
    Creates the listening socket:
    - SO_REUSEADDR so a restart does not wait for TIME_WAIT sockets to drain.
    - The backlog comes from the config (5 by default).
    - Non-blocking, so the accept loop can notice a shutdown request between polls.
    */
    pub fn bind(config: Config) -> Result<Server, ServerError> {
        let address = config.address();
        let addr = address
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ServerError::Resolve(address.clone()))?;

        let bind_error = |source| ServerError::Bind {
            addr: address.clone(),
            source,
        };
        let listener = listen(addr, config.backlog).map_err(bind_error)?;

        Ok(Server {
            listener,
            config: Arc::new(config),
            observer: Arc::new(LogObserver),
            shutdown: Shutdown::new(),
            next_id: AtomicU64::new(0),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn stop_on_interrupt(&mut self) -> std::io::Result<()> {
        self.shutdown.watch_interrupt()
    }

    /*
    Accept loop. Each connection gets its own thread and its own id; the loop itself
    never touches request data. Once shutdown is triggered the listening socket is
    closed, then run waits for connections already accepted to finish. Each of those
    is bounded by the read timeout.
    */
    pub fn run(self) {
        match self.listener.local_addr() {
            Ok(addr) => info!("🌐 Listening on {}...", addr),
            Err(_) => info!("🌐 Listening..."),
        }

        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        info!("Server closing");
        drop(self.listener);

        let pending = self.active.load(Ordering::SeqCst);
        if pending > 0 {
            info!(pending, "waiting for open connections");
        }
        while self.active.load(Ordering::SeqCst) > 0 {
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
        info!("Server closed");
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let config = Arc::clone(&self.config);
        let observer = Arc::clone(&self.observer);
        // Dropped with the closure if the spawn fails.
        let guard = ActiveGuard::enter(&self.active);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || {
                let _guard = guard;
                let _span = info_span!("connection", conn = id, %peer).entered();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    serve(stream, id, &config, observer.as_ref())
                }));
                if let Err(payload) = outcome {
                    error!("handler panicked: {}", panic_message(payload.as_ref()));
                }
            });

        if let Err(e) = spawned {
            error!(conn = id, error = %e, "could not spawn connection thread");
        }
    }
}

fn listen(addr: SocketAddr, backlog: i32) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    let listener: TcpListener = socket.into();
    listener.set_nonblocking(true)?;
    Ok(listener)
}

// Runs one connection on the current thread and closes the socket afterwards.
fn serve(mut stream: TcpStream, id: u64, config: &Config, observer: &dyn Observer) {
    info!("📡 Connection accepted");

    let mut handler = ConnectionHandler::new(id, config);

    // Accepted sockets inherit non-blocking mode on some platforms.
    let prepared = stream
        .set_nonblocking(false)
        .and_then(|_| stream.set_read_timeout(Some(config.timeout())));
    match prepared {
        Ok(()) => {
            let _ = handler.handle(&mut stream, observer);
        }
        Err(e) => handler.abort(IngestError::Io(e), observer),
    }

    let _ = stream.shutdown(SocketShutdown::Both);
    debug!(state = ?handler.state(), "🔌 Connection closed");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
