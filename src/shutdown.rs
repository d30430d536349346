use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// Set from the SIGINT handler; only ever goes from false to true.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Cloneable stop flag for the accept loop.
///
/// Stopping ends accepting; `Server::run` then waits for handlers already running.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
    on_interrupt: bool,
}

impl Shutdown {
    pub fn new() -> Self {
        Shutdown::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || (self.on_interrupt && INTERRUPTED.load(Ordering::SeqCst))
    }

    /// Also treat SIGINT (Ctrl-C) as a stop request.
    pub fn watch_interrupt(&mut self) -> io::Result<()> {
        install_interrupt_handler()?;
        self.on_interrupt = true;
        Ok(())
    }
}

#[cfg(unix)]
extern "C" fn on_interrupt(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_interrupt_handler() -> io::Result<()> {
    let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // Only an atomic store runs inside the handler.
    let previous = unsafe { libc::signal(libc::SIGINT, handler) };
    if previous == libc::SIG_ERR {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_interrupt_handler() -> io::Result<()> {
    tracing::warn!("interrupt handling is not supported on this platform");
    Ok(())
}
