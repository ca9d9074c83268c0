//! Cooperative cancellation for enrichment runs.
//!
//! The operator's Ctrl-C trips a token; the pipeline checks it at the top of
//! every record and between candidates. Work already persisted stays valid.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// A cooperative cancellation token.
///
/// Clones share state. Cancellation during a blocking call has no effect
/// until the next check.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static INTERRUPT_TOKEN: OnceLock<CancellationToken> = OnceLock::new();

/// Route SIGINT into a process-wide token and return a handle to it.
///
/// The first Ctrl-C cancels the token; a second one restores the default
/// disposition and terminates the process.
pub fn install_interrupt_handler() -> CancellationToken {
    let token = INTERRUPT_TOKEN.get_or_init(CancellationToken::new).clone();
    register_sigint();
    token
}

#[cfg(unix)]
fn register_sigint() {
    // SAFETY: the handler only performs atomic loads/stores and async-signal-safe libc calls.
    unsafe {
        libc::signal(libc::SIGINT, sigint_handler());
    }
}

#[cfg(unix)]
fn sigint_handler() -> libc::sighandler_t {
    on_sigint as extern "C" fn(libc::c_int) as *const () as libc::sighandler_t
}

#[cfg(not(unix))]
fn register_sigint() {}

#[cfg(unix)]
extern "C" fn on_sigint(_signal: libc::c_int) {
    let Some(token) = INTERRUPT_TOKEN.get() else {
        return;
    };
    if token.is_cancelled() {
        // SAFETY: signal and raise are async-signal-safe.
        unsafe {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::raise(libc::SIGINT);
        }
        return;
    }
    token.cancel();
}
