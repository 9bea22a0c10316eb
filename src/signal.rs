//! Unix signal handling (SIGINT).
//!
//! The first SIGINT is left to reach the running build step, which then
//! fails and stops the evaluation; we only note that it happened so the
//! failure can be reported as an interruption.  A second SIGINT kills us.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
fn sigint_action(handler: libc::sighandler_t) {
    // Safety: registering a signal handler is libc unsafe code.
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = handler;
        libc::sigaction(libc::SIGINT, &sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigint_handler(_sig: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
    sigint_action(libc::SIG_DFL);
}

#[cfg(unix)]
pub fn register_sigint() {
    sigint_action(sigint_handler as libc::sighandler_t);
}

#[cfg(not(unix))]
pub fn register_sigint() {}

/// Whether a SIGINT arrived since register_sigint().
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
