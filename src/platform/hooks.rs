//! Crash-path terminal restoration.
//!
//! Raw mode must not outlive the process: a host that dies by signal or
//! panic mid-read would dump its user into a shell with echo and canonical
//! input still off. `install_terminal_restore` snapshots the tty's termios
//! and arms two paths — a signal listener and a chained panic hook — that
//! put the snapshot back exactly once, whichever fires first. Dropping the
//! guard disarms both.

use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use signal_hook::iterator::Signals;

use crate::platform::raw_mode::TermiosSnapshot;

const RESTORE_SIGNALS: [libc::c_int; 3] = [libc::SIGINT, libc::SIGTERM, libc::SIGHUP];

struct RestoreState {
    snapshot: Option<TermiosSnapshot>,
    cleanup: Option<Box<dyn Fn() + Send + Sync>>,
    fired: AtomicBool,
}

impl RestoreState {
    fn fire(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(snapshot) = self.snapshot.as_ref() {
            snapshot.restore();
        }
        if let Some(cleanup) = self.cleanup.as_ref() {
            cleanup();
        }
    }
}

/// Snapshot `fd`'s termios and restore it if the process panics or takes a
/// termination signal. After restoring, a signal is re-handled with its
/// default disposition, so the process still dies the way it would have.
pub fn install_terminal_restore(fd: RawFd) -> RestoreGuard {
    arm(RestoreState {
        snapshot: TermiosSnapshot::capture(fd),
        cleanup: None,
        fired: AtomicBool::new(false),
    })
}

/// Like [`install_terminal_restore`], with an extra cleanup to run once the
/// snapshot is back (flushing host logs, say). The cleanup shares the
/// snapshot's once-only firing.
pub fn install_terminal_restore_with<F>(fd: RawFd, cleanup: F) -> RestoreGuard
where
    F: Fn() + Send + Sync + 'static,
{
    arm(RestoreState {
        snapshot: TermiosSnapshot::capture(fd),
        cleanup: Some(Box::new(cleanup)),
        fired: AtomicBool::new(false),
    })
}

/// Armed crash-path restore. Dropping it detaches the signal listener and
/// leaves the chained panic hook inert.
pub struct RestoreGuard {
    signal_handle: signal_hook::iterator::Handle,
    listener: Option<JoinHandle<()>>,
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        self.signal_handle.close();
        if let Some(listener) = self.listener.take() {
            let _ = listener.join();
        }
    }
}

fn arm(state: RestoreState) -> RestoreGuard {
    // The listener thread owns the only strong reference; joining it on drop
    // is what disarms the panic path below.
    let state = Arc::new(state);

    // Panic path: the hook holds a weak reference, so once the guard is
    // dropped the chained hook stays installed but does nothing.
    let weak = Arc::downgrade(&state);
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(state) = weak.upgrade() {
            state.fire();
        }
        previous(info);
    }));

    // Signal path: restore the terminal, then let the signal act as if we
    // had never caught it.
    let mut signals =
        Signals::new(RESTORE_SIGNALS).expect("failed to register restore signals");
    let signal_handle = signals.handle();
    let listener = std::thread::spawn(move || {
        for signal in signals.forever() {
            state.fire();
            let _ = signal_hook::low_level::emulate_default_handler(signal);
        }
    });

    RestoreGuard {
        signal_handle,
        listener: Some(listener),
    }
}
