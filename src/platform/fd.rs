//! Low-level fd plumbing: best-effort writes, polling, nonblocking reads,
//! the fd-backed terminal sink, and the cancellation channel.

use std::fs::OpenOptions;
use std::io;
use std::io::Write as _;
use std::os::unix::io::RawFd;
use std::path::PathBuf;

use libc::c_int;

use crate::config::EnvConfig;
use crate::render::output::TermSink;

/// Write all of `data` to `fd`, retrying short writes and EINTR. Hard errors
/// abandon the remainder; terminal output is best-effort on this interface.
pub fn write_fd(fd: RawFd, data: &[u8]) {
    let mut written = 0;
    while written < data.len() {
        let result = unsafe {
            libc::write(
                fd,
                data[written..].as_ptr() as *const libc::c_void,
                data.len() - written,
            )
        };
        if result < 0 {
            if io::Error::last_os_error().raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return;
        }
        if result == 0 {
            return;
        }
        written += result as usize;
    }
}

/// True when `fd` becomes readable within `timeout_ms`.
pub fn poll_readable(fd: RawFd, timeout_ms: i32) -> bool {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    result > 0 && (fds.revents & libc::POLLIN) != 0
}

/// Block until the input fd or the cancel fd has an event; EINTR retries.
/// Returns `(input_ready, cancel_ready)`.
pub fn poll_input_or_cancel(in_fd: RawFd, cancel_fd: RawFd) -> io::Result<(bool, bool)> {
    loop {
        let mut fds = [
            libc::pollfd {
                fd: in_fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: cancel_fd,
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        let result = unsafe { libc::poll(fds.as_mut_ptr(), 2, -1) };
        if result < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(err);
        }
        return Ok((fds[0].revents != 0, fds[1].revents != 0));
    }
}

/// Read one byte from a nonblocking fd. `Ok(None)` when nothing is pending
/// (EAGAIN or end of stream); EINTR retries.
pub fn read_byte(fd: RawFd) -> io::Result<Option<u8>> {
    let mut byte = 0u8;
    loop {
        let result = unsafe { libc::read(fd, &mut byte as *mut u8 as *mut libc::c_void, 1) };
        if result == 1 {
            return Ok(Some(byte));
        }
        if result == 0 {
            return Ok(None);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == libc::EINTR => continue,
            Some(code) if code == libc::EAGAIN || code == libc::EWOULDBLOCK => return Ok(None),
            _ => return Err(err),
        }
    }
}

/// Terminal sink backed by a raw fd, with an optional byte-for-byte write
/// log for debugging escape streams.
#[derive(Debug, Clone)]
pub struct FdSink {
    fd: RawFd,
    write_log_path: Option<PathBuf>,
    write_log_failed: bool,
}

impl FdSink {
    pub fn new(fd: RawFd) -> Self {
        Self::with_config(fd, &EnvConfig::from_env())
    }

    pub fn with_config(fd: RawFd, config: &EnvConfig) -> Self {
        Self {
            fd,
            write_log_path: config.write_log.clone(),
            write_log_failed: false,
        }
    }
}

impl TermSink for FdSink {
    fn write(&mut self, data: &str) {
        write_fd(self.fd, data.as_bytes());

        if self.write_log_failed {
            return;
        }
        if let Some(path) = self.write_log_path.as_ref() {
            let result = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(data.as_bytes()));
            if result.is_err() {
                self.write_log_failed = true;
            }
        }
    }
}

/// Out-of-band cancellation channel.
///
/// Tokens are atomic u64 increments: an eventfd on Linux, a nonblocking
/// self-pipe carrying whole 8-byte tokens elsewhere. `signal` never blocks
/// and touches no state besides the fd, so it is safe from any thread.
#[derive(Debug)]
pub struct CancelChannel {
    read_fd: c_int,
    write_fd: c_int,
}

impl CancelChannel {
    #[cfg(target_os = "linux")]
    pub fn new() -> io::Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            read_fd: fd,
            write_fd: fd,
        })
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    pub fn new() -> io::Result<Self> {
        let mut fds = [0 as c_int; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }
        for fd in fds {
            let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
            unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        }
        Ok(Self {
            read_fd: fds[0],
            write_fd: fds[1],
        })
    }

    pub fn read_fd(&self) -> RawFd {
        self.read_fd
    }

    /// Post one token.
    pub fn signal(&self) {
        let token: u64 = 1;
        unsafe {
            libc::write(
                self.write_fd,
                &token as *const u64 as *const libc::c_void,
                std::mem::size_of::<u64>(),
            );
        }
    }

    /// Consume one pending token; false when the channel was empty.
    pub fn drain(&self) -> bool {
        let mut token = 0u64;
        let result = unsafe {
            libc::read(
                self.read_fd,
                &mut token as *mut u64 as *mut libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        result == std::mem::size_of::<u64>() as isize
    }
}

impl Drop for CancelChannel {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.read_fd);
            if self.write_fd != self.read_fd {
                libc::close(self.write_fd);
            }
        }
    }
}
