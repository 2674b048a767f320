//! Termios raw mode and terminal geometry.

use std::os::unix::io::RawFd;

/// Owns the input fd's mode while the reader is active.
///
/// `enable_raw` switches the fd to O_NONBLOCK (readiness comes from `poll`,
/// reads must never stall holding the reader's lock) and applies raw
/// termios; `disable_raw` restores the saved termios and, if the fd was
/// blocking originally, the blocking flag. Drop covers an abandoned reader.
///
/// All termios calls are best-effort: on a non-tty fd they fail quietly and
/// input is consumed as-is, which is what tests running over pipes expect.
pub struct InputMode {
    fd: RawFd,
    initial_termios: Option<libc::termios>,
    initially_blocking: bool,
    raw_active: bool,
}

impl InputMode {
    pub fn new(fd: RawFd) -> Self {
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        let initially_blocking = flags >= 0 && flags & libc::O_NONBLOCK == 0;

        Self {
            fd,
            initial_termios: None,
            initially_blocking,
            raw_active: false,
        }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn enable_raw(&mut self) {
        let flags = unsafe { libc::fcntl(self.fd, libc::F_GETFL) };
        if flags >= 0 {
            unsafe { libc::fcntl(self.fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        }
        self.raw_active = true;

        let mut termios = match get_termios(self.fd) {
            Some(termios) => termios,
            None => return,
        };
        self.initial_termios = Some(termios);

        termios.c_iflag &=
            !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        termios.c_oflag &= !libc::OPOST;
        termios.c_cflag |= libc::CS8;
        termios.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;

        set_termios(self.fd, &termios);
    }

    pub fn disable_raw(&mut self) {
        if let Some(initial) = self.initial_termios.as_ref() {
            set_termios(self.fd, initial);
        }
        if self.initially_blocking {
            let flags = unsafe { libc::fcntl(self.fd, libc::F_GETFL) };
            if flags >= 0 {
                unsafe { libc::fcntl(self.fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) };
            }
        }
        self.raw_active = false;
    }
}

impl Drop for InputMode {
    fn drop(&mut self) {
        if self.raw_active {
            self.disable_raw();
        }
    }
}

/// A termios state captured from a tty, reappliable later from any thread.
///
/// This is what the crash-path restore in `platform::hooks` puts back when
/// the process dies mid-read.
#[derive(Clone, Copy)]
pub struct TermiosSnapshot {
    fd: RawFd,
    termios: libc::termios,
}

impl TermiosSnapshot {
    /// `None` when the fd is not a tty.
    pub fn capture(fd: RawFd) -> Option<Self> {
        get_termios(fd).map(|termios| Self { fd, termios })
    }

    pub fn restore(&self) {
        set_termios(self.fd, &self.termios);
    }
}

fn get_termios(fd: RawFd) -> Option<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    if unsafe { libc::tcgetattr(fd, &mut termios) } == 0 {
        Some(termios)
    } else {
        None
    }
}

fn set_termios(fd: RawFd, termios: &libc::termios) {
    unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, termios) };
}

/// Terminal width in columns; `None` when the fd has no usable size.
pub fn winsize_columns(fd: RawFd) -> Option<usize> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 {
        Some(usize::from(size.ws_col))
    } else {
        None
    }
}
