//! The line reader: raw-mode lifecycle, key routing, and the blocking,
//! nonblocking, and cancellable read entry points.
//!
//! Locking discipline: the mutex around the reader state is held only while
//! one byte is processed, never across `poll`, so `suspend_output` from a
//! second thread can interleave between keystrokes. `cancel` touches nothing
//! but the cancellation channel.

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::config::ReaderOptions;
use crate::core::completion::Completion;
use crate::core::history::History;
use crate::core::prompt::StyledPrompt;
use crate::core::style::{Style, StyleWriter};
use crate::core::utf8::Utf8Decoder;
use crate::platform::fd::{
    poll_input_or_cancel, read_byte, write_fd, CancelChannel, FdSink,
};
use crate::platform::raw_mode::{winsize_columns, InputMode};
use crate::render::output::TermSink;
use crate::runtime::session::{Callbacks, LineSession};

/// Why a read ended without a committed line.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("interrupted (Ctrl-C)")]
    Interrupted,
    #[error("end of input (Ctrl-D on an empty line)")]
    EndOfFile,
    #[error("read cancelled")]
    Cancelled,
    #[error("terminal read failed: {0}")]
    Syscall(#[from] io::Error),
}

mod key {
    pub const CTRL_A: u32 = 1;
    pub const CTRL_B: u32 = 2;
    pub const CTRL_C: u32 = 3;
    pub const CTRL_D: u32 = 4;
    pub const CTRL_E: u32 = 5;
    pub const CTRL_F: u32 = 6;
    pub const CTRL_H: u32 = 8;
    pub const TAB: u32 = 9;
    pub const CTRL_K: u32 = 11;
    pub const CTRL_L: u32 = 12;
    pub const ENTER: u32 = 13;
    pub const CTRL_N: u32 = 14;
    pub const CTRL_P: u32 = 16;
    pub const CTRL_T: u32 = 20;
    pub const CTRL_U: u32 = 21;
    pub const CTRL_W: u32 = 23;
    pub const ESC: u32 = 27;
    pub const BACKSPACE: u32 = 127;
}

/// Reader state behind the mutex: the active session plus everything that
/// survives between reads.
pub(crate) struct ReaderCore<S: TermSink + Clone> {
    sink: S,
    session: Option<LineSession<S>>,
    input_mode: Option<InputMode>,
    decoder: Utf8Decoder,
    escape_pending: u8,
    escape_seq: Vec<u32>,
    history: History,
    completion: Completion,
    callbacks: Callbacks,
    auto_history: bool,
    masked: bool,
    hint_style: Style,
}

impl<S: TermSink + Clone> ReaderCore<S> {
    pub(crate) fn new(
        sink: S,
        input_mode: Option<InputMode>,
        history_size: usize,
        auto_history: bool,
        hint_style: Style,
    ) -> Self {
        Self {
            sink,
            session: None,
            input_mode,
            decoder: Utf8Decoder::new(),
            escape_pending: 0,
            escape_seq: Vec::new(),
            history: History::new(history_size),
            completion: Completion::default(),
            callbacks: Callbacks::default(),
            auto_history,
            masked: false,
            hint_style,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub(crate) fn activate(&mut self, prompt: StyledPrompt, term_columns: Option<usize>) {
        if let Some(mode) = self.input_mode.as_mut() {
            mode.enable_raw();
        }
        self.session = Some(LineSession::new(
            self.sink.clone(),
            prompt.into_text(),
            term_columns,
            self.masked,
            self.hint_style,
        ));
    }

    pub(crate) fn deactivate(&mut self) {
        // Dropping the session wipes an abandoned line before raw mode ends.
        self.session = None;
        if let Some(mode) = self.input_mode.as_mut() {
            mode.disable_raw();
        }
    }

    /// Feed one raw byte through the decoder and, when it completes a code
    /// point, route the resulting key event. `Some` ends the read.
    pub(crate) fn process_byte(&mut self, byte: u8) -> Option<Result<String, ReadError>> {
        let scalar = match self.decoder.feed(byte) {
            Ok(Some(scalar)) => scalar,
            // Mid-sequence: wait for more bytes. A malformed byte is dropped
            // and decoding resumes with the next well-formed sequence.
            Ok(None) | Err(_) => return None,
        };

        let Self {
            session,
            history,
            completion,
            callbacks,
            auto_history,
            masked,
            escape_pending,
            escape_seq,
            ..
        } = self;
        let session = session.as_mut()?;

        if *escape_pending > 0 {
            *escape_pending -= 1;
            escape_seq.push(scalar);
            if *escape_pending == 0 {
                if dispatch_escape(escape_seq, session, history, completion, callbacks, *masked) {
                    *escape_pending += 1;
                } else {
                    escape_seq.clear();
                }
            }
            return None;
        }

        match scalar {
            key::ENTER => {
                completion.reset();
                if session.is_empty() {
                    session.new_line();
                } else {
                    if *auto_history {
                        history.add(&session.current_line());
                    }
                    return Some(Ok(session.pop_line()));
                }
            }
            key::CTRL_D => {
                if session.is_empty() {
                    completion.reset();
                    return Some(Err(ReadError::EndOfFile));
                }
                session.erase_current_character(callbacks);
                completion.reset();
            }
            key::CTRL_C => {
                completion.reset();
                return Some(Err(ReadError::Interrupted));
            }
            key::BACKSPACE | key::CTRL_H => {
                session.erase_previous_character(callbacks);
                completion.reset();
            }
            key::CTRL_U => {
                session.erase_line_backward(callbacks);
                completion.reset();
            }
            key::CTRL_K => {
                session.erase_line_forward(callbacks);
                completion.reset();
            }
            key::CTRL_A => session.cursor_home(),
            key::CTRL_B => session.cursor_back(),
            key::CTRL_E => session.cursor_end(),
            key::CTRL_F => session.cursor_forward(),
            key::CTRL_T => {
                session.swap_characters(callbacks);
                completion.reset();
            }
            key::CTRL_W => {
                session.erase_previous_word(callbacks);
                completion.reset();
            }
            key::CTRL_L => session.clear_screen(),
            key::CTRL_P => {
                if !*masked {
                    history_back(session, history, completion, callbacks);
                }
            }
            key::CTRL_N => {
                if !*masked {
                    history_forward(session, history, completion, callbacks);
                }
            }
            key::TAB => {
                if !*masked {
                    if let Some(replacement) = completion.next(&session.current_line()) {
                        session.set_line(&replacement, callbacks);
                    }
                }
            }
            key::ESC => {
                *escape_pending = 2;
                escape_seq.clear();
            }
            _ => {
                // Unbound keys insert. Scalars with no `char` form (the
                // decoder can assemble surrogates or out-of-range values
                // from crafted sequences) land as U+FFFD rather than
                // vanishing mid-keystroke.
                let ch = char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER);
                session.insert_character(ch, callbacks);
                completion.reset();
            }
        }

        None
    }
}

/// Handle a completed escape collection. Returns true when one more code
/// point is needed (`ESC [ 3`, waiting for `~`).
fn dispatch_escape<S: TermSink>(
    seq: &[u32],
    session: &mut LineSession<S>,
    history: &mut History,
    completion: &mut Completion,
    callbacks: &mut Callbacks,
    masked: bool,
) -> bool {
    if seq[0] == u32::from(b'[') {
        if seq.len() == 2 && seq[1] == u32::from(b'3') {
            return true;
        }
        if seq.len() == 3 {
            if seq[1] == u32::from(b'3') && seq[2] == u32::from(b'~') {
                session.erase_current_character(callbacks);
                completion.reset();
            }
            return false;
        }

        match seq[1] {
            x if x == u32::from(b'D') => session.cursor_back(),
            x if x == u32::from(b'C') => session.cursor_forward(),
            x if x == u32::from(b'H') => session.cursor_home(),
            x if x == u32::from(b'F') => session.cursor_end(),
            x if x == u32::from(b'A') && !masked => {
                history_back(session, history, completion, callbacks);
            }
            x if x == u32::from(b'B') && !masked => {
                history_forward(session, history, completion, callbacks);
            }
            _ => {}
        }
    } else if seq[0] == u32::from(b'O') {
        match seq[1] {
            x if x == u32::from(b'H') => session.cursor_home(),
            x if x == u32::from(b'F') => session.cursor_end(),
            _ => {}
        }
    }

    false
}

fn history_back<S: TermSink>(
    session: &mut LineSession<S>,
    history: &mut History,
    completion: &mut Completion,
    callbacks: &mut Callbacks,
) {
    if let Some(line) = history.record_and_go_back(&session.current_line()) {
        session.set_line(&line, callbacks);
        completion.reset();
    }
}

fn history_forward<S: TermSink>(
    session: &mut LineSession<S>,
    history: &mut History,
    completion: &mut Completion,
    callbacks: &mut Callbacks,
) {
    if let Some(line) = history.record_and_go_forward(&session.current_line()) {
        session.set_line(&line, callbacks);
        completion.reset();
    }
}

/// Thread-safe cancellation endpoint for a reader.
#[derive(Clone)]
pub struct CancelHandle {
    channel: Arc<CancelChannel>,
}

impl CancelHandle {
    /// Post a cancellation token. Never blocks; safe from any thread.
    pub fn cancel(&self) {
        self.channel.signal();
    }
}

/// Interactive single-line reader over a POSIX fd pair.
pub struct LineReader {
    core: Arc<Mutex<ReaderCore<FdSink>>>,
    cancel: Arc<CancelChannel>,
    in_fd: libc::c_int,
    out_fd: libc::c_int,
}

impl LineReader {
    pub fn new(options: ReaderOptions) -> io::Result<Self> {
        let cancel = Arc::new(CancelChannel::new()?);
        let core = ReaderCore::new(
            FdSink::new(options.out_fd),
            Some(InputMode::new(options.in_fd)),
            options.history_size,
            options.auto_history,
            options.hint_style,
        );

        Ok(Self {
            core: Arc::new(Mutex::new(core)),
            cancel,
            in_fd: options.in_fd,
            out_fd: options.out_fd,
        })
    }

    /// Read one line, blocking until it is committed, interrupted, or
    /// cancelled.
    pub fn getline(&mut self, prompt: impl Into<StyledPrompt>) -> Result<String, ReadError> {
        self.activate_if_idle(prompt.into());

        loop {
            let (input_ready, cancel_ready) =
                match poll_input_or_cancel(self.in_fd, self.cancel.read_fd()) {
                    Ok(ready) => ready,
                    Err(err) => {
                        self.lock_core().deactivate();
                        return Err(ReadError::Syscall(err));
                    }
                };

            // Cancellation wins over pending input from the same wakeup.
            if cancel_ready {
                self.cancel.drain();
                self.lock_core().deactivate();
                return Err(ReadError::Cancelled);
            }

            if !input_ready {
                continue;
            }

            let byte = match read_byte(self.in_fd) {
                Ok(Some(byte)) => byte,
                // Readiness can evaporate (spurious wakeup): just re-poll.
                Ok(None) => continue,
                Err(err) => {
                    self.lock_core().deactivate();
                    return Err(ReadError::Syscall(err));
                }
            };

            let mut core = self.lock_core();
            if let Some(outcome) = core.process_byte(byte) {
                core.deactivate();
                return outcome;
            }
        }
    }

    /// Single-step read: consumes at most one pending byte. `Ok(None)` means
    /// no terminal event was available.
    pub fn getline_nonblocking(
        &mut self,
        prompt: impl Into<StyledPrompt>,
    ) -> Result<Option<String>, ReadError> {
        self.activate_if_idle(prompt.into());

        if self.cancel.drain() {
            self.lock_core().deactivate();
            return Err(ReadError::Cancelled);
        }

        let byte = match read_byte(self.in_fd) {
            Ok(Some(byte)) => byte,
            Ok(None) => return Ok(None),
            Err(err) => {
                self.lock_core().deactivate();
                return Err(ReadError::Syscall(err));
            }
        };

        let mut core = self.lock_core();
        match core.process_byte(byte) {
            Some(Ok(line)) => {
                core.deactivate();
                Ok(Some(line))
            }
            Some(Err(err)) => {
                core.deactivate();
                Err(err)
            }
            None => Ok(None),
        }
    }

    /// Cancel an in-flight read from this thread.
    pub fn cancel(&self) {
        self.cancel.signal();
    }

    /// A clonable handle other threads can use to cancel reads.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            channel: Arc::clone(&self.cancel),
        }
    }

    pub fn clear_screen(&mut self) {
        let mut core = self.lock_core();
        if let Some(session) = core.session.as_mut() {
            session.clear_screen();
        } else {
            write_fd(self.out_fd, b"\x1b[2J\x1b[1;1H");
        }
    }

    /// Render `*` per code point on subsequent reads (password entry).
    pub fn mask(&mut self) {
        self.lock_core().masked = true;
    }

    pub fn unmask(&mut self) {
        self.lock_core().masked = false;
    }

    pub fn add_history(&mut self, line: &str) {
        self.lock_core().history.add(line);
    }

    pub fn save_history(&self, path: &Path) -> io::Result<()> {
        self.lock_core().history.save(path)
    }

    pub fn load_history(&mut self, path: &Path) {
        self.lock_core().history.load(path);
    }

    pub fn set_completion<F>(&mut self, callback: F)
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        self.lock_core().completion.set_callback(Box::new(callback));
    }

    pub fn set_hint<F>(&mut self, callback: F)
    where
        F: FnMut(&str) -> String + Send + 'static,
    {
        self.lock_core().callbacks.hint = Some(Box::new(callback));
    }

    pub fn set_colorization<F>(&mut self, callback: F)
    where
        F: FnMut(&str, &mut StyleWriter) + Send + 'static,
    {
        self.lock_core().callbacks.color = Some(Box::new(callback));
    }

    /// Pause rendering so the host can print to the shared terminal. The
    /// visible line is erased and raw mode released until the guard drops.
    pub fn suspend_output(&self) -> SuspendGuard<'_> {
        let mut core = self.lock_core();
        {
            let ReaderCore {
                session,
                input_mode,
                ..
            } = &mut *core;
            if let Some(session) = session.as_mut() {
                if let Some(mode) = input_mode.as_mut() {
                    mode.disable_raw();
                }
                session.erase_line_visual();
            }
        }
        SuspendGuard { core }
    }

    fn activate_if_idle(&self, prompt: StyledPrompt) {
        let mut core = self.lock_core();
        if !core.is_active() {
            core.activate(prompt, winsize_columns(self.out_fd));
        }
    }

    fn lock_core(&self) -> MutexGuard<'_, ReaderCore<FdSink>> {
        self.core.lock().expect("reader state lock poisoned")
    }
}

/// Holds the reader suspended; dropping restores raw mode and redraws.
pub struct SuspendGuard<'a> {
    core: MutexGuard<'a, ReaderCore<FdSink>>,
}

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        let ReaderCore {
            session,
            input_mode,
            ..
        } = &mut *self.core;
        if let Some(session) = session.as_mut() {
            if let Some(mode) = input_mode.as_mut() {
                mode.enable_raw();
            }
            session.redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReadError, ReaderCore};
    use crate::core::prompt::StyledPrompt;
    use crate::core::style::Style;
    use crate::render::output::test_sink::RecordingSink;

    fn active_core() -> (ReaderCore<RecordingSink>, RecordingSink) {
        let sink = RecordingSink::new();
        let mut core = ReaderCore::new(sink.clone(), None, 100, true, Style::default());
        core.activate(StyledPrompt::from("> "), Some(80));
        (core, sink)
    }

    fn feed(core: &mut ReaderCore<RecordingSink>, bytes: &[u8]) -> Option<Result<String, ReadError>> {
        for (i, &byte) in bytes.iter().enumerate() {
            let outcome = core.process_byte(byte);
            if outcome.is_some() {
                assert_eq!(i, bytes.len() - 1, "read ended early");
                return outcome;
            }
        }
        None
    }

    fn buffer_of(core: &ReaderCore<RecordingSink>) -> String {
        core.session.as_ref().expect("session active").current_line()
    }

    #[test]
    fn typed_line_commits_on_enter_and_lands_in_history() {
        let (mut core, _sink) = active_core();
        let outcome = feed(&mut core, &[0x61, 0x62, 0x63, 0x0D]);
        match outcome {
            Some(Ok(line)) => assert_eq!(line, "abc"),
            other => panic!("expected commit, got {other:?}"),
        }
        assert_eq!(core.history.committed(), vec!["abc"]);
    }

    #[test]
    fn ctrl_a_moves_insertion_to_the_start() {
        let (mut core, _sink) = active_core();
        assert!(feed(&mut core, b"abc\x01X").is_none());
        let outcome = feed(&mut core, b"\r");
        match outcome {
            Some(Ok(line)) => assert_eq!(line, "Xabc"),
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn ctrl_w_erases_the_previous_word() {
        let (mut core, _sink) = active_core();
        let expected = ["f", "fo", "foo", "foo ", ""];
        for (&byte, want) in b"foo \x17".iter().zip(expected.iter()) {
            assert!(core.process_byte(byte).is_none());
            assert_eq!(buffer_of(&core), *want);
        }

        // Enter on the now-empty buffer starts a fresh line, no commit.
        assert!(core.process_byte(0x0D).is_none());
        assert!(core.is_active());
    }

    #[test]
    fn ctrl_d_on_an_empty_buffer_is_end_of_file() {
        let (mut core, _sink) = active_core();
        match core.process_byte(0x04) {
            Some(Err(ReadError::EndOfFile)) => {}
            other => panic!("expected EndOfFile, got {other:?}"),
        }
    }

    #[test]
    fn ctrl_d_with_content_deletes_under_the_cursor() {
        let (mut core, _sink) = active_core();
        feed(&mut core, b"ab\x01");
        assert!(core.process_byte(0x04).is_none());
        assert_eq!(buffer_of(&core), "b");
    }

    #[test]
    fn ctrl_c_interrupts() {
        let (mut core, _sink) = active_core();
        feed(&mut core, b"whatever");
        match core.process_byte(0x03) {
            Some(Err(ReadError::Interrupted)) => {}
            other => panic!("expected Interrupted, got {other:?}"),
        }
    }

    #[test]
    fn multi_byte_input_decodes_to_code_points() {
        let (mut core, _sink) = active_core();
        assert!(feed(&mut core, &[0x68, 0xC3, 0xA9, 0x6C, 0x6C, 0x6F]).is_none());

        let session = core.session.as_ref().expect("session active");
        assert_eq!(session.buffer().len(), 5);
        assert_eq!(session.position(), 5);
        assert_eq!(session.buffer().total_width(), 5);

        match core.process_byte(0x0D) {
            Some(Ok(line)) => assert_eq!(line, "héllo"),
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn malformed_bytes_are_dropped_and_decoding_recovers() {
        let (mut core, _sink) = active_core();
        assert!(feed(&mut core, &[0xFF, 0x61]).is_none());
        assert_eq!(buffer_of(&core), "a");
    }

    #[test]
    fn surrogate_scalars_insert_a_replacement_character() {
        let (mut core, _sink) = active_core();
        // 0xED 0xA0 0x80 assembles to 0xD800, which has no `char` form.
        assert!(feed(&mut core, &[0xED, 0xA0, 0x80]).is_none());
        assert_eq!(buffer_of(&core), "\u{FFFD}");

        // The keystroke behaves like any other insert: Tab completes
        // against the replacement character.
        core.completion
            .set_callback(Box::new(|input: &str| vec![format!("{input}!")]));
        feed(&mut core, b"\t");
        assert_eq!(buffer_of(&core), "\u{FFFD}!");
    }

    #[test]
    fn tab_cycles_completions_and_returns_to_the_input() {
        let (mut core, _sink) = active_core();
        core.completion
            .set_callback(Box::new(|_| vec!["apple".to_string(), "ant".to_string()]));

        feed(&mut core, b"a\t");
        assert_eq!(buffer_of(&core), "apple");
        feed(&mut core, b"\t");
        assert_eq!(buffer_of(&core), "ant");
        feed(&mut core, b"\t");
        assert_eq!(buffer_of(&core), "a");

        // Typing resets the cycle; the next Tab queries the callback anew.
        feed(&mut core, b"x\t");
        assert_eq!(buffer_of(&core), "apple");
    }

    #[test]
    fn arrow_keys_route_through_the_escape_collector() {
        let (mut core, _sink) = active_core();
        feed(&mut core, b"ac");
        feed(&mut core, b"\x1b[D"); // left
        feed(&mut core, b"b");
        assert_eq!(buffer_of(&core), "abc");

        feed(&mut core, b"\x1b[H"); // home
        feed(&mut core, b"\x1b[3~"); // delete under cursor
        assert_eq!(buffer_of(&core), "bc");

        feed(&mut core, b"\x1bOF"); // end
        feed(&mut core, b"d");
        assert_eq!(buffer_of(&core), "bcd");
    }

    #[test]
    fn unknown_escape_sequences_are_discarded() {
        let (mut core, _sink) = active_core();
        feed(&mut core, b"ab");
        feed(&mut core, b"\x1b[Z");
        assert_eq!(buffer_of(&core), "ab");
        feed(&mut core, b"c");
        assert_eq!(buffer_of(&core), "abc");
    }

    #[test]
    fn history_navigation_round_trips_the_draft() {
        let (mut core, _sink) = active_core();
        assert!(matches!(feed(&mut core, b"older\r"), Some(Ok(_))));

        core.activate(StyledPrompt::from("> "), Some(80));
        feed(&mut core, b"draf");

        feed(&mut core, b"\x1b[A"); // up
        assert_eq!(buffer_of(&core), "older");
        feed(&mut core, b"\x1b[B"); // down
        assert_eq!(buffer_of(&core), "draf");

        // Ctrl-P / Ctrl-N mirror the arrows.
        feed(&mut core, b"\x10");
        assert_eq!(buffer_of(&core), "older");
        feed(&mut core, b"\x0E");
        assert_eq!(buffer_of(&core), "draf");
    }

    #[test]
    fn repeated_commits_of_the_same_line_do_not_stack() {
        let (mut core, _sink) = active_core();
        assert!(matches!(feed(&mut core, b"same\r"), Some(Ok(_))));
        core.activate(StyledPrompt::from("> "), Some(80));
        assert!(matches!(feed(&mut core, b"same\r"), Some(Ok(_))));
        assert_eq!(core.history.committed(), vec!["same"]);
    }

    #[test]
    fn masked_reads_ignore_tab_and_history_keys() {
        let sink = RecordingSink::new();
        let mut core = ReaderCore::new(sink.clone(), None, 100, true, Style::default());
        core.completion
            .set_callback(Box::new(|_| vec!["candidate".to_string()]));
        core.history.add("secret-history");
        core.masked = true;
        core.activate(StyledPrompt::from("pw: "), Some(80));
        sink.take();

        feed(&mut core, b"pw\t");
        assert_eq!(buffer_of(&core), "pw");
        feed(&mut core, b"\x1b[A");
        assert_eq!(buffer_of(&core), "pw");
        assert_eq!(sink.take(), "**");
    }

    #[test]
    fn swap_transposes_and_advances() {
        let (mut core, _sink) = active_core();
        feed(&mut core, b"ab\x14");
        assert_eq!(buffer_of(&core), "ba");

        // Mid-line: swap the char under the cursor with its predecessor.
        feed(&mut core, b"\x01\x06\x14");
        assert_eq!(buffer_of(&core), "ab");
    }

    #[test]
    fn kill_keys_erase_around_the_cursor() {
        let (mut core, _sink) = active_core();
        feed(&mut core, b"abcdef\x02\x02\x0B"); // left x2, Ctrl-K
        assert_eq!(buffer_of(&core), "abcd");

        feed(&mut core, b"\x02\x02\x15"); // left x2, Ctrl-U
        assert_eq!(buffer_of(&core), "cd");
    }
}
