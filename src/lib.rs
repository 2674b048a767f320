//! Interactive single-line terminal editor.
//!
//! Reads one line at a time from an ANSI/VT terminal with editing keys,
//! Unicode-aware display, history navigation, tab completion, inline hints,
//! and syntax colorization, while emitting the minimum escape stream needed
//! to keep the screen in step with the buffer.
//!
//! Invariant: single output gate — only `render::output::OutputGate::flush(..)`
//! writes to the terminal.
//!
//! ```no_run
//! use lineflow::{LineReader, ReaderOptions};
//!
//! let mut reader = LineReader::new(ReaderOptions::default())?;
//! reader.set_completion(|input| {
//!     ["help", "history", "halt"]
//!         .iter()
//!         .filter(|cmd| cmd.starts_with(input))
//!         .map(|cmd| cmd.to_string())
//!         .collect()
//! });
//!
//! match reader.getline("> ") {
//!     Ok(line) => println!("read: {line}"),
//!     Err(err) => eprintln!("no line: {err}"),
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

#[cfg(unix)]
pub mod config;
pub mod core;

#[cfg(unix)]
pub mod platform;
pub mod render;
#[cfg(unix)]
pub mod runtime;

#[cfg(unix)]
pub use crate::config::ReaderOptions;
pub use crate::core::prompt::StyledPrompt;
pub use crate::core::style::{Color, Style, StyleWriter};
pub use crate::core::text::StyledText;
pub use crate::core::utf8::{
    decode_utf8, encode_scalar, encode_utf8, is_continuation_byte, DecodeError, EncodeError,
    Utf8Decoder,
};

#[cfg(unix)]
pub use crate::platform::{install_terminal_restore, install_terminal_restore_with, RestoreGuard};
pub use crate::render::output::{OutputGate, TermSink};
pub use crate::render::view::TermView;
#[cfg(unix)]
pub use crate::runtime::{CancelHandle, LineReader, ReadError, SuspendGuard};
