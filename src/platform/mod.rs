//! Platform integration: fd plumbing, termios raw mode, crash-path restore.

pub mod fd;
pub mod hooks;
pub mod raw_mode;

pub use hooks::{install_terminal_restore, install_terminal_restore_with, RestoreGuard};
