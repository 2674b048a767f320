//! Core editing types: codec, styles, the styled buffer, prompt, history,
//! and completion. Everything here is pure and platform-independent.

pub mod completion;
pub mod history;
pub mod prompt;
pub mod style;
pub mod text;
pub mod utf8;
