//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Local shell execution behind a mockable trait
//! - `io` - File I/O with consistent error handling
//! - `shell` - Shell escaping and quoting
//! - `template` - `{name}` placeholder parsing and resolution

pub mod command;
pub mod io;
pub mod shell;
pub mod template;
