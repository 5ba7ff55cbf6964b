// Engine
pub mod action;
pub mod binding;
pub mod runner;
pub mod session;
pub mod step;
pub mod variables;

// Inputs and outputs
pub mod config;
pub mod operator;
pub mod report;
pub mod sources;

pub mod defaults;
pub mod error;
pub mod paths;

pub use error::{Error, ErrorCode, Hint, Result};
