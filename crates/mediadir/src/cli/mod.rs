//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the mediadir binary.

mod broker;
mod commands;
mod handlers;

pub use broker::ConsoleBroker;
pub use commands::{Cli, Commands, OutputFormat};
pub use handlers::{open_store, resolve_config, run};
