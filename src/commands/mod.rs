//! CLI command implementations for proc-status-page.
//!
//! - `config`: configuration file generation and display
//! - `collect`: one-shot status collection

pub mod collect;
pub mod config;

pub use collect::command_collect;
pub use config::{command_config, show_config};
