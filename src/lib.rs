//! proc-status-page library.
//!
//! A single HTML status page showing this process's identity, its memory
//! counters and a cached process listing for the current user.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod handlers;
pub mod identity;
pub mod listing;
pub mod memory;
pub mod state;

pub use cache::{StatusCache, StatusSnapshot, StatusSource, SystemSource};
pub use config::Config;
pub use identity::Identity;
pub use listing::{ListingCommand, ListingError, ListingFailure};
pub use memory::MemoryStats;
pub use state::{AppState, SharedState};
