//! Application state shared across HTTP handlers.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{StatusCache, SystemSource};
use crate::config::Config;
use crate::identity::Identity;
use crate::listing::ListingCommand;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Everything the status page needs, created once at startup.
pub struct AppState {
    pub cache: StatusCache,
    pub identity: Identity,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(cache: StatusCache, identity: Identity, config: Config) -> SharedState {
        Arc::new(Self {
            cache,
            identity,
            config: Arc::new(config),
        })
    }
}

/// Resolves the process identity and wires the production status source.
pub fn build_state(config: Config) -> Result<SharedState> {
    let identity = Identity::resolve(config.user.as_deref());
    info!(
        "Status page for {} (pid {}, user '{}')",
        identity.executable, identity.pid, identity.user
    );

    let command = ListingCommand::from_template(
        &config.listing_command(),
        &identity.user,
        config.listing_timeout(),
    )
    .context("listing_command must not be empty")?;
    debug!("Process listing command: {}", command);

    let cache = StatusCache::new(
        Arc::new(SystemSource::new(command)),
        config.stale_after(),
    );
    Ok(AppState::new(cache, identity, config))
}
