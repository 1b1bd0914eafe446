//! Collect command implementation.
//!
//! Performs a single collection outside the HTTP server and prints it.

use anyhow::Result;

use crate::config::Config;
use crate::handlers::status::render_status_page;
use crate::state::build_state;

/// Collects one snapshot and prints the rendered page (or only the listing).
pub async fn command_collect(config: Config, listing_only: bool) -> Result<()> {
    let state = build_state(config)?;
    let snapshot = state.cache.refresh_if_stale().await;

    if listing_only {
        println!("{}", snapshot.listing);
    } else {
        println!(
            "{}",
            render_status_page(state.config.title(), &state.identity, &snapshot)
        );
    }

    if !snapshot.listing_ok {
        eprintln!("process listing failed; see the output above");
    }
    Ok(())
}
