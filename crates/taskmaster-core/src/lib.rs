pub mod config;
pub mod datastore;
pub mod datetime;
pub mod draft;
pub mod filter;
pub mod kv;
pub mod logging;
pub mod repository;
pub mod session;
pub mod state;
pub mod task;

use std::path::Path;

use anyhow::Context;
use tracing::{
  debug,
  info
};

/// Loads configuration, installs
/// logging and restores the last
/// session. Views hold on to the
/// returned state for the process
/// lifetime.
#[tracing::instrument(skip_all)]
pub fn start(
  rc_override: Option<&Path>
) -> anyhow::Result<state::AppState> {
  let cfg =
    config::Config::load(rc_override)
      .context(
        "failed to load \
         configuration"
      )?;

  logging::init_tracing(
    &cfg.log_level()
  )?;

  info!(
    files = cfg.loaded_files.len(),
    "starting taskmaster"
  );
  debug!(?cfg.loaded_files, "loaded config files");

  state::AppState::from_config(&cfg)
    .context(
      "failed to initialize app \
       state"
    )
}
