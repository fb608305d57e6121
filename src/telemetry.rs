// Logging setup

use std::str::FromStr;

use tracing::Level;

use crate::config::Settings;

/// Install a `tracing-subscriber` fmt subscriber at the configured level.
///
/// An unrecognised level falls back to `INFO`. Returns false when a global
/// subscriber was already installed, so calling this more than once is
/// harmless.
pub fn init_tracing(settings: &Settings) -> bool {
    let level = Level::from_str(&settings.log_level).unwrap_or(Level::INFO);

    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(%level, "tracing initialized");
    }
    installed
}
