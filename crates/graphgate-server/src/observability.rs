//! Tracing setup.
//!
//! The subscriber is installed once at startup with a default filter. The
//! filter sits behind a reload layer so the level from `graphgate.toml` can be
//! applied after configuration has been loaded.

use std::sync::OnceLock;

use tracing::warn;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Outcome of [`apply_logging_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    Applied,
    /// `RUST_LOG` is set and takes precedence.
    OverriddenByEnv,
    /// No reloadable subscriber is installed.
    NotInstalled,
    Failed,
}

pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Installs the global subscriber. `RUST_LOG` wins over `level` when set and
/// valid. Calling this more than once leaves the first subscriber in place.
pub fn init_tracing_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let (filter_layer, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .try_init();

    match installed {
        Ok(()) => {
            if FILTER_HANDLE.set(handle).is_err() {
                warn!("Tracing filter handle was already registered");
            }
        }
        Err(e) => eprintln!("Tracing subscriber already installed: {e}"),
    }
}

/// Replaces the active filter with `level`.
pub fn apply_logging_level(level: &str) -> LevelChange {
    if std::env::var_os("RUST_LOG").is_some() {
        return LevelChange::OverriddenByEnv;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return LevelChange::NotInstalled;
    };

    let filter = match EnvFilter::try_new(level) {
        Ok(filter) => filter,
        Err(e) => {
            warn!(level, error = %e, "Invalid logging level; keeping current filter");
            return LevelChange::Failed;
        }
    };

    match handle.reload(filter) {
        Ok(()) => LevelChange::Applied,
        Err(e) => {
            warn!(level, error = %e, "Failed to apply logging level");
            LevelChange::Failed
        }
    }
}
