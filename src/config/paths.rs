//! Canonical state paths for curator.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use curator::config::paths;
//!
//! let store = paths::library_store()?;
//! let log = paths::action_log()?;
//! ```

use std::path::PathBuf;

use anyhow::Result;

/// Get the curator home directory (~/.curator)
pub fn curator_home() -> Result<PathBuf> {
    crate::config::curator_home()
}

/// Get the library metadata store ($CURATOR_HOME/library.json)
pub fn library_store() -> Result<PathBuf> {
    Ok(curator_home()?.join("library.json"))
}

/// Get the action log ($CURATOR_HOME/actions.log)
pub fn action_log() -> Result<PathBuf> {
    Ok(curator_home()?.join("actions.log"))
}

/// Get the recycle directory: the configured one, else $CURATOR_HOME/recycle
pub fn recycle_dir() -> Result<PathBuf> {
    let config = crate::config::config()?;
    Ok(config
        .recycle
        .clone()
        .unwrap_or_else(|| config.home.join("recycle")))
}
