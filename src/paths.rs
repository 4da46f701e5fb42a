//! Where chapar keeps its files
//!
//! Everything lives under `~/.config/chapar/` on all platforms:
//! - `config.toml` - user configuration
//! - `session.enc` - encrypted session cookies
//! - `chapar.log` - log output while the TUI owns the terminal

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `~/.config/chapar/`, created on first use
pub fn chapar_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join("chapar");
    fs::create_dir_all(&dir).context("Failed to create chapar directory")?;
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(chapar_dir()?.join("config.toml"))
}

pub fn session_path() -> Result<PathBuf> {
    Ok(chapar_dir()?.join("session.enc"))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(chapar_dir()?.join("chapar.log"))
}
