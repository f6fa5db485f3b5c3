//! # Applemar bot (library root)
//!
//! This crate provides the plumbing behind the Applemar customer-service bot:
//! - Reply generation with fixed fallbacks ([`reply`]) over pluggable
//!   generation backends ([`api`]).
//! - The persona ([`persona`]) and the system instruction rendered from it
//!   ([`template`]).
//! - Conversation turns and the history window ([`conversation`]).
//! - Persisted application state and settings edits ([`state`]).
//! - Live chat sessions and the contact roster ([`session`]).
//! - Simulated device pairing ([`connection`]).
//! - Operator notifications ([`notify`]).
//! - CLI parsing ([`commands`]) and configuration ([`config`]).
//!
//! ## Reply contract
//! [`reply::ReplyGenerator::generate_reply`] always returns a displayable string.
//! Upstream failures never reach the caller; they become one of two fixed
//! Portuguese apologies ([`reply::FALLBACK_EMPTY`], [`reply::FALLBACK_FAILURE`]).
//!
//! ## Configuration layout
//! Configuration and state live under your per-platform config directory, e.g.:
//!
//! - macOS: `~/Library/Application Support/com.applemar.applemar/`
//! - Linux (XDG): `~/.config/applemar/`
//! - Windows: `C:\Users\<you>\AppData\Roaming\applemar\applemar\config\`

use directories::ProjectDirs;
use std::error::Error;

pub mod api;
pub mod commands;
pub mod config;
pub mod connection;
pub mod conversation;
pub mod notify;
pub mod persona;
pub mod reply;
pub mod session;
pub mod state;
pub mod template;

/// Return the per-platform configuration directory.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "applemar", "applemar")`.
///
/// The directory is **not** created by this function.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined
/// (which is rare but possible in heavily sandboxed environments).
///
/// # Examples
/// ```no_run
/// let cfg = applemar_bot::config_dir().expect("has a config dir");
/// println!("config at {}", cfg.display());
/// ```
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "applemar", "applemar")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
