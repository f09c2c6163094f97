//! Purpose: Shared data-directory and acting-user resolution for the CLI.
//! Exports: `default_store_dir` and `default_user`.
//! Role: Keep CLI defaults in one place so tests can override via flags.
//! Invariants: Default store directory remains `~/.noticeboard`.

use std::path::PathBuf;

pub fn default_store_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".noticeboard")
}

pub fn default_user() -> String {
    std::env::var("USER")
        .ok()
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}
