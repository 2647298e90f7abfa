// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./claimline.toml` > `~/.config/claimline/claimline.toml`
//! > `/etc/claimline/claimline.toml` with environment variable overrides via the
//! `CLAIMLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ClaimlineConfig;

/// Config sections addressable from `CLAIMLINE_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &["log", "storage", "queue", "sweep", "gateway", "metrics"];

/// Path of the system-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/claimline/claimline.toml";

/// File name looked up in the working directory and the XDG config dir.
pub const CONFIG_FILE_NAME: &str = "claimline.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/claimline/claimline.toml` (system-wide)
/// 3. `~/.config/claimline/claimline.toml` (user XDG config)
/// 4. `./claimline.toml` (local directory)
/// 5. `CLAIMLINE_*` environment variables
pub fn load_config() -> Result<ClaimlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ClaimlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ClaimlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ClaimlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ClaimlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ClaimlineConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(CONFIG_FILE_NAME))
        .merge(env_provider())
}

/// `~/.config/claimline/claimline.toml`, if the platform has a config dir.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("claimline").join(CONFIG_FILE_NAME))
}

/// Create the environment variable provider.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `CLAIMLINE_QUEUE_LOCK_TIMEOUT_MS` maps to `queue.lock_timeout_ms`.
fn env_provider() -> Env {
    Env::prefixed("CLAIMLINE_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a prefix-stripped env var name to a lowercase dotted config path.
///
/// figment hands the key over in its original (usually upper) case.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}
