// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./voteros.toml` > `~/.config/voteros/voteros.toml` >
//! `/etc/voteros/voteros.toml`, with environment variable overrides via the
//! `VOTEROS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::VoterosConfig;

/// Top-level sections, used to map `VOTEROS_<SECTION>_<KEY>` env vars.
const SECTIONS: [&str; 5] = ["app", "backend", "realtime", "sync", "functions"];

/// Config files in merge order (earlier entries are overridden by later ones).
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/voteros/voteros.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("voteros").join("voteros.toml"));
    }
    paths.push(PathBuf::from("voteros.toml"));
    paths
}

/// Build the layered Figment: defaults, config files, then env vars.
pub fn build_figment() -> Figment {
    config_file_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(VoterosConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
pub fn load_config() -> Result<VoterosConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<VoterosConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VoterosConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VoterosConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VoterosConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `VOTEROS_BACKEND_API_KEY` to `backend.api_key`.
///
/// Keys arrive upper-cased. Only the first underscore after a known section
/// name becomes a dot; `Env::split("_")` would also split `api_key`.
fn env_provider() -> Env {
    Env::prefixed("VOTEROS_").map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or(key)
            .into()
    })
}
