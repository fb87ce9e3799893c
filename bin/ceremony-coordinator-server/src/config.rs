//! File-backed configuration, layered over [`EngineConfig`]'s defaults.
//!
//! A `config::Config` builder seeded with the in-code defaults, then
//! overlaid with whatever the operator's TOML file sets.

use ceremony_primitives::EngineConfig;
use config::Config;
use serde::{Deserialize, Serialize};

/// One entry of the static allowlist the reference `IdentityProvider` reads.
/// A real deployment would replace this with an OAuth/OIDC resolver; the
/// bearer token format here is opaque and operator-chosen.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityEntry {
    pub bearer_token: String,
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub coordinator: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub identities: Vec<IdentityEntry>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { engine: EngineConfig::default(), identities: Vec::new() }
    }
}

impl ServerConfig {
    pub fn load(config_file: Option<&str>) -> anyhow::Result<Self> {
        let defaults = Config::try_from(&ServerConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = config_file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let merged = builder.build()?;
        let config: ServerConfig = merged.try_deserialize()?;
        config.engine.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }
}
