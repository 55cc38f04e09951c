mod basic;
mod database;

pub use basic::BasicConfig;
pub use database::{BackendKind, DatabaseConfig};

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Storage settings (see `database` table in config.toml).
    #[serde(default)]
    pub database: DatabaseConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `config.toml` if present.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml): {err}")
        })
    }
}

/// Global, lazily-initialized configuration instance. Only the binary reads it;
/// library code takes configuration by reference.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_optional_toml);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_defaults() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [basic]
                loglevel = "debug"

                [database]
                backend = "document"
                max_connections = 2
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(cfg.basic.loglevel, "debug");
        assert_eq!(cfg.basic.listen_port, 8190);
        assert_eq!(cfg.database.backend, BackendKind::Document);
        assert_eq!(cfg.database.max_connections, 2);
        assert_eq!(cfg.database.url, "sqlite://data.db");
        assert!(cfg.database.run_migrations);
    }
}
