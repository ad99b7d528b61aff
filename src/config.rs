use std::{path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "cserve.toml";
pub const ENV_PREFIX: &str = "CSERVE_";

/// Service settings, read from `cserve.toml` and `CSERVE_*` variables.
///
/// Loaded once by the binaries and passed down explicitly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_address: String,
    pub library_dir: PathBuf,
    pub channels_file: PathBuf,
    /// Look-ahead of a schedule preview when the request names none.
    pub schedule_hours: u32,
    pub max_schedule_hours: u32,
    pub enrichment_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            library_dir: PathBuf::from("libraries"),
            channels_file: PathBuf::from("channels.json"),
            schedule_hours: 24,
            max_schedule_hours: 24 * 14,
            enrichment_timeout_ms: 2_000,
        }
    }
}

impl Config {
    pub fn figment(file: Option<PathBuf>) -> Figment {
        let file = file.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Figment::new()
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(file: Option<PathBuf>) -> Result<Self> {
        Ok(Self::figment(file).extract()?)
    }

    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_millis(self.enrichment_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        Jail::expect_with(|_jail| {
            let config: Config = Config::figment(None).extract()?;
            assert_eq!(config.bind_address, "127.0.0.1:8080");
            assert_eq!(config.schedule_hours, 24);
            assert_eq!(config.enrichment_timeout(), Duration::from_secs(2));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                bind_address = "0.0.0.0:9000"
                library_dir = "/srv/media"
                schedule_hours = 6
                "#,
            )?;
            jail.set_env("CSERVE_SCHEDULE_HOURS", "12");

            let config: Config = Config::figment(None).extract()?;
            assert_eq!(config.bind_address, "0.0.0.0:9000");
            assert_eq!(config.library_dir, PathBuf::from("/srv/media"));
            assert_eq!(config.schedule_hours, 12);
            assert_eq!(config.channels_file, PathBuf::from("channels.json"));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file() {
        Jail::expect_with(|jail| {
            jail.create_file("other.toml", "enrichment_timeout_ms = 250")?;
            let config = Config::load(Some(PathBuf::from("other.toml"))).unwrap();
            assert_eq!(config.enrichment_timeout(), Duration::from_millis(250));
            Ok(())
        });
    }
}
