// Configuration loading from agenda.yml

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR: &str = "agenda";
const CONFIG_FILE: &str = "agenda.yml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// SQLite database file holding the sessions and speakers tables
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_database() -> PathBuf {
    PathBuf::from("agenda.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading config");
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a YAML string
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the user config file if it exists, else defaults
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/agenda/agenda.yml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    fn validate(&self) -> Result<()> {
        if self.database.as_os_str().is_empty() {
            return Err(Error::Config("database path cannot be empty".to_string()));
        }
        if let Some(level) = self
            .log_level
            .as_deref()
            .filter(|l| l.parse::<tracing::Level>().is_err())
        {
            return Err(Error::Config(format!("invalid log level: {}", level)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse("database: /tmp/conf.db\nlog_level: debug\n").unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/conf.db"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
        let config = Config::parse("log_level: warn").unwrap();
        assert_eq!(config.database, PathBuf::from("agenda.db"));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(matches!(Config::parse("database: ''"), Err(Error::Config(_))));
        assert!(matches!(Config::parse("log_level: loud"), Err(Error::Config(_))));
        assert!(matches!(Config::parse("databse: x.db"), Err(Error::Yaml(_))));
    }

    #[test]
    fn test_resolve_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("agenda.yml");
        std::fs::write(&path, "database: other.db\n").unwrap();

        let config = Config::resolve(Some(path.as_path())).unwrap();
        assert_eq!(config.database, PathBuf::from("other.db"));

        assert!(matches!(
            Config::resolve(Some(temp.path().join("missing.yml").as_path())),
            Err(Error::Io(_))
        ));
    }
}
