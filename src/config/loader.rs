use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::schema::Config;

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ndmgr").join("config.toml"))
}

/// Load the global configuration. A missing file yields the defaults; a
/// present but malformed file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.linking.scan_depth < 1 {
        anyhow::bail!("linking.scan_depth must be at least 1");
    }
    if config.linking.backup_suffix.trim_start_matches('.').is_empty() {
        anyhow::bail!("linking.backup_suffix cannot be empty");
    }
    for repository in &config.repositories {
        if repository.name.is_empty() {
            anyhow::bail!("repository entries need a name");
        }
        if repository.path.is_empty() {
            anyhow::bail!("repository {} needs a path", repository.name);
        }
    }
    Ok(())
}
