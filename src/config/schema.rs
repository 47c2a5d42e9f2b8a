use serde::{Deserialize, Serialize};

use crate::linker::{ConflictPolicy, FoldStrategy};

/// The global configuration file, TOML at
/// `~/.config/ndmgr/config.toml`. Every section has working defaults so a
/// missing file means a usable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub settings: Settings,
    pub linking: LinkingConfig,
    pub git: GitSettings,
    #[serde(rename = "repository")]
    pub repositories: Vec<RepositoryConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Target base for deployment; home directory when unset
    pub default_target: Option<String>,
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingConfig {
    pub conflict_resolution: ConflictPolicy,
    pub tree_folding: FoldStrategy,
    pub backup_conflicts: bool,
    pub backup_suffix: String,
    pub scan_depth: u32,
    pub ignore_patterns: Vec<String>,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            conflict_resolution: ConflictPolicy::Fail,
            tree_folding: FoldStrategy::Directory,
            backup_conflicts: true,
            backup_suffix: "bkp".to_string(),
            scan_depth: 2,
            ignore_patterns: vec![".git".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    pub conflict_resolution: GitConflictPolicy,
    pub commit_message_template: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            conflict_resolution: GitConflictPolicy::Ask,
            commit_message_template: "ndmgr: sync {name} {date}".to_string(),
        }
    }
}

/// Which side wins when pulling a tracked repository hits conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitConflictPolicy {
    Local,
    Remote,
    Ask,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    pub path: String,
    pub remote: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub auto_commit: bool,
}
