pub mod analyzer;
#[allow(clippy::module_inception)]
pub mod linker;

pub use analyzer::{TreeAnalysis, TreeAnalyzer};
pub use linker::Linker;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::utils::prompt::PromptHandler;

/// What to do when a target path is already occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Report the conflict and stop linking the module
    Fail,
    /// Leave the existing entry alone
    Skip,
    /// Import the existing entry into the source module
    Adopt,
    /// Move the existing entry aside and link over it
    Replace,
}

/// How eagerly whole directories are collapsed into one symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FoldStrategy {
    /// Fold only where the target directory does not already exist
    Directory,
    /// Also fold over empty or fully-managed target directories
    Aggressive,
}

/// How interactive questions are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Ask on the prompt channel
    None,
    /// Take each question's documented default
    Default,
    /// Answer every question with yes
    Yes,
    /// Answer every question with no
    No,
}

impl ForceMode {
    /// Project this mode onto one yes/no question.
    pub fn decide(self, prompt: &dyn PromptHandler, question: &str, default: bool) -> bool {
        match self {
            ForceMode::Yes => true,
            ForceMode::No => false,
            ForceMode::Default => default,
            ForceMode::None => prompt.ask_yes_no(question, default),
        }
    }
}

/// Per-module, per-invocation linking configuration.
#[derive(Debug, Clone)]
pub struct LinkerOptions {
    pub verbose: bool,
    pub ignore_patterns: Vec<String>,
    pub conflict_policy: ConflictPolicy,
    pub fold_strategy: FoldStrategy,
    pub backup_conflicts: bool,
    pub backup_suffix: String,
    pub force: ForceMode,
}

impl Default for LinkerOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            ignore_patterns: vec![".git".to_string()],
            conflict_policy: ConflictPolicy::Fail,
            fold_strategy: FoldStrategy::Directory,
            backup_conflicts: true,
            backup_suffix: "bkp".to_string(),
            force: ForceMode::None,
        }
    }
}

/// Counters accumulated by one link run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkingStats {
    pub files_linked: usize,
    pub dirs_linked: usize,
    pub files_skipped: usize,
    pub conflicts_resolved: usize,
    pub files_adopted: usize,
    pub backups_created: usize,
}

impl LinkingStats {
    pub fn merge(&mut self, other: &LinkingStats) {
        self.files_linked += other.files_linked;
        self.dirs_linked += other.dirs_linked;
        self.files_skipped += other.files_skipped;
        self.conflicts_resolved += other.conflicts_resolved;
        self.files_adopted += other.files_adopted;
        self.backups_created += other.backups_created;
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files linked, {} directories linked, {} skipped, {} conflicts resolved, {} adopted, {} backups",
            self.files_linked,
            self.dirs_linked,
            self.files_skipped,
            self.conflicts_resolved,
            self.files_adopted,
            self.backups_created
        )
    }
}
