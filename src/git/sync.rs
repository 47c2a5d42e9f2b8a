//! Sync workflow over the tracked repositories from the global config.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::{GitConflictPolicy, GitSettings, RepositoryConfig};
use crate::paths;
use crate::utils::logger::{error, info, step, success};
use crate::utils::prompt::PromptHandler;

use super::messages::render_template;
use super::GitRepo;

/// Snapshot of one tracked repository, for the status command.
#[derive(Debug)]
pub struct RepoStatus {
    pub name: String,
    pub path: PathBuf,
    pub is_repo: bool,
    pub branch: Option<String>,
    pub dirty: bool,
}

pub fn repo_status(config: &RepositoryConfig) -> Result<RepoStatus> {
    let path = paths::expand(&config.path)?;
    if !GitRepo::is_repo(&path) {
        return Ok(RepoStatus {
            name: config.name.clone(),
            path,
            is_repo: false,
            branch: None,
            dirty: false,
        });
    }

    let repo = GitRepo::open(&path)?;
    Ok(RepoStatus {
        name: config.name.clone(),
        path,
        is_repo: true,
        branch: repo.current_branch().ok(),
        dirty: repo.has_changes()?,
    })
}

/// Bring every tracked repository up to date: clone it if absent,
/// auto-commit local changes when configured, pull, then push. Returns the
/// number of repositories that failed; failures never abort the batch.
pub fn sync_repositories(
    repositories: &[RepositoryConfig],
    settings: &GitSettings,
    push: bool,
    prompt: &dyn PromptHandler,
) -> usize {
    let mut failed = 0;
    for config in repositories {
        step(&format!("syncing {}", config.name));
        match sync_one(config, settings, push, prompt) {
            Ok(()) => success(&format!("{} is up to date", config.name)),
            Err(e) => {
                error(&format!("{}: {:#}", config.name, e));
                failed += 1;
            }
        }
    }
    failed
}

fn sync_one(
    config: &RepositoryConfig,
    settings: &GitSettings,
    push: bool,
    prompt: &dyn PromptHandler,
) -> Result<()> {
    let path = paths::expand(&config.path)?;

    if !GitRepo::is_repo(&path) {
        info(&format!(
            "cloning {} into {}",
            config.remote,
            path.display()
        ));
        GitRepo::clone_from(&config.remote, &path, config.branch.as_deref())?;
        return Ok(());
    }

    let repo = GitRepo::open(&path)?;

    if let Some(branch) = &config.branch {
        let current = repo.current_branch().context("cannot read current branch")?;
        if current != *branch {
            repo.switch_branch(branch, false)
                .with_context(|| format!("cannot switch to branch {}", branch))?;
        }
    }

    if config.auto_commit && repo.has_changes()? {
        let message = render_template(&settings.commit_message_template, &config.name);
        repo.commit(&message, true).context("auto-commit failed")?;
    }

    if repo.has_upstream() {
        let strategy = merge_strategy(settings, &config.name, prompt);
        repo.pull(config.branch.as_deref(), strategy)
            .context("pull failed")?;
    }

    if push && repo.has_upstream() {
        repo.push(config.branch.as_deref(), false)
            .context("push failed")?;
    }

    Ok(())
}

/// Which side wins when a pull hits merge conflicts.
fn merge_strategy(
    settings: &GitSettings,
    name: &str,
    prompt: &dyn PromptHandler,
) -> Option<&'static str> {
    match settings.conflict_resolution {
        GitConflictPolicy::Local => Some("ours"),
        GitConflictPolicy::Remote => Some("theirs"),
        GitConflictPolicy::Ask => {
            let keep_local = prompt.ask_yes_no(
                &format!("Keep local changes for {} on merge conflicts?", name),
                true,
            );
            if keep_local {
                Some("ours")
            } else {
                Some("theirs")
            }
        }
    }
}
