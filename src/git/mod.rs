//! Git operations for the tracked repositories that back the modules.
//!
//! Everything shells out to the `git` binary; nothing here touches the
//! linking core.

pub mod messages;
pub mod sync;

pub use sync::{sync_repositories, RepoStatus};

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

/// Handle on one tracked repository.
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    pub fn open(path: &Path) -> Result<Self> {
        if !Self::is_repo(path) {
            anyhow::bail!("not a git repository: {}", path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn is_repo(path: &Path) -> bool {
        path.join(".git").exists()
    }

    pub fn clone_from(remote: &str, path: &Path, branch: Option<&str>) -> Result<Self> {
        let mut cmd = Command::new("git");
        cmd.arg("clone");
        if let Some(branch) = branch {
            cmd.arg("--branch").arg(branch);
        }
        cmd.arg(remote).arg(path);

        let output = cmd.output().context("failed to run git clone")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("clone of {} failed: {}", remote, stderr.trim());
        }
        Self::open(path)
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.path)
            .args(args)
            .output()
            .with_context(|| format!("failed to run git {}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn has_changes(&self) -> Result<bool> {
        Ok(!self.git(&["status", "--porcelain"])?.is_empty())
    }

    pub fn current_branch(&self) -> Result<String> {
        Ok(self.git(&["branch", "--show-current"])?.trim().to_string())
    }

    /// Pull from the remote, optionally biasing merge conflicts toward one
    /// side (`ours` keeps local content, `theirs` takes the remote's).
    pub fn pull(&self, branch: Option<&str>, strategy: Option<&str>) -> Result<()> {
        let mut args = vec!["pull"];
        let strategy_arg;
        if let Some(strategy) = strategy {
            strategy_arg = format!("-X{}", strategy);
            args.push(&strategy_arg);
        }
        if let Some(branch) = branch {
            args.push("origin");
            args.push(branch);
        }
        self.git(&args)?;
        Ok(())
    }

    pub fn push(&self, branch: Option<&str>, force: bool) -> Result<()> {
        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        if let Some(branch) = branch {
            args.push("origin");
            args.push(branch);
        }
        self.git(&args)?;
        Ok(())
    }

    pub fn commit(&self, message: &str, add_all: bool) -> Result<()> {
        if add_all {
            self.git(&["add", "-A"])?;
        }
        self.git(&["commit", "-m", message])?;
        Ok(())
    }

    pub fn switch_branch(&self, branch: &str, create: bool) -> Result<()> {
        if create {
            self.git(&["checkout", "-b", branch])?;
        } else {
            self.git(&["checkout", branch])?;
        }
        Ok(())
    }

    pub fn has_upstream(&self) -> bool {
        self.git(&["rev-parse", "--abbrev-ref", "@{u}"]).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo(dir: &Path) -> GitRepo {
        for args in [
            vec!["init"],
            vec!["config", "user.email", "test@example.com"],
            vec!["config", "user.name", "Test User"],
        ] {
            Command::new("git")
                .args(&args)
                .current_dir(dir)
                .output()
                .unwrap();
        }
        GitRepo::open(dir).unwrap()
    }

    #[test]
    fn test_open_rejects_non_repo() {
        let temp = TempDir::new().unwrap();
        assert!(!GitRepo::is_repo(temp.path()));
        assert!(GitRepo::open(temp.path()).is_err());
    }

    #[test]
    fn test_has_changes_and_commit() {
        let temp = TempDir::new().unwrap();
        let repo = init_repo(temp.path());

        assert!(!repo.has_changes().unwrap());

        fs::write(temp.path().join("f.txt"), "content").unwrap();
        assert!(repo.has_changes().unwrap());

        repo.commit("add f.txt", true).unwrap();
        assert!(!repo.has_changes().unwrap());
    }

    #[test]
    fn test_switch_branch_create() {
        let temp = TempDir::new().unwrap();
        let repo = init_repo(temp.path());
        fs::write(temp.path().join("f.txt"), "x").unwrap();
        repo.commit("initial", true).unwrap();

        repo.switch_branch("feature", true).unwrap();
        assert_eq!(repo.current_branch().unwrap(), "feature");
    }
}
