//! Unlink by module name alone, without explicit source/target roots.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;
use crate::modules::{ModuleDescriptor, DESCRIPTOR_NAME};
use crate::paths::{self, PathKind};
use crate::utils::logger::{success, warning};

/// Removes the symlinks that point into one named module directory.
///
/// Module names are resolved against `base_dir` (the caller passes its
/// working directory); the target to sweep comes from the module's
/// descriptor, falling back to the home directory.
pub struct SimpleUnlinker {
    base_dir: PathBuf,
}

impl SimpleUnlinker {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Returns the number of symlinks removed.
    pub fn unlink(&self, name: &str) -> Result<usize> {
        let path = self.base_dir.join(name);
        match paths::classify(&path) {
            PathKind::Missing => {
                warning(&format!("{} does not exist", path.display()));
                Ok(0)
            }
            PathKind::Symlink => {
                fs::remove_file(&path)?;
                success(&format!("removed {}", path.display()));
                Ok(1)
            }
            PathKind::Dir => self.sweep_target(&path),
            PathKind::File | PathKind::Other => {
                warning(&format!(
                    "{} is neither a module directory nor a symlink",
                    path.display()
                ));
                Ok(0)
            }
        }
    }

    /// Walk the module's effective target and delete every symlink whose
    /// destination lies under the module directory.
    fn sweep_target(&self, module_dir: &Path) -> Result<usize> {
        let descriptor_path = module_dir.join(DESCRIPTOR_NAME);
        let target = if descriptor_path.is_file() {
            match ModuleDescriptor::parse_file(&descriptor_path)?.target_dir {
                Some(raw) => paths::expand(&raw)?,
                None => paths::home_dir()?,
            }
        } else {
            paths::home_dir()?
        };
        let target = paths::canonicalize(&target).unwrap_or(target);
        let module_real = paths::canonicalize(module_dir)?;

        let mut removed = 0;
        for entry in WalkDir::new(&target)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.path_is_symlink() {
                continue;
            }
            let link = entry.path();
            let text = match fs::read_link(link) {
                Ok(text) => text,
                Err(e) => {
                    warning(&format!("unreadable symlink {}: {}", link.display(), e));
                    continue;
                }
            };
            if paths::resolve_link(link, &text).starts_with(&module_real) {
                fs::remove_file(link)?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs as unix_fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_module_is_a_noop() {
        let temp = TempDir::new().unwrap();
        let unlinker = SimpleUnlinker::new(temp.path().to_path_buf());
        assert_eq!(unlinker.unlink("ghost").unwrap(), 0);
    }

    #[test]
    fn test_top_level_symlink_is_removed() {
        let temp = TempDir::new().unwrap();
        unix_fs::symlink("/somewhere", temp.path().join("vim")).unwrap();

        let unlinker = SimpleUnlinker::new(temp.path().to_path_buf());
        assert_eq!(unlinker.unlink("vim").unwrap(), 1);
        assert!(!temp.path().join("vim").is_symlink());
    }

    #[test]
    fn test_sweep_removes_links_into_module_only() {
        let base = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();

        let module = base.path().join("vim");
        fs::create_dir_all(module.join("sub")).unwrap();
        fs::write(module.join(".vimrc"), "x").unwrap();
        fs::write(
            module.join(DESCRIPTOR_NAME),
            format!("target_dir = \"{}\"", target.path().display()),
        )
        .unwrap();

        let module_real = fs::canonicalize(&module).unwrap();
        unix_fs::symlink(module_real.join(".vimrc"), target.path().join(".vimrc")).unwrap();
        unix_fs::symlink(module_real.join("sub"), target.path().join("sub")).unwrap();
        unix_fs::symlink("/etc/hosts", target.path().join("hosts")).unwrap();

        let unlinker = SimpleUnlinker::new(base.path().to_path_buf());
        assert_eq!(unlinker.unlink("vim").unwrap(), 2);
        assert!(!target.path().join(".vimrc").exists());
        assert!(!target.path().join("sub").exists());
        assert!(target.path().join("hosts").is_symlink());
    }

    #[test]
    fn test_sweep_matches_relative_link_text() {
        let root = TempDir::new().unwrap();
        let real = fs::canonicalize(root.path()).unwrap();
        let module = real.join("vim");
        let target = real.join("home");
        fs::create_dir_all(&module).unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::write(module.join(".vimrc"), "x").unwrap();
        fs::write(
            module.join(DESCRIPTOR_NAME),
            format!("target_dir = \"{}\"", target.display()),
        )
        .unwrap();

        unix_fs::symlink("../vim/.vimrc", target.join(".vimrc")).unwrap();

        let unlinker = SimpleUnlinker::new(real.clone());
        assert_eq!(unlinker.unlink("vim").unwrap(), 1);
        assert!(!target.join(".vimrc").exists());
    }
}
