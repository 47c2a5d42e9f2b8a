//! Bounded walk of the source root that identifies modules.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NdmgrError, Result};
use crate::matcher;
use crate::paths::{self, PathKind};

use super::descriptor::{ModuleDescriptor, DESCRIPTOR_NAME};
use super::{ConflictInfo, Module};

pub struct ModuleScanner {
    source_root: PathBuf,
    depth: u32,
    ignore_patterns: Vec<String>,
}

impl ModuleScanner {
    pub fn new(source_root: PathBuf, depth: u32, ignore_patterns: Vec<String>) -> Self {
        Self {
            source_root,
            depth: depth.max(1),
            ignore_patterns,
        }
    }

    /// Discover modules under the source root, sorted by name with the
    /// full path as tie-break.
    pub fn scan(&self) -> Result<Vec<Module>> {
        let root =
            paths::canonicalize(&self.source_root).map_err(|_| NdmgrError::SourceUnreadable {
                path: self.source_root.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "source root not found"),
            })?;

        let mut modules = Vec::new();
        self.scan_dir(&root, 0, &mut modules)?;
        modules.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        Ok(modules)
    }

    fn scan_dir(&self, dir: &Path, depth: u32, out: &mut Vec<Module>) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|e| NdmgrError::SourceUnreadable {
            path: dir.to_path_buf(),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| NdmgrError::SourceUnreadable {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if matcher::is_ignored(&name, &self.ignore_patterns) {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }

            let path = entry.path();
            let config_path = path.join(DESCRIPTOR_NAME);
            if config_path.is_file() {
                let descriptor = ModuleDescriptor::parse_file(&config_path)?;
                out.push(Module {
                    name,
                    path,
                    config_path,
                    target_dir: descriptor.target_dir,
                    ignore: descriptor.ignore,
                });
            } else if depth + 1 < self.depth {
                self.scan_dir(&path, depth + 1, out)?;
            }
        }

        Ok(())
    }

    /// Whether deploying `module` to `target_base/<name>` would collide
    /// with an existing entry. A symlink that already points at the module
    /// is not a conflict.
    pub fn preview_conflict(
        &self,
        module: &Module,
        target_base: &Path,
    ) -> Result<Option<ConflictInfo>> {
        let slot = target_base.join(&module.name);
        match paths::classify(&slot) {
            PathKind::Missing => Ok(None),
            PathKind::Symlink => {
                let text = paths::read_link(&slot)?;
                let resolved = paths::resolve_link(&slot, &text);
                let module_path = paths::canonicalize(&module.path)?;
                if resolved == module_path {
                    Ok(None)
                } else {
                    Ok(Some(ConflictInfo::ExistingSymlink {
                        path: slot,
                        link_target: text,
                    }))
                }
            }
            PathKind::Dir => Ok(Some(ConflictInfo::ExistingDirectory { path: slot })),
            PathKind::File | PathKind::Other => {
                Ok(Some(ConflictInfo::ExistingFile { path: slot }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn module_dir(root: &Path, name: &str, descriptor: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DESCRIPTOR_NAME), descriptor).unwrap();
        dir
    }

    #[test]
    fn test_scan_finds_sorted_modules() {
        let temp = TempDir::new().unwrap();
        module_dir(temp.path(), "zsh", "");
        module_dir(temp.path(), "vim", "description = editor");

        let scanner = ModuleScanner::new(temp.path().to_path_buf(), 1, vec![]);
        let modules = scanner.scan().unwrap();

        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["vim", "zsh"]);
    }

    #[test]
    fn test_depth_one_only_sees_direct_children() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("tools");
        fs::create_dir_all(&nested).unwrap();
        module_dir(&nested, "git", "");

        let scanner = ModuleScanner::new(temp.path().to_path_buf(), 1, vec![]);
        assert!(scanner.scan().unwrap().is_empty());

        let scanner = ModuleScanner::new(temp.path().to_path_buf(), 2, vec![]);
        let modules = scanner.scan().unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "git");
    }

    #[test]
    fn test_module_dirs_are_not_recursed_into() {
        let temp = TempDir::new().unwrap();
        let outer = module_dir(temp.path(), "outer", "");
        module_dir(&outer, "inner", "");

        let scanner = ModuleScanner::new(temp.path().to_path_buf(), 3, vec![]);
        let modules = scanner.scan().unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "outer");
    }

    #[test]
    fn test_ignored_names_are_never_scanned() {
        let temp = TempDir::new().unwrap();
        module_dir(temp.path(), ".git", "");
        module_dir(temp.path(), "vim", "");

        let scanner =
            ModuleScanner::new(temp.path().to_path_buf(), 1, vec![".git".to_string()]);
        let modules = scanner.scan().unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "vim");
    }

    #[test]
    fn test_descriptor_overrides_are_captured() {
        let temp = TempDir::new().unwrap();
        module_dir(temp.path(), "skip", "ignore = true");
        module_dir(temp.path(), "custom", "target_dir = \"~/elsewhere\"");

        let scanner = ModuleScanner::new(temp.path().to_path_buf(), 1, vec![]);
        let modules = scanner.scan().unwrap();

        let skip = modules.iter().find(|m| m.name == "skip").unwrap();
        assert!(skip.ignore);
        let custom = modules.iter().find(|m| m.name == "custom").unwrap();
        assert_eq!(custom.target_dir.as_deref(), Some("~/elsewhere"));
    }

    #[test]
    fn test_preview_conflict_cases() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        module_dir(source.path(), "vim", "");

        let scanner = ModuleScanner::new(source.path().to_path_buf(), 1, vec![]);
        let module = scanner.scan().unwrap().remove(0);

        assert!(scanner
            .preview_conflict(&module, target.path())
            .unwrap()
            .is_none());

        fs::write(target.path().join("vim"), "occupied").unwrap();
        assert!(matches!(
            scanner.preview_conflict(&module, target.path()).unwrap(),
            Some(ConflictInfo::ExistingFile { .. })
        ));

        fs::remove_file(target.path().join("vim")).unwrap();
        fs::create_dir(target.path().join("vim")).unwrap();
        assert!(matches!(
            scanner.preview_conflict(&module, target.path()).unwrap(),
            Some(ConflictInfo::ExistingDirectory { .. })
        ));
    }

    #[test]
    fn test_preview_symlink_to_module_is_no_conflict() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let dir = module_dir(source.path(), "vim", "");

        let scanner = ModuleScanner::new(source.path().to_path_buf(), 1, vec![]);
        let module = scanner.scan().unwrap().remove(0);

        let real = fs::canonicalize(&dir).unwrap();
        std::os::unix::fs::symlink(&real, target.path().join("vim")).unwrap();
        assert!(scanner
            .preview_conflict(&module, target.path())
            .unwrap()
            .is_none());

        fs::remove_file(target.path().join("vim")).unwrap();
        std::os::unix::fs::symlink("/somewhere/else", target.path().join("vim")).unwrap();
        assert!(matches!(
            scanner.preview_conflict(&module, target.path()).unwrap(),
            Some(ConflictInfo::ExistingSymlink { .. })
        ));
    }
}
