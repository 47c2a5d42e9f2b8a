//! Fold analysis: which source subdirectories may become a single
//! directory symlink at the target.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NdmgrError, Result};
use crate::matcher;
use crate::modules::DESCRIPTOR_NAME;
use crate::paths::{self, PathKind};

use super::{ConflictPolicy, FoldStrategy, LinkerOptions};

/// Fold decisions keyed by module-relative directory path. Built once at
/// the start of a link run and consumed by the linker.
#[derive(Debug, Default)]
pub struct TreeAnalysis {
    foldable: HashMap<PathBuf, bool>,
}

impl TreeAnalysis {
    pub fn is_foldable(&self, rel: &Path) -> bool {
        self.foldable.get(rel).copied().unwrap_or(false)
    }

    fn set(&mut self, rel: PathBuf, foldable: bool) {
        self.foldable.insert(rel, foldable);
    }
}

pub struct TreeAnalyzer<'a> {
    source: &'a Path,
    target: &'a Path,
    managed_root: &'a Path,
    options: &'a LinkerOptions,
}

impl<'a> TreeAnalyzer<'a> {
    pub fn new(
        source: &'a Path,
        target: &'a Path,
        managed_root: &'a Path,
        options: &'a LinkerOptions,
    ) -> Self {
        Self {
            source,
            target,
            managed_root,
            options,
        }
    }

    pub fn analyze(&self) -> Result<TreeAnalysis> {
        let mut analysis = TreeAnalysis::default();
        let mut visited = HashSet::new();
        self.analyze_dir(Path::new(""), &mut analysis, &mut visited)?;
        Ok(analysis)
    }

    fn analyze_dir(
        &self,
        rel: &Path,
        analysis: &mut TreeAnalysis,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let dir = self.source.join(rel);
        // bound traversal over self-referential symlinks
        if let Ok(real) = paths::canonicalize(&dir) {
            if !visited.insert(real) {
                return Ok(());
            }
        }

        let entries = fs::read_dir(&dir).map_err(|e| NdmgrError::SourceUnreadable {
            path: dir.clone(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| NdmgrError::SourceUnreadable {
                path: dir.clone(),
                source: e,
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str == DESCRIPTOR_NAME
                || matcher::is_ignored(&name_str, &self.options.ignore_patterns)
            {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }

            let rel_child = rel.join(&name);
            let foldable = self.decide(&rel_child)?;
            analysis.set(rel_child.clone(), foldable);
            if !foldable {
                self.analyze_dir(&rel_child, analysis, visited)?;
            }
        }

        Ok(())
    }

    fn decide(&self, rel: &Path) -> Result<bool> {
        let target = self.target.join(rel);
        Ok(match paths::classify(&target) {
            // nothing there, or a symlink we will recognize or replace
            PathKind::Missing | PathKind::Symlink => true,
            PathKind::Dir => {
                if self.options.fold_strategy == FoldStrategy::Aggressive
                    && dir_is_foldable(&target, self.managed_root, &self.options.ignore_patterns)?
                {
                    true
                } else {
                    // directory-level adoption folds over real directories
                    self.options.conflict_policy == ConflictPolicy::Adopt
                }
            }
            PathKind::File | PathKind::Other => false,
        })
    }
}

/// An existing directory may be folded over when it is empty or holds
/// nothing but symlinks that resolve into the managed source tree.
pub(crate) fn dir_is_foldable(
    target: &Path,
    managed_root: &Path,
    ignore_patterns: &[String],
) -> Result<bool> {
    for entry in fs::read_dir(target)? {
        let entry = entry?;
        let name = entry.file_name();
        if matcher::is_ignored(&name.to_string_lossy(), ignore_patterns) {
            continue;
        }
        if !entry.file_type()?.is_symlink() {
            return Ok(false);
        }
        let text = fs::read_link(entry.path())?;
        let resolved = paths::resolve_link(&entry.path(), &text);
        if !resolved.starts_with(managed_root) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(strategy: FoldStrategy, policy: ConflictPolicy) -> LinkerOptions {
        LinkerOptions {
            fold_strategy: strategy,
            conflict_policy: policy,
            ..LinkerOptions::default()
        }
    }

    fn setup() -> (TempDir, TempDir) {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("sub/nested")).unwrap();
        (source, target)
    }

    #[test]
    fn test_missing_target_is_foldable() {
        let (source, target) = setup();
        let opts = options(FoldStrategy::Directory, ConflictPolicy::Fail);
        let analyzer =
            TreeAnalyzer::new(source.path(), target.path(), source.path(), &opts);
        let analysis = analyzer.analyze().unwrap();

        assert!(analysis.is_foldable(Path::new("sub")));
    }

    #[test]
    fn test_existing_dir_blocks_directory_strategy() {
        let (source, target) = setup();
        fs::create_dir(target.path().join("sub")).unwrap();

        let opts = options(FoldStrategy::Directory, ConflictPolicy::Fail);
        let analyzer =
            TreeAnalyzer::new(source.path(), target.path(), source.path(), &opts);
        let analysis = analyzer.analyze().unwrap();

        assert!(!analysis.is_foldable(Path::new("sub")));
        // the analyzer descended into the blocked directory
        assert!(analysis.is_foldable(Path::new("sub/nested")));
    }

    #[test]
    fn test_aggressive_folds_empty_dir() {
        let (source, target) = setup();
        fs::create_dir(target.path().join("sub")).unwrap();

        let opts = options(FoldStrategy::Aggressive, ConflictPolicy::Fail);
        let analyzer =
            TreeAnalyzer::new(source.path(), target.path(), source.path(), &opts);
        let analysis = analyzer.analyze().unwrap();

        assert!(analysis.is_foldable(Path::new("sub")));
    }

    #[test]
    fn test_aggressive_respects_foreign_content() {
        let (source, target) = setup();
        fs::create_dir(target.path().join("sub")).unwrap();
        fs::write(target.path().join("sub/user-file"), "keep me").unwrap();

        let opts = options(FoldStrategy::Aggressive, ConflictPolicy::Fail);
        let analyzer =
            TreeAnalyzer::new(source.path(), target.path(), source.path(), &opts);
        let analysis = analyzer.analyze().unwrap();

        assert!(!analysis.is_foldable(Path::new("sub")));
    }

    #[test]
    fn test_aggressive_folds_fully_managed_dir() {
        let (source, target) = setup();
        let source_real = fs::canonicalize(source.path()).unwrap();
        fs::write(source_real.join("sub/file"), "x").unwrap();
        fs::create_dir(target.path().join("sub")).unwrap();
        std::os::unix::fs::symlink(
            source_real.join("sub/file"),
            target.path().join("sub/file"),
        )
        .unwrap();

        let opts = options(FoldStrategy::Aggressive, ConflictPolicy::Fail);
        let analyzer = TreeAnalyzer::new(&source_real, target.path(), &source_real, &opts);
        let analysis = analyzer.analyze().unwrap();

        assert!(analysis.is_foldable(Path::new("sub")));
    }

    #[test]
    fn test_adopt_folds_over_populated_dir() {
        let (source, target) = setup();
        fs::create_dir(target.path().join("sub")).unwrap();
        fs::write(target.path().join("sub/user-file"), "user data").unwrap();

        let opts = options(FoldStrategy::Directory, ConflictPolicy::Adopt);
        let analyzer =
            TreeAnalyzer::new(source.path(), target.path(), source.path(), &opts);
        let analysis = analyzer.analyze().unwrap();

        assert!(analysis.is_foldable(Path::new("sub")));
    }

    #[test]
    fn test_file_at_dir_path_is_not_foldable() {
        let (source, target) = setup();
        fs::write(target.path().join("sub"), "a file").unwrap();

        let opts = options(FoldStrategy::Aggressive, ConflictPolicy::Fail);
        let analyzer =
            TreeAnalyzer::new(source.path(), target.path(), source.path(), &opts);
        let analysis = analyzer.analyze().unwrap();

        assert!(!analysis.is_foldable(Path::new("sub")));
    }

    #[test]
    fn test_ignored_entries_do_not_block_aggressive_fold() {
        let (source, target) = setup();
        fs::create_dir(target.path().join("sub")).unwrap();
        fs::write(target.path().join("sub/.DS_Store"), "junk").unwrap();

        let mut opts = options(FoldStrategy::Aggressive, ConflictPolicy::Fail);
        opts.ignore_patterns.push(".DS_Store".to_string());
        let analyzer =
            TreeAnalyzer::new(source.path(), target.path(), source.path(), &opts);
        let analysis = analyzer.analyze().unwrap();

        assert!(analysis.is_foldable(Path::new("sub")));
    }
}
