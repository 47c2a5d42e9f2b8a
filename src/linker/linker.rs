//! Executes link and unlink of one module against one target directory.

use std::fs::{self, FileType};
use std::os::unix::fs as unix_fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{NdmgrError, Result};
use crate::matcher;
use crate::modules::DESCRIPTOR_NAME;
use crate::paths::{self, PathKind};
use crate::utils::logger::{error, info, warning};
use crate::utils::prompt::PromptHandler;

use super::analyzer::{dir_is_foldable, TreeAnalysis, TreeAnalyzer};
use super::{ConflictPolicy, FoldStrategy, LinkerOptions, LinkingStats};

/// Links one module directory into one target directory.
///
/// All symlinks are written with relative link text so that source and
/// target can be moved together without relinking. Symlinks with any other
/// text, absolute ones included, are foreign and never touched by unlink.
pub struct Linker<'a> {
    source: PathBuf,
    target: PathBuf,
    managed_root: PathBuf,
    options: LinkerOptions,
    prompt: &'a dyn PromptHandler,
    stats: LinkingStats,
}

impl<'a> Linker<'a> {
    pub fn new(
        source: PathBuf,
        target: PathBuf,
        managed_root: PathBuf,
        options: LinkerOptions,
        prompt: &'a dyn PromptHandler,
    ) -> Result<Self> {
        let source = paths::canonicalize(&source).map_err(|_| NdmgrError::SourceUnreadable {
            path: source.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "module directory missing"),
        })?;
        let target =
            paths::canonicalize(&target).map_err(|_| NdmgrError::TargetUnusable(target.clone()))?;
        if paths::classify(&target) != PathKind::Dir {
            return Err(NdmgrError::TargetUnusable(target));
        }
        let managed_root = paths::canonicalize(&managed_root).unwrap_or(managed_root);

        Ok(Self {
            source,
            target,
            managed_root,
            options,
            prompt,
            stats: LinkingStats::default(),
        })
    }

    pub fn stats(&self) -> &LinkingStats {
        &self.stats
    }

    /// Link the whole module in a single pass driven by the fold analysis.
    pub fn link(&mut self) -> Result<()> {
        let analysis = TreeAnalyzer::new(
            &self.source,
            &self.target,
            &self.managed_root,
            &self.options,
        )
        .analyze()?;
        self.link_dir(Path::new(""), &analysis)
    }

    fn link_dir(&mut self, rel: &Path, analysis: &TreeAnalysis) -> Result<()> {
        let dir = self.source.join(rel);
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
                self.stats.files_skipped += 1;
                continue;
            }

            let rel_child = rel.join(&name);
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                if analysis.is_foldable(&rel_child) {
                    self.link_entry(&rel_child, true)?;
                } else if self.ensure_target_dir(&rel_child)? {
                    self.link_dir(&rel_child, analysis)?;
                }
            } else {
                self.link_entry(&rel_child, false)?;
            }
        }

        Ok(())
    }

    /// Make `target/<rel>` a real directory so file-level links can be
    /// placed inside it. Returns false when the subtree was skipped.
    fn ensure_target_dir(&mut self, rel: &Path) -> Result<bool> {
        let target = self.target.join(rel);
        match paths::classify(&target) {
            PathKind::Dir => Ok(true),
            PathKind::Missing => {
                paths::ensure_dir_tree(&target)?;
                Ok(true)
            }
            PathKind::Symlink | PathKind::File | PathKind::Other => {
                // a non-directory sits where a real directory is needed
                match self.options.conflict_policy {
                    ConflictPolicy::Fail => {
                        error(&format!(
                            "cannot create directory over {}",
                            target.display()
                        ));
                        Err(NdmgrError::ConflictDetected(target))
                    }
                    ConflictPolicy::Skip => {
                        self.stats.files_skipped += 1;
                        Ok(false)
                    }
                    ConflictPolicy::Adopt | ConflictPolicy::Replace => {
                        if self.options.backup_conflicts {
                            self.back_up(&target)?;
                        } else {
                            fs::remove_file(&target)?;
                        }
                        fs::create_dir(&target)?;
                        self.stats.conflicts_resolved += 1;
                        Ok(true)
                    }
                }
            }
        }
    }

    /// Place one symlink, `target/<rel>` -> relative path to
    /// `source/<rel>`.
    fn link_entry(&mut self, rel: &Path, is_dir: bool) -> Result<()> {
        let source = self.source.join(rel);
        let target = self.target.join(rel);
        let relative = paths::make_relative(&source, &target);

        let kind = paths::classify(&target);
        if kind == PathKind::Dir && is_dir && self.options.fold_strategy == FoldStrategy::Aggressive
        {
            // a directory re-check may clear the way for a fold
            if dir_is_foldable(&target, &self.managed_root, &self.options.ignore_patterns)? {
                fs::remove_dir_all(&target)?;
                return self.create_link(&target, &relative, is_dir);
            }
        }

        match kind {
            PathKind::Missing => self.create_link(&target, &relative, is_dir),
            PathKind::Symlink => {
                let existing = paths::read_link(&target)?;
                if existing == relative {
                    debug!("already linked: {}", target.display());
                    Ok(())
                } else {
                    self.resolve_conflict(&source, &target, &relative, is_dir)
                }
            }
            PathKind::Dir | PathKind::File | PathKind::Other => {
                self.resolve_conflict(&source, &target, &relative, is_dir)
            }
        }
    }

    fn create_link(&mut self, target: &Path, relative: &Path, is_dir: bool) -> Result<()> {
        if let Some(parent) = target.parent() {
            paths::ensure_dir_tree(parent)?;
        }
        unix_fs::symlink(relative, target)?;
        if is_dir {
            self.stats.dirs_linked += 1;
        } else {
            self.stats.files_linked += 1;
        }
        if self.options.verbose {
            info(&format!(
                "linked {} -> {}",
                target.display(),
                relative.display()
            ));
        }
        Ok(())
    }

    fn resolve_conflict(
        &mut self,
        source: &Path,
        target: &Path,
        relative: &Path,
        is_dir: bool,
    ) -> Result<()> {
        match self.options.conflict_policy {
            ConflictPolicy::Fail => {
                error(&format!("existing entry blocks {}", target.display()));
                Err(NdmgrError::ConflictDetected(target.to_path_buf()))
            }
            ConflictPolicy::Skip => {
                self.stats.files_skipped += 1;
                Ok(())
            }
            ConflictPolicy::Adopt => {
                if paths::classify(target) == PathKind::Dir {
                    self.adopt_directory(source, target, relative)
                } else {
                    self.adopt_file(target, relative)
                }
            }
            ConflictPolicy::Replace => self.replace(target, relative, is_dir),
        }
    }

    /// Move the existing file aside (or drop it) and link in its place.
    fn adopt_file(&mut self, target: &Path, relative: &Path) -> Result<()> {
        if self.options.backup_conflicts {
            self.back_up(target)?;
        } else {
            fs::remove_file(target)?;
        }
        unix_fs::symlink(relative, target)?;
        self.stats.files_adopted += 1;
        self.stats.conflicts_resolved += 1;
        Ok(())
    }

    /// Import a whole existing directory: entries unknown to the source
    /// are copied in, the directory is moved aside, and a single directory
    /// symlink takes its place.
    fn adopt_directory(&mut self, source: &Path, target: &Path, relative: &Path) -> Result<()> {
        let proceed = self.options.force.decide(
            self.prompt,
            &format!("Proceed with directory adoption of {}?", target.display()),
            false,
        );
        if !proceed {
            warning(&format!(
                "directory adoption of {} declined",
                target.display()
            ));
            self.stats.files_skipped += 1;
            return Ok(());
        }

        merge_tree(target, source)?;
        if self.options.backup_conflicts {
            self.back_up(target)?;
        } else {
            fs::remove_dir_all(target)?;
        }
        unix_fs::symlink(relative, target)?;
        self.stats.dirs_linked += 1;
        self.stats.conflicts_resolved += 1;
        Ok(())
    }

    fn replace(&mut self, target: &Path, relative: &Path, is_dir: bool) -> Result<()> {
        if self.options.backup_conflicts {
            self.back_up(target)?;
        } else {
            remove_any(target)?;
        }
        unix_fs::symlink(relative, target)?;
        if is_dir {
            self.stats.dirs_linked += 1;
        } else {
            self.stats.files_linked += 1;
        }
        self.stats.conflicts_resolved += 1;
        Ok(())
    }

    /// Rename the target to its backup path, asking before clobbering a
    /// previous backup.
    fn back_up(&mut self, target: &Path) -> Result<()> {
        let backup = backup_path(target, &self.options.backup_suffix);
        if paths::classify(&backup) != PathKind::Missing {
            let overwrite = self.options.force.decide(
                self.prompt,
                &format!("Replace existing backup {}?", backup.display()),
                false,
            );
            if !overwrite {
                return Err(NdmgrError::BackupConflict(backup));
            }
            remove_any(&backup)?;
        }
        fs::rename(target, &backup)?;
        self.stats.backups_created += 1;
        Ok(())
    }

    /// Remove the symlinks a link run would have written. Anything else at
    /// the target, including symlinks with different text, stays.
    pub fn unlink(&mut self) -> Result<usize> {
        self.unlink_dir(Path::new(""))
    }

    fn unlink_dir(&mut self, rel: &Path) -> Result<usize> {
        let dir = self.source.join(rel);
        let entries = fs::read_dir(&dir).map_err(|e| NdmgrError::SourceUnreadable {
            path: dir.clone(),
            source: e,
        })?;

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| NdmgrError::SourceUnreadable {
                path: dir.clone(),
                source: e,
            })?;
            let name = entry.file_name();
            if name.to_string_lossy() == DESCRIPTOR_NAME {
                continue;
            }

            let rel_child = rel.join(&name);
            let source = self.source.join(&rel_child);
            let target = self.target.join(&rel_child);

            let ours = if paths::is_symlink(&target) {
                match fs::read_link(&target) {
                    Ok(text) => text == paths::make_relative(&source, &target),
                    Err(e) => {
                        warning(&format!("unreadable symlink {}: {}", target.display(), e));
                        false
                    }
                }
            } else {
                false
            };

            if ours {
                fs::remove_file(&target)?;
                removed += 1;
                if self.options.verbose {
                    info(&format!("removed {}", target.display()));
                }
            } else if entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
                && paths::classify(&target) == PathKind::Dir
            {
                removed += self.unlink_dir(&rel_child)?;
            }
        }

        Ok(removed)
    }
}

fn backup_path(target: &Path, suffix: &str) -> PathBuf {
    let suffix = suffix.trim_start_matches('.');
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    target.with_file_name(name)
}

fn remove_any(path: &Path) -> Result<()> {
    if paths::classify(path) == PathKind::Dir {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Copy everything under `from` that the source module does not already
/// have. Colliding files keep the source side; colliding directories merge
/// level by level. The only writes into the source tree happen here.
fn merge_tree(from: &Path, into: &Path) -> Result<()> {
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = into.join(entry.file_name());
        let ft = entry.file_type()?;
        match paths::classify(&dest) {
            PathKind::Missing => copy_entry(&entry.path(), &dest, ft)?,
            PathKind::Dir if ft.is_dir() => merge_tree(&entry.path(), &dest)?,
            _ => {}
        }
    }
    Ok(())
}

fn copy_entry(src: &Path, dest: &Path, ft: FileType) -> Result<()> {
    if ft.is_symlink() {
        let text = fs::read_link(src)?;
        unix_fs::symlink(text, dest)?;
    } else if ft.is_dir() {
        copy_tree(src, dest)?;
    } else {
        fs::copy(src, dest)?;
    }
    Ok(())
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        copy_entry(
            &entry.path(),
            &dest.join(entry.file_name()),
            entry.file_type()?,
        )?;
    }
    Ok(())
}
