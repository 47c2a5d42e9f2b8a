//! Batch deployment of every discovered module.

pub mod unlinker;

pub use unlinker::SimpleUnlinker;

use std::fs;
use std::path::PathBuf;

use crate::error::{NdmgrError, Result};
use crate::linker::{ConflictPolicy, ForceMode, Linker, LinkerOptions, LinkingStats};
use crate::modules::ModuleScanner;
use crate::paths::{self, PathKind};
use crate::utils::logger::{error, header, info, warning};
use crate::utils::prompt::PromptHandler;

/// Drives one linker per discovered module and aggregates the outcome.
pub struct Deployer<'a> {
    source_root: PathBuf,
    target_base: PathBuf,
    scan_depth: u32,
    options: LinkerOptions,
    prompt: &'a dyn PromptHandler,
}

#[derive(Debug, Default)]
pub struct DeployReport {
    pub processed: usize,
    pub deployed: usize,
    pub skipped: usize,
    pub failures: Vec<(String, String)>,
    pub stats: LinkingStats,
}

impl DeployReport {
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn print_summary(&self) {
        header("Deployment Summary");
        info(&format!(
            "{} of {} modules deployed",
            self.deployed, self.processed
        ));
        if self.skipped > 0 {
            info(&format!("{} modules skipped by descriptor", self.skipped));
        }
        info(&self.stats.summary());
        if !self.failures.is_empty() {
            warning(&format!("{} modules failed:", self.failures.len()));
            for (name, reason) in &self.failures {
                warning(&format!("  - {}: {}", name, reason));
            }
        }
    }
}

impl<'a> Deployer<'a> {
    pub fn new(
        source_root: PathBuf,
        target_base: PathBuf,
        scan_depth: u32,
        options: LinkerOptions,
        prompt: &'a dyn PromptHandler,
    ) -> Self {
        Self {
            source_root,
            target_base,
            scan_depth,
            options,
            prompt,
        }
    }

    pub fn deploy(&self) -> Result<DeployReport> {
        let scanner = ModuleScanner::new(
            self.source_root.clone(),
            self.scan_depth,
            self.options.ignore_patterns.clone(),
        );
        let modules = scanner.scan()?;
        if modules.is_empty() {
            info(&format!(
                "no modules found under {}",
                self.source_root.display()
            ));
        }

        let mut report = DeployReport::default();
        for module in &modules {
            if module.ignore {
                report.skipped += 1;
                continue;
            }
            report.processed += 1;

            match self.deploy_module(&scanner, module, &mut report.stats) {
                Ok(()) => report.deployed += 1,
                // a missing home directory is fatal to the whole invocation
                Err(e @ NdmgrError::NoHomeDirectory) => return Err(e),
                // force-no on a backup question is a user-requested abort
                Err(e @ NdmgrError::BackupConflict(_)) if self.options.force == ForceMode::No => {
                    return Err(e);
                }
                Err(e) => {
                    error(&format!("module {}: {}", module.name, e));
                    report.failures.push((module.name.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    fn deploy_module(
        &self,
        scanner: &ModuleScanner,
        module: &crate::modules::Module,
        stats: &mut LinkingStats,
    ) -> Result<()> {
        log::debug!(
            "deploying {} (descriptor {})",
            module.name,
            module.config_path.display()
        );
        let target = match &module.target_dir {
            Some(raw) => paths::expand(raw)?,
            None => self.target_base.clone(),
        };
        if paths::classify(&target) != PathKind::Dir || !is_writable(&target) {
            warning(&format!(
                "skipping {}: target {} is not a writable directory",
                module.name,
                target.display()
            ));
            return Err(NdmgrError::TargetUnusable(target));
        }

        if let Some(conflict) = scanner.preview_conflict(module, &target)? {
            if self.options.conflict_policy == ConflictPolicy::Fail
                && self.options.force == ForceMode::None
            {
                warning(&format!("skipping {}: {}", module.name, conflict.describe()));
                return Err(NdmgrError::ConflictDetected(target.join(&module.name)));
            }
        }

        let mut linker = Linker::new(
            module.path.clone(),
            target,
            self.source_root.clone(),
            self.options.clone(),
            self.prompt,
        )?;
        linker.link()?;
        stats.merge(linker.stats());
        Ok(())
    }
}

fn is_writable(path: &std::path::Path) -> bool {
    fs::metadata(path)
        .map(|md| !md.permissions().readonly())
        .unwrap_or(false)
}
