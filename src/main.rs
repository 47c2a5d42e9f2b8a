use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod deploy;
mod error;
mod git;
mod linker;
mod matcher;
mod modules;
mod paths;
mod utils;

use cli::{Cli, Commands, ForceChoice, LinkArgs};
use config::Config;
use deploy::{Deployer, SimpleUnlinker};
use error::NdmgrError;
use linker::{ForceMode, Linker, LinkerOptions, LinkingStats};
use modules::{ModuleDescriptor, DESCRIPTOR_NAME};
use utils::logger::{self, error, header, info, success, warning};
use utils::prompt::{InteractivePrompt, PromptHandler};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = config::load_config(cli.config.as_deref())?;
    let verbose = cli.verbose || config.settings.verbose;

    match cli.command {
        Commands::Deploy {
            source,
            target,
            depth,
            link_args,
        } => cmd_deploy(&config, source, target, depth, &link_args, verbose),
        Commands::Link {
            modules,
            dir,
            target,
            link_args,
        } => cmd_link(&config, &modules, &dir, target, &link_args, verbose),
        Commands::Unlink {
            modules,
            dir,
            target,
        } => cmd_unlink(&config, &modules, dir, target, verbose),
        Commands::Relink {
            modules,
            dir,
            target,
            link_args,
        } => cmd_relink(&config, &modules, &dir, target, &link_args, verbose),
        Commands::Sync { no_push, quiet } => cmd_sync(&config, no_push, quiet),
        Commands::Status => cmd_status(&config),
    }
}

fn build_options(config: &Config, args: &LinkArgs, verbose: bool) -> LinkerOptions {
    let mut ignore_patterns = config.linking.ignore_patterns.clone();
    ignore_patterns.extend(args.ignore.iter().cloned());

    LinkerOptions {
        verbose,
        ignore_patterns,
        conflict_policy: args.conflicts.unwrap_or(config.linking.conflict_resolution),
        fold_strategy: args.folding.unwrap_or(config.linking.tree_folding),
        backup_conflicts: config.linking.backup_conflicts && !args.no_backup,
        backup_suffix: args
            .backup_suffix
            .clone()
            .unwrap_or_else(|| config.linking.backup_suffix.clone()),
        force: match (args.force, args.non_interactive) {
            (Some(ForceChoice::Yes), _) => ForceMode::Yes,
            (Some(ForceChoice::No), _) => ForceMode::No,
            (None, true) => ForceMode::Default,
            (None, false) => ForceMode::None,
        },
    }
}

fn resolve_target(config: &Config, flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(target) => Ok(target),
        None => match &config.settings.default_target {
            Some(raw) => Ok(paths::expand(raw)?),
            None => Ok(paths::home_dir()?),
        },
    }
}

fn cmd_deploy(
    config: &Config,
    source: PathBuf,
    target: Option<PathBuf>,
    depth: Option<u32>,
    args: &LinkArgs,
    verbose: bool,
) -> Result<()> {
    let options = build_options(config, args, verbose);
    let target = resolve_target(config, target)?;
    let depth = depth.unwrap_or(config.linking.scan_depth);

    let prompt = InteractivePrompt;
    let deployer = Deployer::new(source, target, depth, options, &prompt);
    let report = deployer.deploy()?;
    report.print_summary();

    if !report.success() {
        anyhow::bail!(
            "{} of {} modules failed",
            report.failures.len(),
            report.processed
        );
    }
    Ok(())
}

/// Target override for one explicitly named module, read from its
/// descriptor when present.
fn module_target(
    module_dir: &Path,
    fallback: &Path,
) -> std::result::Result<PathBuf, NdmgrError> {
    let descriptor_path = module_dir.join(DESCRIPTOR_NAME);
    if descriptor_path.is_file() {
        if let Some(raw) = ModuleDescriptor::parse_file(&descriptor_path)?.target_dir {
            return Ok(paths::expand(&raw)?);
        }
    }
    Ok(fallback.to_path_buf())
}

fn cmd_link(
    config: &Config,
    modules: &[String],
    dir: &Path,
    target: Option<PathBuf>,
    args: &LinkArgs,
    verbose: bool,
) -> Result<()> {
    let options = build_options(config, args, verbose);
    let target_base = resolve_target(config, target)?;
    let prompt = InteractivePrompt;

    let mut stats = LinkingStats::default();
    let mut failed = 0;
    for name in modules {
        match link_one(name, dir, &target_base, &options, &prompt) {
            Ok(module_stats) => {
                stats.merge(&module_stats);
                success(&format!("linked {}", name));
            }
            Err(e @ NdmgrError::NoHomeDirectory) => return Err(e.into()),
            Err(NdmgrError::BackupConflict(path))
                if options.force == ForceMode::No =>
            {
                anyhow::bail!("aborted: backup already exists at {}", path.display());
            }
            Err(e) => {
                error(&format!("{}: {}", name, e));
                failed += 1;
            }
        }
    }

    info(&stats.summary());
    if failed > 0 {
        anyhow::bail!("{} of {} modules failed", failed, modules.len());
    }
    Ok(())
}

fn link_one(
    name: &str,
    dir: &Path,
    target_base: &Path,
    options: &LinkerOptions,
    prompt: &dyn PromptHandler,
) -> std::result::Result<LinkingStats, NdmgrError> {
    let module_dir = dir.join(name);
    let target = module_target(&module_dir, target_base)?;
    let mut linker = Linker::new(
        module_dir,
        target,
        dir.to_path_buf(),
        options.clone(),
        prompt,
    )?;
    linker.link()?;
    Ok(*linker.stats())
}

fn cmd_unlink(
    config: &Config,
    modules: &[String],
    dir: Option<PathBuf>,
    target: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    // with no directories given, fall back to the path-based unlinker
    if dir.is_none() && target.is_none() {
        let unlinker = SimpleUnlinker::new(env::current_dir()?);
        let mut removed = 0;
        for name in modules {
            removed += unlinker.unlink(name)?;
        }
        info(&format!("removed {} symlinks", removed));
        return Ok(());
    }

    let dir = dir.unwrap_or_else(|| PathBuf::from("."));
    let target_base = resolve_target(config, target)?;
    let options = build_options(config, &LinkArgs::default(), verbose);
    let prompt = InteractivePrompt;

    let mut removed = 0;
    let mut failed = 0;
    for name in modules {
        let module_dir = dir.join(name);
        let result = module_target(&module_dir, &target_base).and_then(|target| {
            let mut linker =
                Linker::new(module_dir, target, dir.clone(), options.clone(), &prompt)?;
            linker.unlink()
        });
        match result {
            Ok(count) => removed += count,
            Err(e @ NdmgrError::NoHomeDirectory) => return Err(e.into()),
            Err(e) => {
                error(&format!("{}: {}", name, e));
                failed += 1;
            }
        }
    }

    info(&format!("removed {} symlinks", removed));
    if failed > 0 {
        anyhow::bail!("{} of {} modules failed", failed, modules.len());
    }
    Ok(())
}

fn cmd_relink(
    config: &Config,
    modules: &[String],
    dir: &Path,
    target: Option<PathBuf>,
    args: &LinkArgs,
    verbose: bool,
) -> Result<()> {
    let options = build_options(config, args, verbose);
    let target_base = resolve_target(config, target)?;
    let prompt = InteractivePrompt;

    let mut stats = LinkingStats::default();
    let mut failed = 0;
    for name in modules {
        let module_dir = dir.join(name);
        let result = module_target(&module_dir, &target_base).and_then(|target| {
            let mut linker = Linker::new(
                module_dir.clone(),
                target,
                dir.to_path_buf(),
                options.clone(),
                &prompt,
            )?;
            linker.unlink()?;
            linker.link()?;
            Ok(*linker.stats())
        });
        match result {
            Ok(module_stats) => {
                stats.merge(&module_stats);
                success(&format!("relinked {}", name));
            }
            Err(e @ NdmgrError::NoHomeDirectory) => return Err(e.into()),
            Err(e) => {
                error(&format!("{}: {}", name, e));
                failed += 1;
            }
        }
    }

    info(&stats.summary());
    if failed > 0 {
        anyhow::bail!("{} of {} modules failed", failed, modules.len());
    }
    Ok(())
}

fn cmd_sync(config: &Config, no_push: bool, quiet: bool) -> Result<()> {
    logger::set_quiet(quiet);
    if config.repositories.is_empty() {
        info("no tracked repositories configured");
        return Ok(());
    }

    let prompt = InteractivePrompt;
    let failed = git::sync_repositories(&config.repositories, &config.git, !no_push, &prompt);
    if failed > 0 {
        anyhow::bail!("{} of {} repositories failed", failed, config.repositories.len());
    }
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    if config.repositories.is_empty() {
        info("no tracked repositories configured");
        return Ok(());
    }

    header("Tracked Repositories");
    for repository in &config.repositories {
        match git::sync::repo_status(repository) {
            Ok(status) if !status.is_repo => {
                warning(&format!(
                    "{}: {} is not a repository (run sync to clone it)",
                    status.name,
                    status.path.display()
                ));
            }
            Ok(status) => {
                let branch = status.branch.unwrap_or_else(|| "?".to_string());
                let state = if status.dirty {
                    "uncommitted changes"
                } else {
                    "clean"
                };
                info(&format!(
                    "{}: {} [{}] {}",
                    status.name,
                    status.path.display(),
                    branch,
                    state
                ));
            }
            Err(e) => error(&format!("{}: {:#}", repository.name, e)),
        }
    }
    Ok(())
}
