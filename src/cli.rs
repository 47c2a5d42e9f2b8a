use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::linker::{ConflictPolicy, FoldStrategy};

#[derive(Parser, Debug)]
#[command(name = "ndmgr")]
#[command(author, version, about = "A symlink farm manager for dotfiles", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file
    #[arg(long, global = true, env = "NDMGR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the source root and deploy every module
    Deploy {
        /// Source root containing the module directories
        #[arg(short, long, default_value = ".")]
        source: PathBuf,

        /// Target base directory (defaults to the configured target or home)
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// How many directory levels to scan for modules
        #[arg(long)]
        depth: Option<u32>,

        #[command(flatten)]
        link_args: LinkArgs,
    },

    /// Link the named modules into the target
    Link {
        /// Module names (directories under --dir)
        #[arg(required = true)]
        modules: Vec<String>,

        /// Directory containing the module directories
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Target base directory
        #[arg(short, long)]
        target: Option<PathBuf>,

        #[command(flatten)]
        link_args: LinkArgs,
    },

    /// Remove the symlinks created for the named modules
    Unlink {
        /// Module names
        #[arg(required = true)]
        modules: Vec<String>,

        /// Directory containing the module directories
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Target base directory
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Unlink and link the named modules again
    Relink {
        /// Module names
        #[arg(required = true)]
        modules: Vec<String>,

        /// Directory containing the module directories
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Target base directory
        #[arg(short, long)]
        target: Option<PathBuf>,

        #[command(flatten)]
        link_args: LinkArgs,
    },

    /// Synchronize the tracked repositories
    Sync {
        /// Skip pushing local commits
        #[arg(long)]
        no_push: bool,

        /// Only print errors (for cron usage)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the state of the tracked repositories
    Status,
}

#[derive(Args, Debug, Default)]
pub struct LinkArgs {
    /// Conflict handling policy
    #[arg(long, value_enum)]
    pub conflicts: Option<ConflictPolicy>,

    /// Tree folding strategy
    #[arg(long, value_enum)]
    pub folding: Option<FoldStrategy>,

    /// Do not back up conflicting entries before replacing them
    #[arg(long)]
    pub no_backup: bool,

    /// Suffix appended to backup files
    #[arg(long)]
    pub backup_suffix: Option<String>,

    /// Answer every prompt with yes or no
    #[arg(long, value_enum)]
    pub force: Option<ForceChoice>,

    /// Answer prompts with their documented defaults
    #[arg(long, conflicts_with = "force")]
    pub non_interactive: bool,

    /// Additional ignore patterns
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ForceChoice {
    Yes,
    No,
}
