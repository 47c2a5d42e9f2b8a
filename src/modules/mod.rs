pub mod descriptor;
pub mod scanner;

pub use descriptor::{ModuleDescriptor, DESCRIPTOR_NAME};
pub use scanner::ModuleScanner;

use std::path::PathBuf;

/// A linkable directory discovered under the source root.
///
/// Built by the scanner, read-only afterwards. `path` is absolute and
/// canonical; `target_dir` is the raw override string from the descriptor,
/// expanded by the deployer when the module is used.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub config_path: PathBuf,
    pub target_dir: Option<String>,
    pub ignore: bool,
}

/// What already occupies a deploy slot in the target tree.
#[derive(Debug, Clone)]
pub enum ConflictInfo {
    ExistingSymlink { path: PathBuf, link_target: PathBuf },
    ExistingDirectory { path: PathBuf },
    ExistingFile { path: PathBuf },
}

impl ConflictInfo {
    pub fn describe(&self) -> String {
        match self {
            ConflictInfo::ExistingSymlink { path, link_target } => format!(
                "existing symlink {} -> {}",
                path.display(),
                link_target.display()
            ),
            ConflictInfo::ExistingDirectory { path } => {
                format!("existing directory {}", path.display())
            }
            ConflictInfo::ExistingFile { path } => format!("existing file {}", path.display()),
        }
    }
}
