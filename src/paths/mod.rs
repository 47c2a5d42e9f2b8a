//! Pure path helpers: expansion, probing, relative link-text computation.
//!
//! Nothing in here keeps state; every function takes the paths it operates
//! on explicitly.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{NdmgrError, Result};

/// What a path is, probed without following a final symlink.
///
/// A dangling symlink is `Symlink`, not `Missing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Missing,
    File,
    Dir,
    Symlink,
    Other,
}

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NdmgrError::NoHomeDirectory)
}

/// Expand a leading `~` or `$HOME` to the home directory.
///
/// Anything else passes through unchanged; the home lookup only runs (and
/// only fails) when expansion is actually required.
pub fn expand(path: &str) -> Result<PathBuf> {
    if path == "~" || path == "$HOME" {
        return home_dir();
    }
    for prefix in ["~/", "$HOME/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return Ok(home_dir()?.join(rest));
        }
    }
    Ok(PathBuf::from(path))
}

/// Resolve to an absolute path, following intermediate symlinks.
pub fn canonicalize(path: &Path) -> Result<PathBuf> {
    Ok(fs::canonicalize(path)?)
}

pub fn is_symlink(path: &Path) -> bool {
    classify(path) == PathKind::Symlink
}

/// The literal link text, not followed or resolved.
pub fn read_link(path: &Path) -> Result<PathBuf> {
    Ok(fs::read_link(path)?)
}

pub fn classify(path: &Path) -> PathKind {
    match fs::symlink_metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => PathKind::Missing,
        Err(_) => PathKind::Other,
        Ok(md) => {
            let ft = md.file_type();
            if ft.is_symlink() {
                PathKind::Symlink
            } else if ft.is_dir() {
                PathKind::Dir
            } else if ft.is_file() {
                PathKind::File
            } else {
                PathKind::Other
            }
        }
    }
}

/// Compute the relative path from the directory containing `target` to
/// `source`: the text to store in a symlink at `target`.
pub fn make_relative(source: &Path, target: &Path) -> PathBuf {
    let start = match target.parent() {
        Some(parent) => normal_components(parent),
        None => Vec::new(),
    };
    let dest = normal_components(source);

    let common = start
        .iter()
        .zip(dest.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..start.len() {
        rel.push("..");
    }
    for comp in &dest[common..] {
        rel.push(comp.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

fn normal_components(path: &Path) -> Vec<Component<'_>> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Lexically normalize `.` and `..` components without touching the
/// filesystem, so dangling link targets can still be compared.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Where a symlink points, as an absolute normalized path. Relative link
/// text is resolved against the directory holding the link.
pub fn resolve_link(link: &Path, text: &Path) -> PathBuf {
    if text.is_absolute() {
        normalize(text)
    } else {
        let base = link.parent().unwrap_or_else(|| Path::new(""));
        normalize(&base.join(text))
    }
}

/// Create a directory and all missing ancestors.
pub fn ensure_dir_tree(path: &Path) -> Result<()> {
    Ok(fs::create_dir_all(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_expand_tilde_forms() {
        let temp = TempDir::new().unwrap();
        std::env::set_var("HOME", temp.path());

        let home = temp.path().to_path_buf();
        assert_eq!(expand("~").unwrap(), home);
        assert_eq!(expand("$HOME").unwrap(), home);
        assert_eq!(expand("~/x/y").unwrap(), home.join("x/y"));
        assert_eq!(expand("$HOME/x").unwrap(), home.join("x"));
        assert_eq!(expand("/etc/passwd").unwrap(), PathBuf::from("/etc/passwd"));
        assert_eq!(expand("plain").unwrap(), PathBuf::from("plain"));
    }

    #[test]
    fn test_make_relative_sibling() {
        let rel = make_relative(Path::new("/a/src/vim/.vimrc"), Path::new("/a/tgt/.vimrc"));
        assert_eq!(rel, PathBuf::from("../src/vim/.vimrc"));
    }

    #[test]
    fn test_make_relative_same_dir() {
        let rel = make_relative(Path::new("/a/b/file"), Path::new("/a/b/link"));
        assert_eq!(rel, PathBuf::from("file"));
    }

    #[test]
    fn test_make_relative_deeper_target() {
        let rel = make_relative(Path::new("/a/file"), Path::new("/a/b/c/link"));
        assert_eq!(rel, PathBuf::from("../../file"));
    }

    #[test]
    fn test_make_relative_empty_is_dot() {
        let rel = make_relative(Path::new("/a/b"), Path::new("/a/b/link"));
        assert_eq!(rel, PathBuf::from("."));
    }

    #[test]
    fn test_make_relative_normalizes_curdir() {
        let rel = make_relative(Path::new("/a/./src/f"), Path::new("/a/tgt/./f"));
        assert_eq!(rel, PathBuf::from("../src/f"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
        assert_eq!(normalize(Path::new("a/../b")), PathBuf::from("b"));
    }

    #[test]
    fn test_classify_kinds() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        std::fs::write(&file, "x").unwrap();

        assert_eq!(classify(temp.path()), PathKind::Dir);
        assert_eq!(classify(&file), PathKind::File);
        assert_eq!(classify(&temp.path().join("missing")), PathKind::Missing);
    }

    #[test]
    fn test_classify_dangling_symlink() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("dangling");
        std::os::unix::fs::symlink("does-not-exist", &link).unwrap();

        assert_eq!(classify(&link), PathKind::Symlink);
        assert!(is_symlink(&link));
    }

    #[test]
    fn test_resolve_link_relative_and_absolute() {
        let resolved = resolve_link(Path::new("/tgt/.vimrc"), Path::new("../src/vim/.vimrc"));
        assert_eq!(resolved, PathBuf::from("/src/vim/.vimrc"));

        let resolved = resolve_link(Path::new("/tgt/.vimrc"), Path::new("/etc/vimrc"));
        assert_eq!(resolved, PathBuf::from("/etc/vimrc"));
    }
}
