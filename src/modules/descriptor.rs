//! The `.ndmgr` override file at a module root.

use std::fs;
use std::path::Path;

use crate::error::{NdmgrError, Result};

pub const DESCRIPTOR_NAME: &str = ".ndmgr";

/// Parsed per-module overrides.
#[derive(Debug, Clone, Default)]
pub struct ModuleDescriptor {
    pub target_dir: Option<String>,
    pub ignore: bool,
    pub description: Option<String>,
}

impl ModuleDescriptor {
    pub fn parse_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| NdmgrError::SourceUnreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::parse(&content))
    }

    /// Line-oriented `key = value`; `#` starts a comment, double quotes
    /// around the value are stripped, unknown keys are ignored.
    pub fn parse(content: &str) -> Self {
        let mut descriptor = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);

            match key {
                "target_dir" => descriptor.target_dir = Some(value.to_string()),
                "ignore" => descriptor.ignore = value == "true",
                "description" => descriptor.description = Some(value.to_string()),
                _ => {}
            }
        }

        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_descriptor() {
        let descriptor = ModuleDescriptor::parse(
            "# vim module\n\
             target_dir = \"~/.config\"\n\
             ignore = false\n\
             description = editor configuration\n",
        );

        assert_eq!(descriptor.target_dir.as_deref(), Some("~/.config"));
        assert!(!descriptor.ignore);
        assert_eq!(
            descriptor.description.as_deref(),
            Some("editor configuration")
        );
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let descriptor = ModuleDescriptor::parse("\n# only comments\n\n  # indented\n");
        assert!(descriptor.target_dir.is_none());
        assert!(!descriptor.ignore);
    }

    #[test]
    fn test_ignore_is_literal_true_only() {
        assert!(ModuleDescriptor::parse("ignore = true").ignore);
        assert!(!ModuleDescriptor::parse("ignore = yes").ignore);
        assert!(!ModuleDescriptor::parse("ignore = True").ignore);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let descriptor = ModuleDescriptor::parse("color = blue\ntarget_dir = /tmp/x");
        assert_eq!(descriptor.target_dir.as_deref(), Some("/tmp/x"));
    }

    #[test]
    fn test_parse_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "target_dir = \"/srv/cfg\"").unwrap();
        writeln!(file, "ignore = true").unwrap();

        let descriptor = ModuleDescriptor::parse_file(file.path()).unwrap();
        assert_eq!(descriptor.target_dir.as_deref(), Some("/srv/cfg"));
        assert!(descriptor.ignore);
    }
}
