use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::Result;
use crate::parsers::ParserRegistry;

/// Finds files some enabled parser can handle.
pub struct FileWalker<'a> {
    registry: &'a ParserRegistry,
}

impl<'a> FileWalker<'a> {
    pub fn new(registry: &'a ParserRegistry) -> Self {
        Self { registry }
    }

    /// Walks `root` honoring ignore files. A file root is returned as-is
    /// when supported.
    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if root.is_file() {
            return Ok(if self.is_supported(root) {
                vec![root.to_path_buf()]
            } else {
                Vec::new()
            });
        }
        if !root.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", root.display()),
            )
            .into());
        }

        let mut files = Vec::new();
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .ignore(true)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_file() && self.is_supported(path) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();

        Ok(files)
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.registry.get_for_file(path).is_some()
    }

    pub fn get_parser(&self, path: &Path) -> Option<String> {
        self.registry.get_for_file(path).map(|p| p.name().to_string())
    }
}
