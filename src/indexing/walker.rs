//! File system walker for discovering source files to build
//!
//! Directory traversal honours:
//! - .gitignore rules
//! - `.tuignore` files
//! - `indexing.ignore_patterns` from settings
//! - the extensions of enabled languages

use crate::Settings;
use crate::parsing::get_registry;
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Walks directories to find source files to build
#[derive(Debug)]
pub struct FileWalker {
    settings: Arc<Settings>,
}

impl FileWalker {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Walk a directory and return an iterator of buildable files
    pub fn walk(&self, root: &Path) -> impl Iterator<Item = PathBuf> {
        let mut builder = WalkBuilder::new(root);

        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .max_depth(None)
            .require_git(false);

        builder.add_custom_ignore_filename(".tuignore");

        // Overrides whitelist by default, a leading '!' turns a glob into an exclusion
        if !self.settings.indexing.ignore_patterns.is_empty() {
            let mut overrides = OverrideBuilder::new(root);
            for pattern in &self.settings.indexing.ignore_patterns {
                if let Err(e) = overrides.add(&format!("!{pattern}")) {
                    warn!("ignoring invalid ignore pattern '{pattern}': {e}");
                }
            }
            match overrides.build() {
                Ok(overrides) => {
                    builder.overrides(overrides);
                }
                Err(e) => warn!("ignore patterns not applied: {e}"),
            }
        }

        let enabled_extensions = self.enabled_extensions();

        builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter_map(move |entry| {
                let path = entry.path();

                if path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'))
                {
                    return None;
                }

                let ext = path.extension().and_then(|e| e.to_str())?;
                enabled_extensions
                    .iter()
                    .any(|enabled| enabled == ext)
                    .then(|| path.to_path_buf())
            })
    }

    /// Extensions of every enabled language, from settings where configured
    fn enabled_extensions(&self) -> Vec<String> {
        let registry = get_registry();
        let mut extensions: Vec<String> = Vec::new();
        for def in registry.iter_enabled(&self.settings) {
            match self.settings.language(def.id().as_str()) {
                Some(config) if !config.extensions.is_empty() => {
                    extensions.extend(config.extensions.iter().cloned())
                }
                _ => extensions.extend(def.extensions().iter().map(|e| e.to_string())),
            }
        }
        extensions.sort();
        extensions.dedup();
        extensions
    }

    /// Count files that would be built (useful for dry runs)
    pub fn count_files(&self, root: &Path) -> usize {
        self.walk(root).count()
    }
}
