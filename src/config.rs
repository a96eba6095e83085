//! Configuration module for the translation-unit engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TU_` and use double underscores
//! to separate nested levels:
//! - `TU_INDEXING__PARALLEL_THREADS=8` sets `indexing.parallel_threads`
//! - `TU_INDEX__WRITE_RETRIES=10` sets `index.write_retries`
//! - `TU_COMPLETION__MAX_RESULTS=20` sets `completion.max_results`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory holding settings, cache and index inside a workspace.
pub const CONFIG_DIR: &str = ".tu";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory for persisted translation-unit cache entries
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Directory for the symbol index
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Workspace root directory (where .tu is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    /// Language-specific settings
    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Worker threads used for batch builds
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Failed parses of unchanged content before the file is left in the
    /// error state until it changes or a forced build
    #[serde(default = "default_max_parse_attempts")]
    pub max_parse_attempts: u32,

    /// Patterns to ignore when expanding directories
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    /// Memory budget for the index writer
    #[serde(default = "default_writer_heap_bytes")]
    pub writer_heap_bytes: usize,

    /// Attempts for a write that loses the writer lock
    #[serde(default = "default_write_retries")]
    pub write_retries: u32,

    /// Base backoff between write attempts, doubled each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LanguageConfig {
    /// Whether this language is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// File extensions for this language
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Additional parser options (`clang_path`, `std`, ...)
    #[serde(default)]
    pub parser_options: HashMap<String, serde_json::Value>,
}

impl LanguageConfig {
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.parser_options.get(key).and_then(|v| v.as_str())
    }
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_cache_path() -> PathBuf {
    PathBuf::from(".tu/cache")
}
fn default_index_path() -> PathBuf {
    PathBuf::from(".tu/index")
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_max_parse_attempts() -> u32 {
    3
}
fn default_writer_heap_bytes() -> usize {
    50_000_000
}
fn default_write_retries() -> u32 {
    5
}
fn default_retry_backoff_ms() -> u64 {
    25
}
fn default_max_results() -> usize {
    50
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_path: default_cache_path(),
            index_path: default_index_path(),
            workspace_root: None,
            debug: false,
            indexing: IndexingConfig::default(),
            index: IndexConfig::default(),
            completion: CompletionConfig::default(),
            languages: default_languages(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            max_parse_attempts: default_max_parse_attempts(),
            ignore_patterns: vec![
                "target/**".to_string(),
                "build/**".to_string(),
                ".git/**".to_string(),
                "__pycache__/**".to_string(),
            ],
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            writer_heap_bytes: default_writer_heap_bytes(),
            write_retries: default_write_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

fn language(extensions: &[&str]) -> LanguageConfig {
    LanguageConfig {
        enabled: true,
        extensions: extensions.iter().map(|e| e.to_string()).collect(),
        parser_options: HashMap::new(),
    }
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut langs = HashMap::new();
    langs.insert("java".to_string(), language(&["java"]));
    langs.insert("python".to_string(), language(&["py", "pyi"]));
    langs.insert("c".to_string(), language(&["c"]));
    langs.insert(
        "cpp".to_string(),
        language(&["cpp", "cxx", "cc", "c++", "h", "hpp", "hh", "hxx"]),
    );
    langs
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Self::figment(config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref().to_path_buf())
            .extract()
            .map_err(Box::new)
    }

    fn figment(config_path: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nesting levels, single ones stay in field names
            .merge(Env::prefixed("TU_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find `.tu/settings.toml` in the current directory or any ancestor
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where .tu is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'tu init --force' to regenerate."
                    ));
                }
            }
            Err(e) => {
                return Err(format!("Cannot read configuration file: {e}"));
            }
        }

        Ok(())
    }

    /// Resolve a configured directory against the workspace root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn language(&self, id: &str) -> Option<&LanguageConfig> {
        self.languages.get(id)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = format!(
            r#"# tu configuration file

# Version of the configuration schema
version = 1

# Translation-unit cache and symbol index (relative to the workspace root)
cache_path = ".tu/cache"
index_path = ".tu/index"

# Global debug mode
debug = false

[indexing]
# Worker threads for batch builds (defaults to CPU count)
# parallel_threads = {}

# Failed parses of unchanged content before a file stays in the error state
max_parse_attempts = 3

# Patterns skipped when a directory is passed to `tu build`
ignore_patterns = ["target/**", "build/**", ".git/**", "__pycache__/**"]

[index]
writer_heap_bytes = 50000000

# Retries (with doubling backoff) when another writer holds the index lock
write_retries = 5
retry_backoff_ms = 25

[completion]
max_results = 50

[languages.java]
enabled = true
extensions = ["java"]

[languages.python]
enabled = true
extensions = ["py", "pyi"]

[languages.c]
enabled = true
extensions = ["c"]
# parser_options = {{ clang_path = "clang", std = "c11" }}

[languages.cpp]
enabled = true
extensions = ["cpp", "cxx", "cc", "c++", "h", "hpp", "hh", "hxx"]
# parser_options = {{ clang_path = "clang", std = "c++17" }}
"#,
            num_cpus::get()
        );

        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}
