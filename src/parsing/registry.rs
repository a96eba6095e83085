//! Language registry for language discovery and parser creation
//!
//! The registry separates "available" from "enabled":
//! - Available: all front ends compiled into the binary
//! - Enabled: languages activated in `.tu/settings.toml`
//!
//! The built-in set is assembled once and shared read-only; tests build
//! their own registries with mock definitions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

use super::LanguageParser;
use crate::Settings;
use crate::error::ParseResult;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Type-safe language identifier
///
/// Uses &'static str for zero-cost comparisons and storage.
/// The string must be a compile-time constant (language key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LanguageId(&'static str);

impl LanguageId {
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for LanguageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for LanguageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        let static_str = match s.as_str() {
            "java" => "java",
            "python" => "python",
            "c" => "c",
            "cpp" => "cpp",
            // Unknown ids come only from settings or cache files written by
            // another build; leaking keeps LanguageId Copy.
            _ => Box::leak(s.into_boxed_str()),
        };

        Ok(LanguageId(static_str))
    }
}

/// Registry errors with actionable suggestions
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(
        "Language '{0}' not found in registry\nSuggestion: Supported languages are java, python, c and cpp"
    )]
    LanguageNotFound(LanguageId),

    #[error(
        "Language '{0}' is available but disabled\nSuggestion: Enable it in .tu/settings.toml by setting languages.{0}.enabled = true"
    )]
    LanguageDisabled(LanguageId),

    #[error(
        "No language found for extension '.{0}'\nSuggestion: Check if the file type is supported or add the extension to a language in settings.toml"
    )]
    ExtensionNotMapped(String),

    #[error(
        "Failed to create parser for language '{language}': {reason}\nSuggestion: Check the language configuration in settings.toml"
    )]
    ParserCreationFailed {
        language: LanguageId,
        reason: String,
    },
}

/// Trait for language modules to implement
pub trait LanguageDefinition: Send + Sync {
    /// Unique identifier, matching the key used in settings.toml
    fn id(&self) -> LanguageId;

    /// Human-readable name (e.g., "Java", "C++")
    fn name(&self) -> &'static str;

    /// File extensions without the dot prefix
    fn extensions(&self) -> &'static [&'static str];

    /// Create a parser instance for this language
    fn create_parser(&self, settings: &Settings) -> ParseResult<Box<dyn LanguageParser>>;

    fn default_enabled(&self) -> bool {
        true
    }

    /// Check `settings.languages[id].enabled`, falling back to the default
    fn is_enabled(&self, settings: &Settings) -> bool {
        settings
            .languages
            .get(self.id().as_str())
            .map(|config| config.enabled)
            .unwrap_or_else(|| self.default_enabled())
    }
}

pub struct LanguageRegistry {
    definitions: HashMap<LanguageId, Arc<dyn LanguageDefinition>>,

    /// Built from all available languages, not just enabled ones
    extension_map: HashMap<&'static str, LanguageId>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            extension_map: HashMap::new(),
        }
    }

    /// Registry holding every built-in front end
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        initialize_registry(&mut registry);
        registry
    }

    pub fn register(&mut self, definition: Arc<dyn LanguageDefinition>) {
        let id = definition.id();
        for ext in definition.extensions() {
            self.extension_map.insert(ext, id);
        }
        self.definitions.insert(id, definition);
    }

    #[must_use]
    pub fn get(&self, id: LanguageId) -> Option<&dyn LanguageDefinition> {
        self.definitions.get(&id).map(|def| def.as_ref())
    }

    #[must_use]
    pub fn get_by_extension(&self, extension: &str) -> Option<&dyn LanguageDefinition> {
        let ext = extension.strip_prefix('.').unwrap_or(extension);

        self.extension_map.get(ext).and_then(|id| self.get(*id))
    }

    /// Convert a string (from storage or the CLI) to a registered LanguageId
    #[must_use]
    pub fn find_language_id(&self, name: &str) -> Option<LanguageId> {
        self.definitions.keys().copied().find(|id| id.as_str() == name)
    }

    pub fn iter_all(&self) -> impl Iterator<Item = &dyn LanguageDefinition> {
        self.definitions.values().map(|def| def.as_ref())
    }

    pub fn iter_enabled<'a>(
        &'a self,
        settings: &'a Settings,
    ) -> impl Iterator<Item = &'a dyn LanguageDefinition> {
        self.iter_all().filter(move |def| def.is_enabled(settings))
    }

    #[must_use]
    pub fn is_available(&self, id: LanguageId) -> bool {
        self.definitions.contains_key(&id)
    }

    #[must_use]
    pub fn is_enabled(&self, id: LanguageId, settings: &Settings) -> bool {
        self.get(id)
            .map(|def| def.is_enabled(settings))
            .unwrap_or(false)
    }

    /// Detect the language of `path` from its extension.
    ///
    /// Extensions listed under `languages.<id>.extensions` in settings take
    /// precedence over the built-in mapping, so `.h` can be moved to `c`.
    pub fn language_for_path(
        &self,
        path: &Path,
        settings: &Settings,
    ) -> Result<LanguageId, RegistryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let mut configured: Vec<_> = settings
            .languages
            .iter()
            .filter(|(_, config)| config.enabled && config.extensions.iter().any(|e| e == ext))
            .filter_map(|(name, _)| self.find_language_id(name))
            .collect();
        // Several languages may claim an extension (defaults plus user additions)
        configured.sort();
        if let Some(builtin) = self.extension_map.get(ext) {
            if configured.contains(builtin) {
                return Ok(*builtin);
            }
        }
        if let Some(id) = configured.first() {
            return Ok(*id);
        }

        self.extension_map
            .get(ext)
            .copied()
            .ok_or_else(|| RegistryError::ExtensionNotMapped(ext.to_string()))
    }

    /// Create a parser, checking availability and settings first
    pub fn create_parser(
        &self,
        id: LanguageId,
        settings: &Settings,
    ) -> Result<Box<dyn LanguageParser>, RegistryError> {
        match self.get(id) {
            None => Err(RegistryError::LanguageNotFound(id)),
            Some(def) => {
                if !def.is_enabled(settings) {
                    return Err(RegistryError::LanguageDisabled(id));
                }

                def.create_parser(settings)
                    .map_err(|e| RegistryError::ParserCreationFailed {
                        language: id,
                        reason: e.to_string(),
                    })
            }
        }
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: LazyLock<Arc<LanguageRegistry>> =
    LazyLock::new(|| Arc::new(LanguageRegistry::with_builtin()));

fn initialize_registry(registry: &mut LanguageRegistry) {
    super::java::register(registry);
    super::python::register(registry);
    super::clang::register(registry);
}

/// Shared read-only registry of the built-in front ends
pub fn get_registry() -> Arc<LanguageRegistry> {
    Arc::clone(&REGISTRY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    struct MockLanguage {
        id: LanguageId,
        enabled: bool,
    }

    impl LanguageDefinition for MockLanguage {
        fn id(&self) -> LanguageId {
            self.id
        }

        fn name(&self) -> &'static str {
            "Mock Language"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &["mock", "test"]
        }

        fn create_parser(&self, _settings: &Settings) -> ParseResult<Box<dyn LanguageParser>> {
            Err(ParseError::ParserUnavailable {
                language: self.id,
                path: String::new(),
                reason: "mock toolchain is not installed".to_string(),
            })
        }

        fn is_enabled(&self, _settings: &Settings) -> bool {
            self.enabled
        }
    }

    #[test]
    fn test_language_id() {
        let id1 = LanguageId::new("java");
        let id2 = LanguageId::new("java");
        let id3 = LanguageId::new("python");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1.as_str(), "java");
        assert_eq!(format!("{id1}"), "java");
    }

    #[test]
    fn test_registry_registration() {
        let mut registry = LanguageRegistry::new();
        registry.register(Arc::new(MockLanguage {
            id: LanguageId::new("mock"),
            enabled: true,
        }));

        assert!(registry.is_available(LanguageId::new("mock")));
        assert!(!registry.is_available(LanguageId::new("unknown")));

        assert!(registry.get_by_extension("mock").is_some());
        assert!(registry.get_by_extension(".test").is_some());
        assert!(registry.get_by_extension("unknown").is_none());
    }

    #[test]
    fn test_disabled_and_failing_languages() {
        let mut registry = LanguageRegistry::new();
        registry.register(Arc::new(MockLanguage {
            id: LanguageId::new("enabled"),
            enabled: true,
        }));
        registry.register(Arc::new(MockLanguage {
            id: LanguageId::new("disabled"),
            enabled: false,
        }));

        let settings = Settings::default();
        let enabled: Vec<_> = registry.iter_enabled(&settings).collect();
        assert_eq!(enabled.len(), 1);

        assert!(matches!(
            registry.create_parser(LanguageId::new("disabled"), &settings),
            Err(RegistryError::LanguageDisabled(_))
        ));
        assert!(matches!(
            registry.create_parser(LanguageId::new("enabled"), &settings),
            Err(RegistryError::ParserCreationFailed { .. })
        ));
        assert!(matches!(
            registry.create_parser(LanguageId::new("nope"), &settings),
            Err(RegistryError::LanguageNotFound(_))
        ));
    }

    #[test]
    fn test_global_registry_extensions() {
        let registry = get_registry();
        let settings = Settings::default();

        for (file, lang) in [
            ("src/Foo.java", "java"),
            ("pkg/mod.py", "python"),
            ("stubs/mod.pyi", "python"),
            ("lib/util.c", "c"),
            ("lib/util.h", "cpp"),
            ("lib/widget.cc", "cpp"),
            ("lib/widget.hpp", "cpp"),
        ] {
            let id = registry.language_for_path(Path::new(file), &settings).unwrap();
            assert_eq!(id.as_str(), lang, "{file}");
        }

        assert!(matches!(
            registry.language_for_path(Path::new("README.md"), &settings),
            Err(RegistryError::ExtensionNotMapped(_))
        ));
    }

    #[test]
    fn test_settings_can_remap_extensions() {
        let registry = get_registry();
        let mut settings = Settings::default();
        if let Some(cpp) = settings.languages.get_mut("cpp") {
            cpp.extensions.retain(|e| e != "h");
        }
        if let Some(c) = settings.languages.get_mut("c") {
            c.extensions.push("h".to_string());
        }
        let id = registry
            .language_for_path(Path::new("include/api.h"), &settings)
            .unwrap();
        assert_eq!(id.as_str(), "c");
    }
}
