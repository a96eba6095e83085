//! Translation units: one fully parsed source file.

use crate::ast::AstNode;
use crate::indexing::file_info::hash_file;
use crate::parsing::LanguageId;
use crate::symbol::{Symbol, SymbolReference};
use crate::types::{CompactString, Diagnostic, Location};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Parsed form of one source file, created or replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub path: CompactString,
    pub language: LanguageId,
    pub content_hash: String,
    /// Files whose content this parse depended on, discovered while parsing.
    pub dependencies: Vec<Dependency>,
    pub imports: Vec<Import>,
    pub root: AstNode,
    pub symbols: Vec<Symbol>,
    pub references: Vec<SymbolReference>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TranslationUnit {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn depends_on(&self, file: &str) -> bool {
        self.dependencies.iter().any(|dep| &*dep.path == file)
    }

    /// Whether a definition in `file` is reachable through this unit's
    /// includes or imports.
    pub fn imports_file(&self, file: &str) -> bool {
        self.depends_on(file) || self.imports.iter().any(|import| import.matches_file(file))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Path key, see [`PathKeys`].
    pub path: CompactString,
    pub content_hash: String,
}

impl Dependency {
    /// Hash the file at `fs_path`; `None` when it cannot be read.
    pub fn capture(keys: &PathKeys, fs_path: &Path) -> Option<Self> {
        let content_hash = hash_file(fs_path).ok()?;
        Some(Self {
            path: keys.key(fs_path),
            content_hash,
        })
    }
}

/// An import or include as written in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Dotted module path (`com.acme.Foo`, `pkg.mod`) or include path (`util.h`).
    pub path: CompactString,
    pub alias: Option<CompactString>,
    pub is_glob: bool,
    pub location: Location,
}

impl Import {
    /// Whether `file` is the file (or, for globs, lives in the package) this
    /// import names.
    pub fn matches_file(&self, file: &str) -> bool {
        let file = file.replace('\\', "/");
        let stem = match file.rsplit_once('.') {
            Some((stem, _)) if !stem.ends_with('/') => stem,
            _ => file.as_str(),
        };
        let stem = stem.strip_suffix("/__init__").unwrap_or(stem);

        let wanted = if self.path.contains('/') || self.path.ends_with(".h") {
            self.path.rsplit_once('.').map_or(&*self.path, |(s, _)| s).to_string()
        } else {
            self.path.trim_start_matches('.').replace('.', "/")
        };
        if wanted.is_empty() {
            return false;
        }

        if self.is_glob {
            let dir = stem.rsplit_once('/').map_or("", |(dir, _)| dir);
            return ends_with_segments(dir, &wanted);
        }
        ends_with_segments(stem, &wanted)
    }
}

fn ends_with_segments(path: &str, suffix: &str) -> bool {
    path == suffix || path.ends_with(&format!("/{suffix}"))
}

/// Language-specific toolchain settings supplied with each file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileContext {
    pub include_paths: Vec<PathBuf>,
    pub classpath: Vec<PathBuf>,
    pub language_version: Option<String>,
    /// Extra toolchain flags passed through unchanged.
    pub flags: Vec<String>,
}

/// One file handed to the builder by the build-discovery side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Detected from the extension when `None`.
    pub language: Option<LanguageId>,
    pub context: CompileContext,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            language: None,
            context: CompileContext::default(),
        }
    }

    pub fn with_language(mut self, language: LanguageId) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_context(mut self, context: CompileContext) -> Self {
        self.context = context;
        self
    }
}

/// Maps file-system paths to the stable string keys used in symbol ids,
/// cache entries and index rows.
///
/// Paths under the workspace root become root-relative, everything else is
/// kept as given. Separators are normalised to `/` and `.` components dropped.
#[derive(Debug, Clone, Default)]
pub struct PathKeys {
    root: Option<PathBuf>,
}

impl PathKeys {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn key(&self, path: &Path) -> CompactString {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        let mut parts: Vec<String> = Vec::new();
        let mut absolute = false;
        for component in relative.components() {
            match component {
                Component::RootDir => absolute = true,
                Component::CurDir => {}
                Component::Prefix(prefix) => {
                    parts.push(prefix.as_os_str().to_string_lossy().into_owned())
                }
                Component::ParentDir => parts.push("..".to_string()),
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            }
        }
        let joined = parts.join("/");
        if absolute {
            format!("/{joined}").into()
        } else {
            joined.into()
        }
    }

    /// File-system path for a key produced by [`PathKeys::key`].
    pub fn resolve(&self, key: &str) -> PathBuf {
        let path = PathBuf::from(key);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}
