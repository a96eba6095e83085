//! C and C++ language definitions for the registry
//!
//! Both dialects share one clang-backed parser. `.h` defaults to C++
//! since clang's C++ mode accepts nearly all C headers; projects that want
//! C semantics move the extension in settings.toml.

use std::sync::Arc;

use super::{ClangParser, Dialect};
use crate::Settings;
use crate::error::ParseResult;
use crate::parsing::{LanguageDefinition, LanguageId, LanguageParser};

pub struct CLanguage;

impl CLanguage {
    pub const ID: LanguageId = LanguageId::new("c");
}

impl LanguageDefinition for CLanguage {
    fn id(&self) -> LanguageId {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "C"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["c"]
    }

    fn create_parser(&self, settings: &Settings) -> ParseResult<Box<dyn LanguageParser>> {
        Ok(Box::new(ClangParser::from_settings(Dialect::C, settings)))
    }
}

pub struct CppLanguage;

impl CppLanguage {
    pub const ID: LanguageId = LanguageId::new("cpp");
}

impl LanguageDefinition for CppLanguage {
    fn id(&self) -> LanguageId {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "C++"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cpp", "cxx", "cc", "c++", "h", "hpp", "hh", "hxx"]
    }

    fn create_parser(&self, settings: &Settings) -> ParseResult<Box<dyn LanguageParser>> {
        Ok(Box::new(ClangParser::from_settings(Dialect::Cpp, settings)))
    }
}

pub(crate) fn register(registry: &mut crate::parsing::LanguageRegistry) {
    registry.register(Arc::new(CLanguage));
    registry.register(Arc::new(CppLanguage));
}
