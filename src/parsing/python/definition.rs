//! Python language definition for the registry

use std::sync::Arc;

use super::PythonParser;
use crate::Settings;
use crate::error::ParseResult;
use crate::parsing::{LanguageDefinition, LanguageId, LanguageParser};

pub struct PythonLanguage;

impl PythonLanguage {
    pub const ID: LanguageId = LanguageId::new("python");
}

impl LanguageDefinition for PythonLanguage {
    fn id(&self) -> LanguageId {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn create_parser(&self, _settings: &Settings) -> ParseResult<Box<dyn LanguageParser>> {
        Ok(Box::new(PythonParser::new()?))
    }
}

pub(crate) fn register(registry: &mut crate::parsing::LanguageRegistry) {
    registry.register(Arc::new(PythonLanguage));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_definition() {
        let python = PythonLanguage;
        assert_eq!(python.id(), LanguageId::new("python"));
        assert_eq!(python.extensions(), &["py", "pyi"]);

        let mut settings = Settings::default();
        assert!(python.is_enabled(&settings));
        settings.languages.remove("python");
        assert!(python.is_enabled(&settings));
    }
}
