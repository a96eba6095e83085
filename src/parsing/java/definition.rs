//! Java language definition for the registry

use std::sync::Arc;

use super::JavaParser;
use crate::Settings;
use crate::error::ParseResult;
use crate::parsing::{LanguageDefinition, LanguageId, LanguageParser};

pub struct JavaLanguage;

impl JavaLanguage {
    pub const ID: LanguageId = LanguageId::new("java");
}

impl LanguageDefinition for JavaLanguage {
    fn id(&self) -> LanguageId {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn create_parser(&self, _settings: &Settings) -> ParseResult<Box<dyn LanguageParser>> {
        Ok(Box::new(JavaParser::new()?))
    }
}

pub(crate) fn register(registry: &mut crate::parsing::LanguageRegistry) {
    registry.register(Arc::new(JavaLanguage));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::get_registry;

    #[test]
    fn test_java_definition() {
        let java = JavaLanguage;
        assert_eq!(java.id(), LanguageId::new("java"));
        assert_eq!(java.name(), "Java");
        assert!(java.is_enabled(&Settings::default()));
        assert!(get_registry().is_available(JavaLanguage::ID));
    }
}
