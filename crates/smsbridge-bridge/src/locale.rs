use std::collections::BTreeMap;
use std::path::Path;

use crate::error::BridgeError;

/// Translation key for the reply SMS prompt line.
pub const KEY_REPLY_PROMPT: &str = "reply_prompt";

/// Locale table for user-facing reply text.
///
/// Loaded from a TOML file with one section per language code:
///
/// ```toml
/// [en]
/// reply_prompt = "Please paste this entire message in your SMSBridge app"
///
/// [fr]
/// reply_prompt = "Veuillez coller ce message entier dans votre application SMSBridge"
/// ```
#[derive(Debug, Clone)]
pub struct Localization {
    table: BTreeMap<String, BTreeMap<String, String>>,
    active: String,
}

impl Localization {
    /// The translations shipped with the service.
    pub fn builtin() -> Self {
        let mut table = BTreeMap::new();
        for (locale, prompt) in [
            (
                "en",
                "Please paste this entire message in your SMSBridge app",
            ),
            (
                "fr",
                "Veuillez coller ce message entier dans votre application SMSBridge",
            ),
        ] {
            let mut section = BTreeMap::new();
            section.insert(KEY_REPLY_PROMPT.to_owned(), prompt.to_owned());
            table.insert(locale.to_owned(), section);
        }
        Self {
            table,
            active: "en".to_owned(),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, BridgeError> {
        let table: BTreeMap<String, BTreeMap<String, String>> = toml::from_str(content)?;
        let mut localization = Self {
            table,
            active: String::new(),
        };
        localization.set_locale("en")?;
        Ok(localization)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, BridgeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn set_locale(&mut self, locale: &str) -> Result<(), BridgeError> {
        if !self.table.contains_key(locale) {
            return Err(BridgeError::UnknownLocale {
                locale: locale.to_owned(),
                available: self.table.keys().cloned().collect::<Vec<_>>().join(", "),
            });
        }
        self.active = locale.to_owned();
        Ok(())
    }

    pub fn translate(&self, key: &str) -> Result<&str, BridgeError> {
        self.table
            .get(&self.active)
            .and_then(|section| section.get(key))
            .map(String::as_str)
            .ok_or_else(|| BridgeError::MissingTranslation {
                key: key.to_owned(),
                locale: self.active.clone(),
            })
    }
}

impl Default for Localization {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_serves_english_by_default() {
        let loc = Localization::builtin();
        assert_eq!(loc.active(), "en");
        assert!(loc.translate(KEY_REPLY_PROMPT).unwrap().contains("paste"));
    }

    #[test]
    fn switching_locale_changes_translation() {
        let mut loc = Localization::builtin();
        loc.set_locale("fr").unwrap();
        assert!(loc.translate(KEY_REPLY_PROMPT).unwrap().contains("coller"));
    }

    #[test]
    fn unknown_locale_lists_available() {
        let mut loc = Localization::builtin();
        let err = loc.set_locale("xx").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'xx'"));
        assert!(msg.contains("en"));
        assert!(msg.contains("fr"));
        // Active locale is untouched after a failed switch.
        assert_eq!(loc.active(), "en");
    }

    #[test]
    fn missing_key_is_an_error() {
        let loc = Localization::builtin();
        assert!(matches!(
            loc.translate("greeting").unwrap_err(),
            BridgeError::MissingTranslation { .. }
        ));
    }

    #[test]
    fn loads_from_toml() {
        let toml = r#"
            [en]
            reply_prompt = "paste it"

            [de]
            reply_prompt = "bitte einfügen"
        "#;
        let mut loc = Localization::from_toml_str(toml).unwrap();
        assert_eq!(loc.translate(KEY_REPLY_PROMPT).unwrap(), "paste it");
        loc.set_locale("de").unwrap();
        assert_eq!(loc.translate(KEY_REPLY_PROMPT).unwrap(), "bitte einfügen");
    }

    #[test]
    fn toml_without_english_is_rejected() {
        let toml = r#"
            [fr]
            reply_prompt = "coller"
        "#;
        assert!(matches!(
            Localization::from_toml_str(toml).unwrap_err(),
            BridgeError::UnknownLocale { .. }
        ));
    }
}
