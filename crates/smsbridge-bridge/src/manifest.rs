use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// One entry of the deployment's bridge manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeManifestEntry {
    /// Wire letter, as carried in envelopes.
    pub letter: char,
    /// Keyword users text to select this bridge.
    pub shortcode: String,
    pub name: String,
}

/// Deployment manifest describing the known bridges, loaded from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BridgeManifest {
    entries: Vec<BridgeManifestEntry>,
}

impl BridgeManifest {
    pub fn from_json_str(json: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, BridgeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn entries(&self) -> &[BridgeManifestEntry] {
        &self.entries
    }

    pub fn by_shortcode(&self, shortcode: &str) -> Result<&BridgeManifestEntry, BridgeError> {
        self.entries
            .iter()
            .find(|entry| entry.shortcode == shortcode)
            .ok_or_else(|| BridgeError::UnknownShortcode {
                shortcode: shortcode.to_owned(),
                available: self.available(),
            })
    }

    pub fn by_letter(&self, letter: char) -> Option<&BridgeManifestEntry> {
        self.entries.iter().find(|entry| entry.letter == letter)
    }

    fn available(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("'{}' for {}", entry.shortcode, entry.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"[
        {"letter": "e", "shortcode": "email", "name": "Email Bridge"},
        {"letter": "t", "shortcode": "test", "name": "Test Bridge"}
    ]"#;

    #[test]
    fn parses_and_looks_up_by_shortcode() {
        let manifest = BridgeManifest::from_json_str(MANIFEST).unwrap();
        assert_eq!(manifest.entries().len(), 2);

        let entry = manifest.by_shortcode("email").unwrap();
        assert_eq!(entry.letter, 'e');
        assert_eq!(entry.name, "Email Bridge");
    }

    #[test]
    fn unknown_shortcode_lists_available() {
        let manifest = BridgeManifest::from_json_str(MANIFEST).unwrap();
        let err = manifest.by_shortcode("telegram").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'telegram'"));
        assert!(msg.contains("'email' for Email Bridge"));
        assert!(msg.contains("'test' for Test Bridge"));
    }

    #[test]
    fn lookup_by_letter() {
        let manifest = BridgeManifest::from_json_str(MANIFEST).unwrap();
        assert_eq!(manifest.by_letter('t').unwrap().shortcode, "test");
        assert!(manifest.by_letter('x').is_none());
    }

    #[test]
    fn invalid_json_is_a_manifest_error() {
        assert!(matches!(
            BridgeManifest::from_json_str("{broken").unwrap_err(),
            BridgeError::Manifest(_)
        ));
    }
}
