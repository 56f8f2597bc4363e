use std::collections::HashMap;
use std::sync::Arc;

use smsbridge_protocol::BridgeLetter;

use crate::bridge::Bridge;
use crate::email::EmailBridge;
use crate::error::BridgeError;

/// Letter-keyed lookup of registered bridges.
///
/// Bridges register once at startup; lookups afterwards are read-only,
/// so the registry can be shared freely across request handlers.
#[derive(Default)]
pub struct BridgeRegistry {
    bridges: HashMap<u8, Arc<dyn Bridge>>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in bridge registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EmailBridge::new()));
        registry
    }

    /// Register a bridge under its own letter; a later registration for
    /// the same letter replaces the earlier one.
    pub fn register(&mut self, bridge: Arc<dyn Bridge>) {
        let letter = bridge.letter();
        tracing::debug!(letter = %letter, name = bridge.name(), "registering bridge");
        self.bridges.insert(letter.as_byte(), bridge);
    }

    pub fn get(&self, letter: BridgeLetter) -> Result<&Arc<dyn Bridge>, BridgeError> {
        self.bridges
            .get(&letter.as_byte())
            .ok_or(BridgeError::UnknownBridge {
                letter: letter.as_char(),
            })
    }

    /// Registered letters, sorted for stable output.
    pub fn letters(&self) -> Vec<char> {
        let mut letters: Vec<char> = self.bridges.keys().map(|b| *b as char).collect();
        letters.sort_unstable();
        letters
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_serves_email() {
        let registry = BridgeRegistry::with_defaults();
        let letter = BridgeLetter::from_char('e').unwrap();
        assert_eq!(registry.get(letter).unwrap().name(), "email");
        assert_eq!(registry.letters(), vec!['e']);
    }

    #[test]
    fn unknown_letter_is_rejected() {
        let registry = BridgeRegistry::with_defaults();
        let letter = BridgeLetter::from_char('q').unwrap();
        assert!(matches!(
            registry.get(letter).unwrap_err(),
            BridgeError::UnknownBridge { letter: 'q' }
        ));
    }

    #[test]
    fn empty_registry_knows_nothing() {
        let registry = BridgeRegistry::new();
        assert!(registry.is_empty());
        let letter = BridgeLetter::from_char('e').unwrap();
        assert!(registry.get(letter).is_err());
    }
}
