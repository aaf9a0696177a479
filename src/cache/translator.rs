//! Identity translation between the `ref:` and `uuid:` aliasing schemes
//!
//! Every asset is addressable under two canonical keys, one per scheme.
//! The translator keeps the pairing in both directions so either key
//! resolves to the single cached object. The `ref:` key is the canonical
//! form used internally by the stores.

use std::collections::HashMap;

/// Bidirectional `ref:` <-> `uuid:` key mapping.
#[derive(Debug, Default)]
pub struct IdentityTranslator {
    ref_to_uuid: HashMap<String, String>,
    uuid_to_ref: HashMap<String, String>,
}

impl IdentityTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pair in both directions.
    ///
    /// Re-registering an identical pair is a no-op and succeeds. If either
    /// key is already mapped to a different counterpart, nothing is
    /// registered and `false` is returned; callers surface that as a
    /// structured warning rather than a hard failure.
    pub fn add_pair(&mut self, ref_key: &str, uuid_key: &str) -> bool {
        match (
            self.ref_to_uuid.get(ref_key),
            self.uuid_to_ref.get(uuid_key),
        ) {
            (Some(existing_uuid), _) if existing_uuid != uuid_key => false,
            (_, Some(existing_ref)) if existing_ref != ref_key => false,
            (Some(_), Some(_)) => true,
            _ => {
                self.ref_to_uuid
                    .insert(ref_key.to_string(), uuid_key.to_string());
                self.uuid_to_ref
                    .insert(uuid_key.to_string(), ref_key.to_string());
                true
            }
        }
    }

    /// Resolve either canonical key to the internal `ref:` key.
    ///
    /// `ref:` keys pass through unchanged (the asset may not be registered
    /// yet); unknown `uuid:` keys yield `None`.
    pub fn resolve_key(&self, key: &str) -> Option<String> {
        if key.starts_with("ref:") {
            Some(key.to_string())
        } else {
            self.uuid_to_ref.get(key).cloned()
        }
    }

    /// The `uuid:` counterpart of a registered `ref:` key.
    pub fn uuid_for(&self, ref_key: &str) -> Option<&str> {
        self.ref_to_uuid.get(ref_key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ref_to_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ref_to_uuid.is_empty()
    }

    pub fn reset(&mut self) {
        self.ref_to_uuid.clear();
        self.uuid_to_ref.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_resolves_both_ways() {
        let mut translator = IdentityTranslator::new();
        assert!(translator.add_pair("ref:Song-1", "uuid:aaa"));

        assert_eq!(
            translator.resolve_key("uuid:aaa"),
            Some("ref:Song-1".to_string())
        );
        assert_eq!(
            translator.resolve_key("ref:Song-1"),
            Some("ref:Song-1".to_string())
        );
        assert_eq!(translator.uuid_for("ref:Song-1"), Some("uuid:aaa"));
    }

    #[test]
    fn test_reregistering_same_pair_is_idempotent() {
        let mut translator = IdentityTranslator::new();
        assert!(translator.add_pair("ref:Song-1", "uuid:aaa"));
        assert!(translator.add_pair("ref:Song-1", "uuid:aaa"));
        assert_eq!(translator.len(), 1);
    }

    #[test]
    fn test_conflicting_uuid_rejected() {
        let mut translator = IdentityTranslator::new();
        assert!(translator.add_pair("ref:Song-1", "uuid:aaa"));
        assert!(!translator.add_pair("ref:Song-1", "uuid:bbb"));

        // Nothing was overwritten
        assert_eq!(translator.uuid_for("ref:Song-1"), Some("uuid:aaa"));
        assert_eq!(translator.resolve_key("uuid:bbb"), None);
    }

    #[test]
    fn test_conflicting_ref_rejected() {
        let mut translator = IdentityTranslator::new();
        assert!(translator.add_pair("ref:Song-1", "uuid:aaa"));
        assert!(!translator.add_pair("ref:Song-2", "uuid:aaa"));
        assert_eq!(
            translator.resolve_key("uuid:aaa"),
            Some("ref:Song-1".to_string())
        );
    }

    #[test]
    fn test_unknown_uuid_unresolved() {
        let translator = IdentityTranslator::new();
        assert_eq!(translator.resolve_key("uuid:unknown"), None);
    }

    #[test]
    fn test_reset() {
        let mut translator = IdentityTranslator::new();
        translator.add_pair("ref:Song-1", "uuid:aaa");
        translator.reset();
        assert!(translator.is_empty());
        assert_eq!(translator.resolve_key("uuid:aaa"), None);
    }
}
