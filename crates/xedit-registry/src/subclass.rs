//! Signature-keyed dispatch table.

use rustc_hash::FxHashMap;
use tracing::debug;
use xedit_core::Signature;

/// Maps record signatures to the variant that wraps them.
///
/// Lookups are exact; a signature with no entry resolves to `None` and the
/// caller falls back to its generic variant. Registering a signature again
/// replaces the earlier entry.
#[derive(Debug, Clone)]
pub struct SubclassRegistry<K> {
    entries: FxHashMap<Signature, K>,
}

impl<K> Default for SubclassRegistry<K> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<K> SubclassRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `signature` to `kind`, returning the previous binding.
    pub fn register(&mut self, signature: Signature, kind: K) -> Option<K> {
        let previous = self.entries.insert(signature, kind);
        if previous.is_some() {
            debug!(%signature, "record kind re-registered");
        }
        previous
    }

    pub fn unregister(&mut self, signature: Signature) -> Option<K> {
        self.entries.remove(&signature)
    }

    pub fn resolve(&self, signature: Option<Signature>) -> Option<&K> {
        signature.and_then(|s| self.entries.get(&s))
    }

    pub fn contains(&self, signature: Signature) -> bool {
        self.entries.contains_key(&signature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn signatures(&self) -> impl Iterator<Item = Signature> + '_ {
        self.entries.keys().copied()
    }
}

impl<K> FromIterator<(Signature, K)> for SubclassRegistry<K> {
    fn from_iter<I: IntoIterator<Item = (Signature, K)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (signature, kind) in iter {
            registry.register(signature, kind);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xedit_core::signatures;

    #[test]
    fn latest_registration_wins() {
        let mut registry = SubclassRegistry::new();
        assert_eq!(registry.register(signatures::ARMO, "A"), None);
        assert_eq!(registry.register(signatures::ARMO, "B"), Some("A"));
        for _ in 0..3 {
            assert_eq!(registry.resolve(Some(signatures::ARMO)), Some(&"B"));
        }
    }

    #[test]
    fn unknown_and_missing_signatures_resolve_to_none() {
        let registry: SubclassRegistry<&str> = [(signatures::GLOB, "global")].into_iter().collect();
        assert_eq!(registry.resolve(Some(signatures::NAVM)), None);
        assert_eq!(registry.resolve(None), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_restores_fallback() {
        let mut registry = SubclassRegistry::new();
        registry.register(signatures::CELL, 1);
        assert_eq!(registry.unregister(signatures::CELL), Some(1));
        assert!(!registry.contains(signatures::CELL));
        assert!(registry.is_empty());
    }
}
