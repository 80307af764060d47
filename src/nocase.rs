//! Ordered, case-insensitive, case-preserving map.
//!
//! CIM names (classes, properties, methods, parameters, qualifiers, keys)
//! compare case-insensitively but keep the casing they were written with
//! (DSP0004 naming rule). Property/method/parameter collections additionally
//! preserve insertion order, which matters for round-tripping the wire form.
//!
//! Gebaut auf `IndexMap` mit ahash (deterministische Iteration + schnelles
//! Hashing); der Index-Key ist der lowercased Name, der Originalname wird
//! neben dem Wert gespeichert.

use core::fmt;

use crate::FastIndexMap;

/// Ordered map with case-insensitive `&str` keys.
#[derive(Clone, Default)]
pub struct NocaseMap<V> {
    inner: FastIndexMap<String, (String, V)>,
}

impl<V> NocaseMap<V> {
    pub fn new() -> Self {
        Self {
            inner: FastIndexMap::default(),
        }
    }

    /// Inserts under the case-folded key. An existing entry keeps its
    /// position; its stored name is updated to the new casing.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        let name = name.into();
        let folded = name.to_ascii_lowercase();
        self.inner
            .insert(folded, (name, value))
            .map(|(_, old)| old)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates in insertion order, yielding the original (case-preserved) names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.inner.values().map(|(name, v)| (name.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.values().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values().map(|(_, v)| v)
    }
}

impl<V: PartialEq> PartialEq for NocaseMap<V> {
    /// Equality is order-sensitive and case-insensitive on names.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .inner
                .iter()
                .zip(other.inner.iter())
                .all(|((ka, (_, va)), (kb, (_, vb)))| ka == kb && va == vb)
    }
}

impl<V: fmt::Debug> fmt::Debug for NocaseMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V> FromIterator<(String, V)> for NocaseMap<V> {
    fn from_iter<T: IntoIterator<Item = (String, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut m = NocaseMap::new();
        m.insert("CreationClassName", 1);
        assert_eq!(m.get("creationclassname"), Some(&1));
        assert_eq!(m.get("CREATIONCLASSNAME"), Some(&1));
        assert!(m.contains_key("CreationClassName"));
        assert_eq!(m.get("Other"), None);
    }

    #[test]
    fn preserves_insertion_order_and_casing() {
        let mut m = NocaseMap::new();
        m.insert("Beta", 2);
        m.insert("Alpha", 1);
        let names: Vec<&str> = m.keys().collect();
        assert_eq!(names, ["Beta", "Alpha"]);
    }

    #[test]
    fn reinsert_keeps_position() {
        let mut m = NocaseMap::new();
        m.insert("First", 1);
        m.insert("Second", 2);
        assert_eq!(m.insert("FIRST", 10), Some(1));
        let entries: Vec<(&str, &i32)> = m.iter().collect();
        assert_eq!(entries, [("FIRST", &10), ("Second", &2)]);
    }

    #[test]
    fn equality_is_case_insensitive() {
        let a: NocaseMap<i32> = [("Name".to_string(), 1)].into_iter().collect();
        let b: NocaseMap<i32> = [("NAME".to_string(), 1)].into_iter().collect();
        assert_eq!(a, b);
    }
}
