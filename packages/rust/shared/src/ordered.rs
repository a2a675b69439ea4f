//! Insertion-ordered string map used for catalog documents.
//!
//! Catalog files are hand-edited and diffed, so destino and categoria keys
//! must come back out in the order they went in. Re-inserting an existing key
//! replaces its value in place.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A small map that remembers key insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.position(key).map(move |i| &mut self.entries[i].1)
    }

    /// Insert `value` under `key`.
    ///
    /// An existing key keeps its position and the previous value is returned.
    /// A new key is appended.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.position(&key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Get the value for `key`, appending `make()` first if it is absent.
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let index = match self.position(key) {
            Some(i) => i,
            None => {
                self.entries.push((key.to_string(), make()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut V)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        // Duplicate keys resolve last-write-wins, same as a merge.
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_document_order() {
        let json = r#"{"Cozumel": 1, "Cancún": 2, "Playa del Carmen": 3}"#;
        let map: OrderedMap<u32> = serde_json::from_str(json).expect("parse");
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["Cozumel", "Cancún", "Playa del Carmen"]);

        let back = serde_json::to_string(&map).expect("serialize");
        assert_eq!(back, r#"{"Cozumel":1,"Cancún":2,"Playa del Carmen":3}"#);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut map: OrderedMap<&str> = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(map.insert("a", "9"), Some("1"));
        assert_eq!(map.insert("c", "3"), None);
        let pairs: Vec<(&str, &&str)> = map.iter().collect();
        assert_eq!(pairs, vec![("a", &"9"), ("b", &"2"), ("c", &"3")]);
    }

    #[test]
    fn duplicate_keys_keep_last_value() {
        let map: OrderedMap<u32> = serde_json::from_str(r#"{"x": 1, "y": 2, "x": 3}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("x"), Some(&3));
        assert_eq!(map.keys().next(), Some("x"));
    }

    #[test]
    fn get_or_insert_appends_once() {
        let mut map: OrderedMap<Vec<u32>> = OrderedMap::new();
        map.get_or_insert_with("Cancún", Vec::new).push(1);
        map.get_or_insert_with("Cancún", Vec::new).push(2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Cancún"), Some(&vec![1, 2]));
    }

    #[test]
    fn rejects_non_object() {
        let result: std::result::Result<OrderedMap<u32>, _> = serde_json::from_str("[1, 2]");
        assert!(result.is_err());
    }
}
