//! Flat string attribute maps shared by quotes, orders and events.

use std::collections::BTreeMap;

use serde::Serialize;

/// Field name to single string value.
///
/// Empty values are stored but treated as absent by the typed getters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, or `""`.
    pub fn value(&self, key: &str) -> &str {
        self.0.get(key).map_or("", String::as_str)
    }

    /// Value for `key` parsed as an integer.
    pub fn int64(&self, key: &str) -> Option<i64> {
        self.lookup(key)?.parse().ok()
    }

    /// Value for `key` parsed as a float.
    pub fn float64(&self, key: &str) -> Option<f64> {
        self.lookup(key)?.parse().ok()
    }

    /// Insert or overwrite one field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Overwrite with every field of `update`, keeping the others.
    pub fn merge(&mut self, update: &Self) {
        for (key, value) in &update.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Whether `key` is present (even if empty).
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
