//! Case-insensitive, insertion-ordered header storage

use indexmap::IndexMap;
use std::fmt;

/// Header names mapped to their value lists.
///
/// Names are compared ASCII case-insensitively: `Content-Type` and
/// `content-type` address the same entry. Iteration follows first insertion
/// of each (normalized) name and reports the spelling used by the most recent
/// write.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HeaderStore {
    entries: IndexMap<String, HeaderEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    values: Vec<String>,
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl HeaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value stored under `name`, if any
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values stored under `name`, in declaration order
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.entries
            .get(&normalize(name))
            .map(|entry| entry.values.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    /// Replace whatever is stored under `name` with the single `value`.
    pub fn put_single(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.put(name, vec![value.into()]);
    }

    /// Replace whatever is stored under `name` with `values`.
    ///
    /// There is no append: a second write under the same name,
    /// in any case, discards the first.
    pub fn put(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        self.entries
            .insert(normalize(&name), HeaderEntry { name, values });
    }

    /// Remove `name`, returning its values
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries
            .shift_remove(&normalize(name))
            .map(|entry| entry.values)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, values)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .values()
            .map(|entry| (entry.name.as_str(), entry.values.as_slice()))
    }

    /// Iterate over header names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|entry| entry.name.as_str())
    }
}

impl fmt::Debug for HeaderStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = HeaderStore::new();
        for (name, value) in iter {
            store.put_single(name, value);
        }
        store
    }
}
