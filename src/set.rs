//! Keyed set primitives.
//!
//! Every analysis stage in this crate traffics in sets of values that have a
//! natural identity string: references are identified by name/level/location,
//! dataflow edges by their endpoint locations, source locations by their
//! coordinates. [`KeyedSet`] stores such values in a hash map keyed by that
//! identity, which makes union/minus/intersect cheap and keeps duplicate
//! references from ever entering the analysis.
//!
//! Iteration order is unspecified but stable within a single traversal.

use rustc_hash::FxHashMap;

use crate::error::{NbflowError, Result};

/// A value with a stable identity string.
///
/// Two values with the same key are the same element as far as a
/// [`KeyedSet`] is concerned; the most recently added wins.
pub trait SetMember {
    /// Identity of this value inside a set.
    fn key(&self) -> String;
}

/// Hash set keyed by [`SetMember::key`].
#[derive(Debug, Clone)]
pub struct KeyedSet<T: SetMember> {
    items: FxHashMap<String, T>,
}

impl<T: SetMember + Clone> Default for KeyedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SetMember + Clone> KeyedSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            items: FxHashMap::default(),
        }
    }

    /// Create a set from an iterator of values.
    pub fn from_items<I: IntoIterator<Item = T>>(items: I) -> Self {
        let mut set = Self::new();
        for item in items {
            set.add(item);
        }
        set
    }

    /// Insert a value, replacing any value with the same key.
    pub fn add(&mut self, item: T) {
        self.items.insert(item.key(), item);
    }

    /// Remove a value by identity. Returns the removed value if present.
    pub fn remove(&mut self, item: &T) -> Option<T> {
        self.items.remove(&item.key())
    }

    /// Whether a value with the same identity is present.
    pub fn has(&self, item: &T) -> bool {
        self.items.contains_key(&item.key())
    }

    /// Whether a value with the given key is present.
    pub fn has_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Iterate over the values.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// Number of values.
    pub fn size(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Set equality: same size and every element present in the other.
    pub fn equals(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self.items.keys().all(|k| other.items.contains_key(k))
    }

    /// Union with another set, returning a new set.
    pub fn union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.union_into(other);
        result
    }

    /// Union of any number of sets.
    pub fn union_all<'a, I: IntoIterator<Item = &'a Self>>(&self, others: I) -> Self
    where
        T: 'a,
    {
        let mut result = self.clone();
        for other in others {
            result.union_into(other);
        }
        result
    }

    /// Union another set into this one in place.
    pub fn union_into(&mut self, other: &Self) {
        for (key, item) in &other.items {
            self.items.entry(key.clone()).or_insert_with(|| item.clone());
        }
    }

    /// Elements present in both sets.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|(k, _)| other.items.contains_key(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Elements of this set not present in the other.
    pub fn minus(&self, other: &Self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|(k, _)| !other.items.contains_key(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Elements satisfying a predicate.
    pub fn filter(&self, mut predicate: impl FnMut(&T) -> bool) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|(_, v)| predicate(v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Whether any element satisfies a predicate.
    pub fn some(&self, mut predicate: impl FnMut(&T) -> bool) -> bool {
        self.items.values().any(|v| predicate(v))
    }

    /// Map every element into a new set (the target type supplies the keys).
    pub fn map<U: SetMember + Clone>(&self, mut f: impl FnMut(&T) -> U) -> KeyedSet<U> {
        KeyedSet::from_items(self.items.values().map(|v| f(v)))
    }

    /// Cartesian product with another set.
    pub fn product<'a, U: SetMember + Clone>(
        &'a self,
        other: &'a KeyedSet<U>,
    ) -> impl Iterator<Item = (&'a T, &'a U)> {
        self.items
            .values()
            .flat_map(move |a| other.items.values().map(move |b| (a, b)))
    }

    /// Remove and return an arbitrary element.
    ///
    /// # Errors
    /// [`NbflowError::EmptySet`] if the set is empty.
    pub fn take(&mut self) -> Result<T> {
        let key = self.items.keys().next().cloned().ok_or(NbflowError::EmptySet)?;
        Ok(self.items.remove(&key).expect("key just observed"))
    }

    /// Values collected into a vector (unspecified order).
    pub fn to_vec(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }
}

impl<T: SetMember + Clone> PartialEq for KeyedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl<T: SetMember + Clone> FromIterator<T> for KeyedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

impl SetMember for String {
    fn key(&self) -> String {
        self.clone()
    }
}

impl SetMember for usize {
    fn key(&self) -> String {
        self.to_string()
    }
}

impl<A: SetMember, B: SetMember> SetMember for (A, B) {
    fn key(&self) -> String {
        format!("({},{})", self.0.key(), self.1.key())
    }
}

/// Set of strings.
pub type StringSet = KeyedSet<String>;

/// Set of numbers.
pub type NumberSet = KeyedSet<usize>;

/// The half-open integer set `[min, max)`.
pub fn range(min: usize, max: usize) -> NumberSet {
    NumberSet::from_items(min..max)
}
