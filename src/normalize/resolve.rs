//! Synonym-aware field lookup over a payload object.

use std::cell::OnceCell;
use std::collections::HashMap;

use serde_json::{Map, Value};

use super::key::KeyNormalizer;

/// Looks up one logical field in `payload` given its accepted spellings.
///
/// See [`FieldResolver::resolve`] for the matching rules.
#[must_use]
pub fn resolve<'a>(
    payload: &'a Map<String, Value>,
    candidate_keys: &[&str],
    normalizer: &'a KeyNormalizer,
) -> Option<&'a Value> {
    FieldResolver::new(payload, normalizer).resolve(candidate_keys)
}

/// Resolves logical fields against one payload object.
///
/// The normalized-key index is built at most once, on the first lookup that
/// misses every exact spelling, so resolving many fields from the same
/// payload normalizes each payload key only once.
#[derive(Debug)]
pub struct FieldResolver<'a> {
    payload: &'a Map<String, Value>,
    normalizer: &'a KeyNormalizer,
    index: OnceCell<HashMap<String, &'a Value>>,
}

impl<'a> FieldResolver<'a> {
    /// Creates a resolver over `payload`.
    #[must_use]
    pub fn new(payload: &'a Map<String, Value>, normalizer: &'a KeyNormalizer) -> Self {
        Self {
            payload,
            normalizer,
            index: OnceCell::new(),
        }
    }

    /// Returns the raw value for the first matching candidate key.
    ///
    /// Exact key matches win, checked in candidate order. Only if none of the
    /// candidates is present verbatim are normalized spellings compared,
    /// again in candidate order. When several payload keys normalize to the
    /// same form, the first one in payload order is used. A present `null`
    /// counts as a match.
    #[must_use]
    pub fn resolve(&self, candidate_keys: &[&str]) -> Option<&'a Value> {
        if let Some(value) = candidate_keys.iter().find_map(|key| self.payload.get(*key)) {
            return Some(value);
        }

        let index = self.index();
        candidate_keys
            .iter()
            .find_map(|key| index.get(&self.normalizer.normalize(key)).copied())
    }

    fn index(&self) -> &HashMap<String, &'a Value> {
        self.index.get_or_init(|| {
            let mut index = HashMap::with_capacity(self.payload.len());
            for (key, value) in self.payload {
                index.entry(self.normalizer.normalize(key)).or_insert(value);
            }
            index
        })
    }
}
