//! Payload discovery inside arbitrarily wrapped webhook envelopes.
//!
//! Automation tools wrap the interesting object in varying layers
//! (`payload.data`, `body`, `record`, ...). The locator checks a fixed list
//! of well-known paths first and then walks nested objects breadth-first,
//! stopping at the first object whose keys look like indicator fields.

use std::collections::{HashSet, VecDeque};

use serde_json::{Map, Value};

use super::key::KeyNormalizer;

/// Default number of objects the breadth-first search may visit.
pub const DEFAULT_VISIT_LIMIT: usize = 50;

/// Substrings of normalized keys that mark an object as indicator-shaped.
const INDICATOR_MARKERS: [&str; 7] = [
    "mvrvz",
    "price",
    "ticker",
    "symbol",
    "timeframe",
    "condition",
    "message",
];

/// Well-known wrapper paths, in priority order. The empty path is the root.
const CANDIDATE_PATHS: [&[&str]; 8] = [
    &["payload", "data"],
    &["payload", "body"],
    &["payload", "payload"],
    &["payload"],
    &["data"],
    &["eventData"],
    &["record"],
    &[],
];

type Object = Map<String, Value>;

/// Single-level unwrap: `value.data` when it is an object, else `value`
/// itself. Returns `None` when `value` is not an object.
#[must_use]
pub fn unwrap_data(value: &Value) -> Option<&Object> {
    let object = value.as_object()?;
    match object.get("data") {
        Some(Value::Object(inner)) => Some(inner),
        _ => Some(object),
    }
}

/// Returns `true` if any key of `object`, once normalized, contains one of
/// the indicator markers (`mvrvz`, `price`, `ticker`, ...).
#[must_use]
pub fn looks_like_indicator(object: &Object, normalizer: &KeyNormalizer) -> bool {
    object.keys().any(|key| {
        let normalized = normalizer.normalize(key);
        INDICATOR_MARKERS
            .iter()
            .any(|marker| normalized.contains(marker))
    })
}

/// Breadth-first locator for the indicator-bearing object of an envelope.
#[derive(Debug, Clone, Copy)]
pub struct PayloadLocator {
    visit_limit: usize,
}

impl PayloadLocator {
    /// Creates a locator that visits at most `visit_limit` objects.
    #[must_use]
    pub const fn new(visit_limit: usize) -> Self {
        Self { visit_limit }
    }

    /// Maximum number of objects a single search visits.
    #[must_use]
    pub const fn visit_limit(&self) -> usize {
        self.visit_limit
    }

    /// Finds the first indicator-shaped object reachable from `root`.
    ///
    /// Candidates from the well-known wrapper paths are tried in order;
    /// when a candidate does not match, its object-valued properties are
    /// queued behind the remaining candidates. The same object is never
    /// queued twice. Returns `None` if nothing matches within the visit
    /// limit.
    #[must_use]
    pub fn locate<'a>(&self, root: &'a Value, normalizer: &KeyNormalizer) -> Option<&'a Object> {
        let mut queue: VecDeque<&'a Object> = VecDeque::new();
        let mut seen: HashSet<*const Object> = HashSet::new();

        for path in CANDIDATE_PATHS {
            if let Some(candidate) = follow(root, path) {
                self.enqueue(candidate, &mut queue, &mut seen);
            }
        }

        while let Some(candidate) = queue.pop_front() {
            if looks_like_indicator(candidate, normalizer) {
                return Some(candidate);
            }
            for child in candidate.values() {
                if let Value::Object(child) = child {
                    self.enqueue(child, &mut queue, &mut seen);
                }
            }
        }

        None
    }

    // Objects are visited in enqueue order, so only the first `visit_limit`
    // enqueued objects can ever be inspected.
    fn enqueue<'a>(
        &self,
        object: &'a Object,
        queue: &mut VecDeque<&'a Object>,
        seen: &mut HashSet<*const Object>,
    ) {
        if seen.len() >= self.visit_limit {
            return;
        }
        if seen.insert(std::ptr::from_ref(object)) {
            queue.push_back(object);
        }
    }
}

impl Default for PayloadLocator {
    fn default() -> Self {
        Self::new(DEFAULT_VISIT_LIMIT)
    }
}

fn follow<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Object> {
    let mut current = root;
    for segment in path {
        current = current.as_object()?.get(*segment)?;
    }
    current.as_object()
}
