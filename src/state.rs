//! Flattened resource state and change detection.
//!
//! A [`StateMap`] is what a resource's flatten step produces from a remote
//! entity. The [`StateStore`] trait is the seam to whoever persists it, and
//! [`ChangeSet`] is computed by diffing the last read snapshot against the
//! newly declared configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::ProviderError;
use crate::types::AttributeChange;

/// Attribute name to value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMap(BTreeMap<String, Value>);

impl StateMap {
    /// Create an empty state map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object. `null` yields an empty map.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(ProviderError::InvalidConfiguration(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    /// Set an attribute.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Builder form of [`StateMap::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Get an attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Get a string attribute.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Get an integer attribute.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    /// Get a boolean attribute.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    /// Whether the attribute is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Remove an attribute, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Attribute names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert into a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for StateMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Where the engine reads and writes the state of one resource instance.
pub trait StateStore: Send {
    /// The stored identifier, if the instance exists.
    fn id(&self) -> Option<&str>;

    /// Store the identifier.
    fn set_id(&mut self, id: String);

    /// Forget the identifier and the attributes that came with it.
    fn clear_id(&mut self);

    /// Get one attribute value.
    fn get(&self, attr: &str) -> Option<&Value>;

    /// Set one attribute value.
    fn set(&mut self, attr: &str, value: Value);

    /// A copy of the current attributes.
    fn snapshot(&self) -> StateMap;

    /// Replace the current attributes with a freshly read state. This also
    /// becomes the baseline for [`StateStore::has_change`].
    fn apply(&mut self, state: StateMap);

    /// Whether `attr` differs from the last applied state.
    fn has_change(&self, attr: &str) -> bool;
}

/// A [`StateStore`] held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    id: Option<String>,
    current: StateMap,
    last_read: StateMap,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds an identifier, as after a restart.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Create a store from a previously persisted state. The identifier is
    /// taken from its `id` attribute.
    pub fn from_state(state: StateMap) -> Self {
        let id = state.get_str("id").map(str::to_string);
        Self {
            id,
            current: state.clone(),
            last_read: state,
        }
    }
}

impl StateStore for MemoryStateStore {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
        self.current = StateMap::new();
        self.last_read = StateMap::new();
    }

    fn get(&self, attr: &str) -> Option<&Value> {
        self.current.get(attr)
    }

    fn set(&mut self, attr: &str, value: Value) {
        self.current.set(attr, value);
    }

    fn snapshot(&self) -> StateMap {
        self.current.clone()
    }

    fn apply(&mut self, state: StateMap) {
        self.last_read = state.clone();
        self.current = state;
    }

    fn has_change(&self, attr: &str) -> bool {
        self.current.get(attr) != self.last_read.get(attr)
    }
}

/// The attributes whose declared value differs from the last read value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: BTreeMap<String, AttributeChange>,
}

impl ChangeSet {
    /// Diff `declared` against the `prior` snapshot.
    ///
    /// Only attributes that are set (non-null) in `declared` are considered.
    /// `suppress(attr, old, new)` returning true hides a difference that is
    /// semantically equal, e.g. a key that only differs by trailing whitespace.
    pub fn diff<F>(prior: &StateMap, declared: &Value, suppress: F) -> Self
    where
        F: Fn(&str, &Value, &Value) -> bool,
    {
        let mut changes = BTreeMap::new();
        if let Value::Object(declared) = declared {
            for (attr, after) in declared {
                if after.is_null() {
                    continue;
                }
                let change = match prior.get(attr) {
                    None | Some(Value::Null) => AttributeChange::added(attr.as_str(), after.clone()),
                    Some(before) if before == after => continue,
                    Some(before) if suppress(attr, before, after) => continue,
                    Some(before) => {
                        AttributeChange::modified(attr.as_str(), before.clone(), after.clone())
                    },
                };
                changes.insert(attr.clone(), change);
            }
        }
        Self { changes }
    }

    /// Build a change set from explicit changes.
    pub fn from_changes<I>(changes: I) -> Self
    where
        I: IntoIterator<Item = AttributeChange>,
    {
        Self {
            changes: changes.into_iter().map(|c| (c.path.clone(), c)).collect(),
        }
    }

    /// Whether `attr` changed.
    pub fn contains(&self, attr: &str) -> bool {
        self.changes.contains_key(attr)
    }

    /// The change recorded for `attr`.
    pub fn get(&self, attr: &str) -> Option<&AttributeChange> {
        self.changes.get(attr)
    }

    /// Changed attribute names in order.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// All changes in attribute order.
    pub fn changes(&self) -> impl Iterator<Item = &AttributeChange> {
        self.changes.values()
    }

    /// Number of changed attributes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Render a timestamp as RFC 3339, or an empty string when unset.
pub fn format_timestamp(ts: Option<OffsetDateTime>) -> String {
    ts.and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_default()
}

/// The part of `url` after the first occurrence of `marker`.
///
/// Returns an empty string when the marker is absent.
pub fn split_direct_asset_path(url: &str, marker: &str) -> String {
    url.split_once(marker)
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_default()
}
