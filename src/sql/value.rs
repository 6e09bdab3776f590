//! Filter document: the JSON value a containment predicate matches against.

use serde::Serialize;
use std::collections::BTreeMap;

/// Typed JSON value. Objects are ordered by key so serialization is canonical.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<FilterValue>),
    Object(BTreeMap<String, FilterValue>),
}

/// A value and an object tried to occupy the same key. Carries the offending key path.
#[derive(Debug, PartialEq, Eq)]
pub struct MergeConflict {
    pub path: Vec<String>,
}

/// Wrap `value` in one object per key, innermost last.
fn nest(keys: &[&str], value: FilterValue) -> FilterValue {
    keys.iter().rev().fold(value, |inner, key| {
        let mut map = BTreeMap::new();
        map.insert((*key).to_string(), inner);
        FilterValue::Object(map)
    })
}

impl Default for FilterValue {
    fn default() -> Self {
        FilterValue::Object(BTreeMap::new())
    }
}

impl FilterValue {
    /// Store `value` under `keys`, creating intermediate objects.
    ///
    /// Leaves overwrite leaves (last writer wins). Descending through a non-object, or replacing
    /// an object with a non-object, is a conflict. Writing an object onto an object merges them.
    pub fn insert_at(&mut self, keys: &[&str], value: FilterValue) -> Result<(), MergeConflict> {
        self.merge(&mut Vec::new(), keys, value)
    }

    fn merge(&mut self, prefix: &mut Vec<String>, keys: &[&str], value: FilterValue) -> Result<(), MergeConflict> {
        let Some((key, rest)) = keys.split_first() else {
            return match (self, value) {
                (FilterValue::Object(existing), FilterValue::Object(incoming)) => {
                    for (k, v) in incoming {
                        match existing.get_mut(&k) {
                            Some(child) => {
                                prefix.push(k);
                                child.merge(prefix, &[], v)?;
                                prefix.pop();
                            }
                            None => {
                                existing.insert(k, v);
                            }
                        }
                    }
                    Ok(())
                }
                (FilterValue::Object(_), _) | (_, FilterValue::Object(_)) => Err(MergeConflict {
                    path: prefix.clone(),
                }),
                (slot, value) => {
                    *slot = value;
                    Ok(())
                }
            };
        };
        let FilterValue::Object(map) = self else {
            return Err(MergeConflict { path: prefix.clone() });
        };
        prefix.push((*key).to_string());
        match map.get_mut(*key) {
            Some(child) => child.merge(prefix, rest, value)?,
            None => {
                map.insert((*key).to_string(), nest(rest, value));
            }
        }
        prefix.pop();
        Ok(())
    }

    /// Canonical JSON text (keys sorted).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
