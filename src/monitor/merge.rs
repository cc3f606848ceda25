//! Field-level merge rules.
//!
//! Every field of a record is declared with one of three kinds, and merges accordingly:
//! - scalars: the incoming value overwrites the existing one, `null` included. A scalar the
//!   snapshot leaves out keeps its value ([`keep_unreported`]), metadata keeps the first value
//!   seen ([`keep_first`])
//! - histories: incoming samples are appended ([`HistoryBuffer`])
//! - keyed collections: merged element-wise by key ([`BTreeMap`])
//!
//! Passthrough attributes are untyped JSON and follow [`merge_attributes`].

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use pmon_shared::Reported;
use serde_json::{Map, Value};

use super::history::HistoryBuffer;
use crate::prelude::*;

/// Untyped fields reported by the monitor
pub type Attributes = Map<String, Value>;

pub trait Merge: Sized {
    /// Merge `incoming`, a more recent state of the same entity, into `self`
    fn merge(&mut self, incoming: Self) -> Result<()>;
}

impl<T: PartialEq> Merge for HistoryBuffer<T> {
    fn merge(&mut self, incoming: Self) -> Result<()> {
        for sample in incoming {
            self.append(sample);
        }
        Ok(())
    }
}

impl<V: Merge> Merge for BTreeMap<String, V> {
    fn merge(&mut self, incoming: Self) -> Result<()> {
        for (key, value) in incoming {
            match self.entry(key) {
                Entry::Occupied(mut entry) => entry.get_mut().merge(value)?,
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
        Ok(())
    }
}

/// Scalar rule for a field the snapshot leaves out: it resolves to the current value, so
/// that only a field reported as `null` clears it
pub fn keep_unreported<T>(incoming: &mut Reported<T>, current: Option<T>) {
    if incoming.is_none() {
        *incoming = Some(current);
    }
}

/// Scalar rule for metadata captured the first time it is reported
pub fn keep_first<T>(existing: &mut Option<T>, incoming: Option<T>) {
    if existing.is_none() {
        *existing = incoming;
    }
}

/// Merge untyped attributes.
///
/// The incoming value wins when the key is missing on the existing side or when either side
/// is `null`. Objects merge recursively, any other pair of values of the same shape is
/// overwritten. Combining an object or an array with a value of another shape is an error.
pub fn merge_attributes(existing: &mut Attributes, incoming: Attributes) -> Result<()> {
    for (key, value) in incoming {
        match existing.get_mut(&key) {
            Some(current) => merge_value(&key, current, value)?,
            None => {
                existing.insert(key, value);
            }
        }
    }
    Ok(())
}

fn merge_value(key: &str, existing: &mut Value, incoming: Value) -> Result<()> {
    if existing.is_null() || incoming.is_null() {
        *existing = incoming;
        return Ok(());
    }
    if existing.is_array() != incoming.is_array() {
        bail!("Trying to combine an array with a non-array ({key})");
    }
    if existing.is_object() != incoming.is_object() {
        bail!("Trying to combine an object with a non-object ({key})");
    }

    match (existing, incoming) {
        (Value::Object(current), Value::Object(fields)) => merge_attributes(current, fields)
            .with_context(|| format!("Failed to merge attribute {key}")),
        (slot, value) => {
            *slot = value;
            Ok(())
        }
    }
}
