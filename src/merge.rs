//! Record merging for update runs.

use crate::transform::remove_null_fields;
use crate::value::{Record, Value};

/// Merges an incoming record (`source`) into the current state of a stored
/// entity (`destination`).
///
/// Without `overwrite` the destination wins every conflicting field; with it
/// the source wins. Sequences present on both sides are combined, winner's
/// items first, duplicates dropped. The result never carries an `id`: the
/// store owns identity.
pub fn merge_normalized_objects(source: Record, destination: Record, overwrite: bool) -> Record {
    let mut source = source;
    let mut destination = destination;
    remove_null_fields(&mut source);
    remove_null_fields(&mut destination);

    let (winner, loser) = if overwrite {
        (source, destination)
    } else {
        (destination, source)
    };

    // Combine sequences held by both sides before overlaying
    let mut combined = Record::new();
    for (key, value) in &winner {
        if let (Value::Seq(first), Some(Value::Seq(second))) = (value, loser.get(key)) {
            combined.insert(key.clone(), Value::Seq(unique(first.iter().chain(second))));
        }
    }

    let mut result = loser;
    for (key, value) in winner {
        result.insert(key, value);
    }
    for (key, value) in combined {
        result.insert(key, value);
    }

    result.shift_remove("id");
    result
}

/// Keeps the first occurrence of every value, preserving order. Values that
/// compare loosely equal (`1` and `"1"`) count as duplicates.
fn unique<'a>(items: impl Iterator<Item = &'a Value>) -> Vec<Value> {
    let mut seen: Vec<Value> = Vec::new();
    for item in items {
        if !seen.iter().any(|kept| kept.loosely_equals(item)) {
            seen.push(item.clone());
        }
    }
    seen
}
