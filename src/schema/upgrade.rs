//! Pure deep-merge upgrade of stored records

use serde_json::Value;

/// Read the version discriminator of a stored record
///
/// Records without a usable `version` field are treated as the earliest
/// shape so they pick up every default.
pub fn record_variant(record: &Value) -> String {
    match record.get("version") {
        Some(Value::String(version)) => version.clone(),
        Some(Value::Number(version)) => version.to_string(),
        _ => "1".to_string(),
    }
}

/// Merge a stored record against its template
///
/// Layering, lowest priority first: `template`, then `overrides`, then
/// `stored`; stored values always win over defaults. Object fields merge
/// recursively; arrays and scalars replace wholesale.
///
/// Returns the record plus a changed flag: `(stored, false)` when the merge
/// result equals the stored record, `(merged, true)` otherwise. Pure; the
/// caller persists the result if it wants to.
pub fn upgrade(template: &Value, overrides: Option<&Value>, stored: &Value) -> (Value, bool) {
    let mut merged = template.clone();
    if let Some(overrides) = overrides {
        merge_into(&mut merged, overrides);
    }
    merge_into(&mut merged, stored);

    if merged == *stored {
        (stored.clone(), false)
    } else {
        (merged, true)
    }
}

fn merge_into(base: &mut Value, layer: &Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(key) {
                    Some(slot) if slot.is_object() && value.is_object() => {
                        merge_into(slot, value);
                    }
                    _ => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, layer) => *slot = layer.clone(),
    }
}
