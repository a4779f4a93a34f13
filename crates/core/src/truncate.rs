//! Keeps tool results within the model's context budget.
//!
//! Every path here yields a well-formed JSON document. Oversized results
//! are cut at the structural level and re-serialized, never sliced as
//! bytes.

use serde_json::{Map, Value, json};

/// The default size budget of a single tool result, in bytes.
pub const DEFAULT_MAX_LENGTH: usize = 8000;

/// The number of list items kept when previewing a long list.
pub const PREVIEW_ITEMS: usize = 5;

/// The smallest budget honored. The notice that replaces a result has a
/// fixed overhead of about 100 bytes, so lower budgets are raised to this.
pub const MIN_MAX_LENGTH: usize = 256;

const TRUNCATED_KEY: &str = "_truncated";

// (string limit, array limit) pairs, from mild to aggressive.
const SHRINK_STEPS: &[(usize, usize)] = &[
    (2000, 100),
    (1000, 50),
    (500, 20),
    (200, 10),
    (100, PREVIEW_ITEMS),
    (50, PREVIEW_ITEMS),
    (20, 3),
    (10, 1),
];

/// Serializes `result`, bounding the output to `max_length` bytes, or to
/// [`MIN_MAX_LENGTH`] if that is larger.
///
/// Results that fit are returned unchanged. Otherwise, a long `data` list
/// (either at the top level or nested as `data.data`, the shape of JSON:API
/// collections) is cut to its first few items with a `_truncated` note.
/// Whatever is still too large gets its strings and arrays shortened, and
/// as a last resort the result is replaced by a notice with a textual
/// preview.
pub fn truncate_result(result: &Value, max_length: usize) -> String {
    let max_length = max_length.max(MIN_MAX_LENGTH);
    let encoded = encode(result);
    if encoded.len() <= max_length {
        return encoded;
    }

    let candidate = preview_data(result).unwrap_or_else(|| result.clone());
    let encoded_candidate = encode(&candidate);
    if encoded_candidate.len() <= max_length {
        return encoded_candidate;
    }

    if let Some(shrunk) = shrink_to_fit(&candidate, max_length) {
        return shrunk;
    }

    debug!(
        "tool result of {} bytes replaced by a notice",
        encoded.len()
    );
    notice(&encoded, max_length)
}

fn encode(value: &Value) -> String {
    // Serializing a `Value` can't fail.
    serde_json::to_string(value).unwrap_or_default()
}

fn preview_data(result: &Value) -> Option<Value> {
    let mut preview = result.clone();
    let root = preview.as_object_mut()?;
    let data = root.get_mut("data")?;
    let list = match data {
        Value::Array(list) => list,
        Value::Object(inner) => inner.get_mut("data")?.as_array_mut()?,
        _ => return None,
    };
    if list.len() <= PREVIEW_ITEMS {
        return None;
    }

    let total = list.len();
    list.truncate(PREVIEW_ITEMS);
    root.insert(
        TRUNCATED_KEY.to_owned(),
        json!(format!(
            "Showing {PREVIEW_ITEMS} of {total} items. Use pagination or filters to see more."
        )),
    );
    Some(preview)
}

fn shrink_to_fit(value: &Value, max_length: usize) -> Option<String> {
    let note = "Long values were shortened to fit the size limit.";
    for &(string_limit, array_limit) in SHRINK_STEPS {
        let shrunk = match shrink(value, string_limit, array_limit) {
            Value::Object(mut root) => {
                root.entry(TRUNCATED_KEY).or_insert_with(|| json!(note));
                Value::Object(root)
            }
            other => json!({ TRUNCATED_KEY: note, "preview": other }),
        };
        let encoded = encode(&shrunk);
        if encoded.len() <= max_length {
            return Some(encoded);
        }
    }
    None
}

fn shrink(value: &Value, string_limit: usize, array_limit: usize) -> Value {
    match value {
        Value::String(text) if text.chars().count() > string_limit => {
            let mut cut: String = text.chars().take(string_limit).collect();
            cut.push_str("...");
            Value::String(cut)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .take(array_limit)
                .map(|item| shrink(item, string_limit, array_limit))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, field)| {
                    (key.clone(), shrink(field, string_limit, array_limit))
                })
                .collect::<Map<_, _>>(),
        ),
        _ => value.clone(),
    }
}

fn notice(encoded: &str, max_length: usize) -> String {
    let mut budget = max_length;
    loop {
        let preview: String = encoded.chars().take(budget).collect();
        let notice = encode(&json!({
            TRUNCATED_KEY: format!(
                "Result too large ({} bytes), showing the beginning only.",
                encoded.len()
            ),
            "preview": preview,
        }));
        if notice.len() <= max_length || budget == 0 {
            return notice;
        }
        budget /= 2;
    }
}
