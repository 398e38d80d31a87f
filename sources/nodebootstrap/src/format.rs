//! Flat string forms of labels and taints, as kubelet flags and bootstrap environments take them.

use crate::model::Taint;
use std::collections::BTreeMap;

/// Joins `key=value` pairs with the given separator.
pub fn join_key_values<I, K, V>(pairs: I, separator: &str) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", key.as_ref(), value.as_ref()))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Formats labels as `key=value,key=value`, ordered by key.
pub fn format_labels(labels: &BTreeMap<String, String>) -> String {
    join_key_values(labels, ",")
}

/// Formats taints as `key=value:effect,key=value:effect`, in the order given.
pub fn format_taints(taints: &[Taint]) -> String {
    taints
        .iter()
        .map(|t| format!("{}={}:{}", t.key, t.value, t.effect))
        .collect::<Vec<_>>()
        .join(",")
}

/// Keys taints by taint key with `value:effect` values, as the settings daemon stores them.
///
/// Taints sharing a key collapse to the last one given.
pub fn taints_by_key(taints: &[Taint]) -> BTreeMap<String, String> {
    let mut by_key = BTreeMap::new();
    for taint in taints {
        let value = format!("{}:{}", taint.value, taint.effect);
        if let Some(previous) = by_key.insert(taint.key.clone(), value) {
            warn!(
                "Taint key '{}' given more than once; '{}' replaced by '{}:{}'",
                taint.key, previous, taint.value, taint.effect
            );
        }
    }
    by_key
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
