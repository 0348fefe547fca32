use std::collections::HashMap;

pub const DEEPLINK_PREFIX: &str = "deep_";

/// Folds deep-link parameters into attribution under `deep_{key}`.
///
/// A prefixed key already present in the attribution keeps its value.
pub fn merge_deeplink(
    attribution: &HashMap<String, String>,
    deeplink: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut merged = attribution.clone();
    for (key, value) in deeplink {
        merged
            .entry(format!("{}{}", DEEPLINK_PREFIX, key))
            .or_insert_with(|| value.clone());
    }
    merged
}
