//! Disk identifiers derived from document names.

/// Disk id for a document called `name`.
///
/// A trailing `.json` is dropped and every character other than
/// alphanumerics, `_` and `-` becomes `_`.
pub fn disk_id_from_name(name: &str) -> String {
    let stem = name.strip_suffix(".json").unwrap_or(name);
    let id: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if id.is_empty() {
        "UnknownDisk".to_string()
    } else {
        id
    }
}
