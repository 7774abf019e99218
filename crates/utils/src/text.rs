//! Small text helpers for free-text tags and user-entered codes.

/// Case-insensitive substring test. `needle` is expected to be lowercase already.
pub fn contains_lowercase(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Trim and lowercase a free-text tag, dropping it when nothing is left.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Split a free-text preference blob (comma, semicolon or newline separated) into tags.
pub fn split_tags(blob: &str) -> Vec<String> {
    blob.split([',', ';', '\n'])
        .filter_map(|t| {
            let t = t.trim();
            (!t.is_empty()).then(|| t.to_string())
        })
        .collect()
}

/// Normalize a user-typed share code: strip whitespace and uppercase.
pub fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}
