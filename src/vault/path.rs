//! Name and path normalization for vault requests.

/// Strip exactly one leading `/` from a secret name.
///
/// `/foo/bar` and `foo/bar` address the same item.
pub fn clean_secret_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

/// Normalize a listing path: trailing `/` and `*` are dropped and an
/// empty result means the root folder.
pub fn normalize_list_path(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '*']);
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
