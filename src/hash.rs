//! Content-derived identifiers and name derivation.
//!
//! Entity ids are deterministic md5 hex digests of the normalized input so
//! that repeated creation calls resolve to the same stored record.

/// Returns the md5 hex digest of `value`.
pub fn content_hash(value: &str) -> String {
    format!("{:x}", md5::compute(value))
}

/// Stable id for a route with the given (pre-pagination) path.
pub fn route_id(path: &str) -> String {
    content_hash(&format!("route-{path}"))
}

/// Stable id for a page with the given normalized path.
pub fn page_id(path: &str) -> String {
    content_hash(&format!("page-{path}"))
}

/// Converts a value to snake case, splitting on non-alphanumeric characters
/// and lower/upper case boundaries.
///
/// Used to auto-derive symbolic names for dynamic routes, e.g.
/// `/user/:id` becomes `user_id`.
pub fn snake_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_lower = false;

    for ch in value.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && prev_lower && !out.is_empty() {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = ch.is_lowercase() || ch.is_numeric();
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }

    out.trim_end_matches('_').to_string()
}
