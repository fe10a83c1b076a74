//! Lookup to backend path resolution
//!
//! A lookup has the shape `[segment/...]segment.field`. The configured prefix
//! is joined in front of it, one leading slash is trimmed, and the result is
//! split once on the first `.`. The KV v2 engine serves versioned data under
//! `<mount>/data/<path>`, so [`DATA_SEGMENT`] is inserted after the first
//! path segment.

use crate::SecretError;

/// Segment the KV v2 engine expects between the mount and the secret path
pub const DATA_SEGMENT: &str = "data";

/// Backend path and field derived from a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Path passed to the backend read, e.g. `db/data/creds`
    pub backend_path: String,
    /// Field to extract from the secret data, e.g. `password`
    pub field: String,
}

/// Resolve `lookup` against `prefix` into a backend path and field.
///
/// # Errors
///
/// Returns [`SecretError::MalformedLookup`] carrying the prefix-joined string
/// when it does not contain a `.` separating a non-empty path from a
/// non-empty field.
pub fn resolve(lookup: &str, prefix: &str) -> Result<ResolvedPath, SecretError> {
    let joined = prefix
        .split('/')
        .chain(std::iter::once(lookup))
        .collect::<Vec<_>>()
        .join("/");
    let full = joined.strip_prefix('/').unwrap_or(&joined);

    let Some((path, field)) = full.split_once('.') else {
        return Err(SecretError::MalformedLookup {
            lookup: full.to_string(),
        });
    };
    if path.is_empty() || field.is_empty() {
        return Err(SecretError::MalformedLookup {
            lookup: full.to_string(),
        });
    }

    let mut segments = path.split('/');
    let mut parts = Vec::new();
    if let Some(first) = segments.next() {
        parts.push(first);
    }
    parts.push(DATA_SEGMENT);
    parts.extend(segments);

    Ok(ResolvedPath {
        backend_path: parts.join("/"),
        field: field.to_string(),
    })
}
