//! Beacon URL construction

use serde_json::{Map, Value};

use crate::encode::encode;
use crate::error::Result;

/// Emitted field values, in insertion order
pub type Fields = Map<String, Value>;

/// Join a base URL and a path with exactly one slash between them
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{}/{}", base, path)
}

/// Append `&name=value` for every field not in `exclude`.
///
/// The first separator is the caller's job; this only ever adds `&`.
pub fn append_params(url: &str, fields: &Fields, exclude: &[&str]) -> Result<String> {
    let mut out = url.to_string();
    for (name, value) in fields {
        if exclude.contains(&name.as_str()) {
            continue;
        }
        out.push('&');
        out.push_str(name);
        out.push('=');
        out.push_str(&encode(name, value)?);
    }
    Ok(out)
}
