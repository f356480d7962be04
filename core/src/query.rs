//! Query string composition.
//!
//! Parameters are any `Serialize` struct. Fields are emitted in declaration
//! order, `#[serde(rename = "...")]` picks the key, and `None` fields are
//! skipped. Nested structs and sequences are not representable and fail with
//! `EncodingError::Query`.

use serde::Serialize;

use crate::error::EncodingError;

/// Append the encoded `params` to `path`.
///
/// Returns `path` unchanged when `params` is `None` or encodes to nothing.
/// Uses `&` when `path` already carries a query and keeps any `#fragment`
/// at the end.
pub fn merge_query<P>(path: &str, params: Option<&P>) -> Result<String, EncodingError>
where
    P: Serialize + ?Sized,
{
    let Some(params) = params else {
        return Ok(path.to_string());
    };
    let encoded = serde_urlencoded::to_string(params).map_err(EncodingError::Query)?;
    if encoded.is_empty() {
        return Ok(path.to_string());
    }

    let (base, fragment) = match path.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (path, None),
    };

    let mut merged = String::with_capacity(path.len() + encoded.len() + 1);
    merged.push_str(base);
    if !base.contains('?') {
        merged.push('?');
    } else if !base.ends_with('?') && !base.ends_with('&') {
        merged.push('&');
    }
    merged.push_str(&encoded);
    if let Some(fragment) = fragment {
        merged.push('#');
        merged.push_str(fragment);
    }
    Ok(merged)
}
