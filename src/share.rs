//! Share-state codec: a compact, URL-safe token carrying marks and
//! annotations.
//!
//! Token layout: `s:1:` followed by the unpadded URL-safe base64 of the
//! percent-escaped JSON document `{"marks": [...], "annotations": [...]}`.
//! Decoding is forgiving: padding and the standard base64 alphabet are
//! accepted, and individual malformed entries are dropped instead of
//! rejecting the whole token.

#[cfg(test)]
#[path = "share_test.rs"]
mod share_test;

use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::annotation::Annotation;
use crate::color::parse_hex_rgb;
use crate::consts::{SHARE_QUERY_PARAM, SHARE_TOKEN_PREFIX};
use crate::marks::Mark;

/// Characters escaped the way a browser's `encodeURIComponent` escapes them.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// URL-safe alphabet that tolerates trailing `=` padding.
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("token does not start with {SHARE_TOKEN_PREFIX:?}")]
    Prefix,
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is missing the {0} array")]
    Shape(&'static str),
}

/// Everything a share link restores. Camera and tool modes are excluded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareState {
    pub marks: Vec<Mark>,
    pub annotations: Vec<Annotation>,
}

// =============================================================================
// ENCODE
// =============================================================================

/// Encode `state` into a share token.
///
/// # Errors
///
/// Returns [`ShareError::Json`] if the state cannot be serialized.
pub fn encode(state: &ShareState) -> Result<String, ShareError> {
    let json = serde_json::to_string(state)?;
    let escaped = utf8_percent_encode(&json, URI_COMPONENT).to_string();
    let encoded = URL_SAFE_NO_PAD.encode(escaped.as_bytes());
    Ok(format!("{SHARE_TOKEN_PREFIX}{encoded}"))
}

// =============================================================================
// DECODE
// =============================================================================

/// Decode a share token, reporting which stage failed.
///
/// # Errors
///
/// Any stage failure: prefix, base64, UTF-8, percent-decoding, JSON, or a
/// document without `marks` and `annotations` arrays.
pub fn try_decode(token: &str) -> Result<ShareState, ShareError> {
    let body = token.trim().strip_prefix(SHARE_TOKEN_PREFIX).ok_or(ShareError::Prefix)?;
    let normalized: String = body
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = LENIENT_URL_SAFE.decode(normalized.as_bytes())?;
    let escaped = std::str::from_utf8(&bytes)?;
    let json = percent_decode_str(escaped).decode_utf8()?;
    let mut document: Value = serde_json::from_str(&json)?;

    let marks = take_array(&mut document, "marks")?;
    let annotations = take_array(&mut document, "annotations")?;
    Ok(ShareState { marks: marks_from_values(marks), annotations: annotations_from_values(annotations) })
}

/// Decode a share token. Any failure yields `None` and is logged at debug.
#[must_use]
pub fn decode(token: &str) -> Option<ShareState> {
    match try_decode(token) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::debug!(error = %e, "share token rejected");
            None
        }
    }
}

fn take_array(document: &mut Value, field: &'static str) -> Result<Vec<Value>, ShareError> {
    match document.get_mut(field).map(Value::take) {
        Some(Value::Array(values)) => Ok(values),
        _ => Err(ShareError::Shape(field)),
    }
}

/// Marks from loosely typed JSON values. Entries without integer `x`/`y` or
/// a parseable color are dropped.
#[must_use]
pub fn marks_from_values(values: Vec<Value>) -> Vec<Mark> {
    let mut marks = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<Mark>(value) {
            Ok(mark) if parse_hex_rgb(&mark.color).is_some() => marks.push(mark),
            Ok(mark) => tracing::debug!(x = mark.x, y = mark.y, color = %mark.color, "dropping mark with bad color"),
            Err(e) => tracing::debug!(error = %e, "dropping malformed mark"),
        }
    }
    marks
}

fn annotations_from_values(values: Vec<Value>) -> Vec<Annotation> {
    let mut annotations = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<Annotation>(value) {
            Ok(annotation) => annotations.push(annotation),
            Err(e) => tracing::debug!(error = %e, "dropping malformed annotation"),
        }
    }
    annotations
}

// =============================================================================
// URLS
// =============================================================================

/// The raw `map` parameter of a query string (with or without the leading
/// `?`), percent-decoded.
#[must_use]
pub fn token_from_query(query: &str) -> Option<String> {
    let query = query.trim_start_matches('?');
    for pair in query.split('&') {
        let mut it = pair.splitn(2, '=');
        let Some(name) = it.next() else {
            continue;
        };
        if name != SHARE_QUERY_PARAM {
            continue;
        }
        let raw = it.next().unwrap_or("");
        let value = percent_decode_str(raw).decode_utf8_lossy().into_owned();
        return if value.is_empty() { None } else { Some(value) };
    }
    None
}

/// `base` with its `map` parameter set to `token`, replacing any existing one.
/// Other parameters and any fragment are preserved.
#[must_use]
pub fn share_url(base: &str, token: &str) -> String {
    let (without_fragment, fragment) = match base.split_once('#') {
        Some((head, tail)) => (head, Some(tail)),
        None => (base, None),
    };
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => (without_fragment, ""),
    };

    let mut params: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(SHARE_QUERY_PARAM))
        .map(str::to_owned)
        .collect();
    params.push(format!("{SHARE_QUERY_PARAM}={}", utf8_percent_encode(token, URI_COMPONENT)));

    let mut url = format!("{path}?{}", params.join("&"));
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}
