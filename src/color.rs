//! Color normalization helpers for marks and annotations.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

use crate::consts::FALLBACK_COLOR;

/// Parse `#RGB`, `#RRGGBB` or the same without the leading `#` into RGB
/// channels.
#[must_use]
pub fn parse_hex_rgb(raw: &str) -> Option<(u8, u8, u8)> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => Some((
            channel(&hex[0..1].repeat(2))?,
            channel(&hex[1..2].repeat(2))?,
            channel(&hex[2..3].repeat(2))?,
        )),
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        _ => None,
    }
}

fn channel(pair: &str) -> Option<u8> {
    u8::from_str_radix(pair, 16).ok()
}

/// Normalize a color to canonical lowercase `#rrggbb`, falling back to
/// `#ff6961` for anything malformed.
#[must_use]
pub fn normalize_hex_color(value: &str) -> String {
    match parse_hex_rgb(value) {
        Some((r, g, b)) => format!("#{r:02x}{g:02x}{b:02x}"),
        None => FALLBACK_COLOR.to_owned(),
    }
}

/// Render `hex` with the given alpha as `rgba(r, g, b, a)`.
#[must_use]
pub fn hex_to_rgba(hex: &str, alpha: f64) -> String {
    let (r, g, b) = parse_hex_rgb(hex).or_else(|| parse_hex_rgb(FALLBACK_COLOR)).unwrap_or((255, 105, 97));
    format!("rgba({r}, {g}, {b}, {alpha})")
}
