use super::*;

#[test]
fn parse_hex_rgb_accepts_short_and_long_forms() {
    assert_eq!(parse_hex_rgb("#abc"), Some((0xaa, 0xbb, 0xcc)));
    assert_eq!(parse_hex_rgb("#A1B2C3"), Some((0xa1, 0xb2, 0xc3)));
}

#[test]
fn parse_hex_rgb_accepts_bare_hex() {
    assert_eq!(parse_hex_rgb("  22c55e "), Some((0x22, 0xc5, 0x5e)));
}

#[test]
fn parse_hex_rgb_rejects_garbage() {
    assert_eq!(parse_hex_rgb("#12"), None);
    assert_eq!(parse_hex_rgb("#zzzzzz"), None);
    assert_eq!(parse_hex_rgb("#éé"), None);
    assert_eq!(parse_hex_rgb(""), None);
}

#[test]
fn normalize_expands_and_lowercases() {
    assert_eq!(normalize_hex_color("#F0A"), "#ff00aa");
    assert_eq!(normalize_hex_color("EF4444"), "#ef4444");
}

#[test]
fn normalize_falls_back_on_malformed() {
    assert_eq!(normalize_hex_color("red"), "#ff6961");
    assert_eq!(normalize_hex_color("#1234"), "#ff6961");
}

#[test]
fn hex_to_rgba_formats_channels_and_alpha() {
    assert_eq!(hex_to_rgba("#ef4444", 0.32), "rgba(239, 68, 68, 0.32)");
    assert_eq!(hex_to_rgba("#fff", 1.0), "rgba(255, 255, 255, 1)");
}

#[test]
fn hex_to_rgba_uses_fallback_color() {
    assert_eq!(hex_to_rgba("nope", 0.94), "rgba(255, 105, 97, 0.94)");
}
