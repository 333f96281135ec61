//! Hex color parsing and brightness scaling for LED colors.

use crate::ParseError;
use rgb::RGB8;

/// Full-brightness white used by identify and flash overrides.
pub const WHITE: RGB8 = RGB8 {
    r: 255,
    g: 255,
    b: 255,
};

/// Parses a `#RRGGBB` (or `RRGGBB`) string into an [`RGB8`].
///
/// # Examples
///
/// ```
/// use etherlight_types::{parse_hex_color, RGB8};
///
/// assert_eq!(parse_hex_color("#FF0000").unwrap(), RGB8::new(255, 0, 0));
/// assert!(parse_hex_color("red").is_err());
/// ```
pub fn parse_hex_color(s: &str) -> Result<RGB8, ParseError> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(ParseError::InvalidColor(s.to_string()));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| ParseError::InvalidColor(s.to_string()))
    };

    Ok(RGB8::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Scales every channel by `factor`, clamped to `[0, 1]`.
///
/// Channels are truncated, not rounded: `255 * 0.2` yields `51`.
pub fn scale_color(color: RGB8, factor: f64) -> RGB8 {
    let f = if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    };
    let scale = |c: u8| (f64::from(c) * f) as u8;
    RGB8::new(scale(color.r), scale(color.g), scale(color.b))
}
