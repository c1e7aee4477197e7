use thiserror::Error;

use crate::types::Rgba;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("Color must start with '#': {0}")]
    MissingHash(String),
    #[error("Color must have 6 or 8 hex digits, got {0}")]
    InvalidLength(usize),
    #[error("Invalid hex digit in color: {0}")]
    InvalidDigit(String),
}

/// Parse `#rrggbb` or `#rrggbbaa` into a straight-alpha color
pub fn parse_hex_color(text: &str) -> Result<Rgba, ColorError> {
    let digits = text
        .strip_prefix('#')
        .ok_or_else(|| ColorError::MissingHash(text.to_string()))?;
    if digits.len() != 6 && digits.len() != 8 {
        return Err(ColorError::InvalidLength(digits.len()));
    }

    let channel = |i: usize| -> Result<f32, ColorError> {
        let pair = digits
            .get(i * 2..i * 2 + 2)
            .ok_or_else(|| ColorError::InvalidDigit(text.to_string()))?;
        u8::from_str_radix(pair, 16)
            .map(|v| v as f32 / 255.0)
            .map_err(|_| ColorError::InvalidDigit(text.to_string()))
    };

    let alpha = if digits.len() == 8 { channel(3)? } else { 1.0 };
    Ok([channel(0)?, channel(1)?, channel(2)?, alpha])
}

/// Quantize a float channel to 8 bits
#[inline]
pub fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Expand an 8-bit RGBA texel to floats
#[inline]
pub fn from_rgba8(texel: [u8; 4]) -> Rgba {
    [
        texel[0] as f32 / 255.0,
        texel[1] as f32 / 255.0,
        texel[2] as f32 / 255.0,
        texel[3] as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb() {
        let c = parse_hex_color("#ff0055").unwrap();
        assert_eq!(c[0], 1.0);
        assert_eq!(c[1], 0.0);
        assert!((c[2] - 85.0 / 255.0).abs() < 1e-6);
        assert_eq!(c[3], 1.0);
    }

    #[test]
    fn test_parse_rgba() {
        let c = parse_hex_color("#66666680").unwrap();
        assert!((c[3] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_hex_color("ff0055"), Err(ColorError::MissingHash(_))));
        assert_eq!(parse_hex_color("#fff"), Err(ColorError::InvalidLength(3)));
        assert!(matches!(parse_hex_color("#gg0000"), Err(ColorError::InvalidDigit(_))));
    }

    #[test]
    fn test_u8_roundtrip() {
        assert_eq!(to_u8(from_rgba8([0x66, 0, 255, 1])[0]), 0x66);
        assert_eq!(to_u8(1.5), 255);
        assert_eq!(to_u8(-0.2), 0);
    }
}
