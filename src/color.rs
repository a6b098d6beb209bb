//! RGB color type and conversion utilities.

use serde::{Deserialize, Serialize};

/// RGB color tuple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create from HSV (h: 0-360, s: 0-1, v: 0-1).
    pub fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let h = h.rem_euclid(360.0);
        let s = s.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match (h / 60.0) as i32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Self {
            r: ((r + m) * 255.0) as u8,
            g: ((g + m) * 255.0) as u8,
            b: ((b + m) * 255.0) as u8,
        }
    }

    /// Scale brightness by a factor in [0, 1].
    pub fn scale(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self {
            r: (self.r as f32 * f) as u8,
            g: (self.g as f32 * f) as u8,
            b: (self.b as f32 * f) as u8,
        }
    }

    /// Linearly interpolate between two colors.
    pub fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        Rgb {
            r: (a.r as f32 + (b.r as f32 - a.r as f32) * t) as u8,
            g: (a.g as f32 + (b.g as f32 - a.g as f32) * t) as u8,
            b: (a.b as f32 + (b.b as f32 - a.b as f32) * t) as u8,
        }
    }

    /// Pack into the 24-bit integer format `ectool rgbkbd` expects.
    pub fn packed(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Parse a color string: "#RRGGBB", "red", "green", etc.
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() == 6 {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                return Some(Self::new(r, g, b));
            }
        }
        match s.to_ascii_lowercase().as_str() {
            "red" => Some(Self::new(255, 0, 0)),
            "green" => Some(Self::new(0, 255, 0)),
            "blue" => Some(Self::new(0, 0, 255)),
            "yellow" => Some(Self::new(255, 255, 0)),
            "cyan" => Some(Self::new(0, 255, 255)),
            "magenta" | "pink" => Some(Self::new(255, 0, 255)),
            "white" => Some(Self::new(255, 255, 255)),
            "orange" => Some(Self::new(255, 165, 0)),
            "purple" => Some(Self::new(128, 0, 255)),
            "black" | "off" => Some(Self::BLACK),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hsv_primaries() {
        assert_eq!(Rgb::from_hsv(0.0, 1.0, 1.0), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hsv(120.0, 1.0, 1.0), Rgb::new(0, 255, 0));
        assert_eq!(Rgb::from_hsv(240.0, 1.0, 1.0), Rgb::new(0, 0, 255));
        // No saturation -> white, no value -> black
        assert_eq!(Rgb::from_hsv(0.0, 0.0, 1.0), Rgb::WHITE);
        assert_eq!(Rgb::from_hsv(0.0, 1.0, 0.0), Rgb::BLACK);
    }

    #[test]
    fn test_from_hsv_wraps_hue() {
        assert_eq!(Rgb::from_hsv(360.0, 1.0, 1.0), Rgb::from_hsv(0.0, 1.0, 1.0));
        assert_eq!(
            Rgb::from_hsv(-120.0, 1.0, 1.0),
            Rgb::from_hsv(240.0, 1.0, 1.0)
        );
    }

    #[test]
    fn test_scale() {
        assert_eq!(Rgb::new(200, 100, 50).scale(0.5), Rgb::new(100, 50, 25));
        assert_eq!(Rgb::WHITE.scale(0.0), Rgb::BLACK);
        assert_eq!(Rgb::WHITE.scale(2.0), Rgb::WHITE); // clamped
    }

    #[test]
    fn test_lerp() {
        let mid = Rgb::lerp(Rgb::BLACK, Rgb::new(100, 200, 50), 0.5);
        assert_eq!(mid, Rgb::new(50, 100, 25));
    }

    #[test]
    fn test_packed() {
        assert_eq!(Rgb::new(0x12, 0x34, 0x56).packed(), 0x123456);
        assert_eq!(Rgb::WHITE.packed(), 0xFFFFFF);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Rgb::parse("#FF0000"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(Rgb::parse("red"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(Rgb::parse("off"), Some(Rgb::BLACK));
        assert_eq!(Rgb::parse("unknown"), None);
        assert_eq!(Rgb::parse("#12345"), None);
    }

    #[test]
    fn test_display_roundtrip() {
        let c = Rgb::new(255, 165, 0);
        assert_eq!(Rgb::parse(&c.to_string()), Some(c));
    }
}
