//! RGB color model and the shared fallback palette.
//!
//! Colors travel as CSS functional notation (`rgb(r, g, b)`) between the
//! extraction service and its clients, so [`Color`] serializes to and from
//! that string form.

use std::fmt;
use std::str::FromStr;

use palette::Srgb;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ColorParseError;

// ============================================================================
// Color
// ============================================================================

/// An opaque 8-bit sRGB color.
///
/// Channels are `u8`, so every `Color` is a valid `rgb(...)` value by
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct Color(Srgb<u8>);

impl Color {
    /// Creates a color from its red, green and blue channels.
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self(Srgb::new(red, green, blue))
    }

    pub fn red(&self) -> u8 {
        self.0.red
    }

    pub fn green(&self) -> u8 {
        self.0.green
    }

    pub fn blue(&self) -> u8 {
        self.0.blue
    }

    /// Returns the channels as an `(r, g, b)` tuple.
    pub fn as_tuple(&self) -> (u8, u8, u8) {
        (self.0.red, self.0.green, self.0.blue)
    }

    /// Returns the underlying `palette` color.
    pub fn into_srgb(self) -> Srgb<u8> {
        self.0
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.as_tuple() == other.as_tuple()
    }
}

impl Eq for Color {}

impl std::hash::Hash for Color {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_tuple().hash(state);
    }
}

impl From<Srgb<u8>> for Color {
    fn from(rgb: Srgb<u8>) -> Self {
        Self(rgb)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0.red, self.0.green, self.0.blue)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    /// Parses `rgb(r, g, b)`, allowing arbitrary whitespace around the numbers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| ColorParseError::Syntax(s.to_string()))?;

        let mut channels = [0u8; 3];
        let mut parts = inner.split(',');
        for slot in &mut channels {
            let part = parts
                .next()
                .ok_or_else(|| ColorParseError::Syntax(s.to_string()))?
                .trim();
            *slot = part
                .parse::<u8>()
                .map_err(|_| ColorParseError::Channel(part.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(ColorParseError::Syntax(s.to_string()));
        }

        let [r, g, b] = channels;
        Ok(Self::new(r, g, b))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "jsonschema")]
impl schemars::JsonSchema for Color {
    fn schema_name() -> String {
        "Color".to_string()
    }

    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        <String as schemars::JsonSchema>::json_schema(generator)
    }
}

// ============================================================================
// Fallback Palette
// ============================================================================

/// Display colors used whenever real extraction is unavailable.
///
/// Order is fixed; both the service and the client pick from this list.
pub const FALLBACK_PALETTE: [Color; 10] = [
    Color::new(255, 99, 132),  // pink
    Color::new(54, 162, 235),  // blue
    Color::new(255, 205, 86),  // yellow
    Color::new(75, 192, 192),  // teal
    Color::new(153, 102, 255), // purple
    Color::new(255, 159, 64),  // orange
    Color::new(199, 199, 199), // gray
    Color::new(83, 102, 255),  // indigo
    Color::new(78, 205, 196),  // mint
    Color::new(255, 107, 107), // red
];

/// Picks a palette entry uniformly at random.
pub fn random_fallback<R: Rng>(rng: &mut R) -> Color {
    FALLBACK_PALETTE[rng.random_range(0..FALLBACK_PALETTE.len())]
}

/// Returns true if `color` is one of the fallback palette entries.
pub fn is_fallback(color: &Color) -> bool {
    FALLBACK_PALETTE.contains(color)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn display_uses_css_notation() {
        assert_eq!(Color::new(1, 22, 255).to_string(), "rgb(1, 22, 255)");
    }

    #[test]
    fn parse_accepts_loose_whitespace() {
        let color: Color = " rgb( 10,20 ,  30 ) ".parse().unwrap();
        assert_eq!(color.as_tuple(), (10, 20, 30));
    }

    #[test]
    fn parse_rejects_out_of_range_channel() {
        let err = "rgb(256, 0, 0)".parse::<Color>().unwrap_err();
        assert!(matches!(err, ColorParseError::Channel(ref c) if c == "256"));
    }

    #[test]
    fn parse_rejects_partial_values() {
        assert!("rgb(1, 2)".parse::<Color>().is_err());
        assert!("rgb(1, 2, 3, 4)".parse::<Color>().is_err());
        assert!("#ff0000".parse::<Color>().is_err());
        assert!("rgb(1, 2, 3".parse::<Color>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&Color::new(54, 162, 235)).unwrap();
        assert_eq!(json, "\"rgb(54, 162, 235)\"");

        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::new(54, 162, 235));
    }

    #[test]
    fn palette_has_ten_distinct_entries() {
        let mut seen = std::collections::HashSet::new();
        for color in FALLBACK_PALETTE {
            assert!(seen.insert(color));
        }
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn random_fallback_stays_in_palette() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(is_fallback(&random_fallback(&mut rng)));
        }
    }

    #[test]
    fn random_fallback_reaches_every_entry() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = [0usize; 10];
        for _ in 0..2_000 {
            let pick = random_fallback(&mut rng);
            let idx = FALLBACK_PALETTE.iter().position(|c| *c == pick).unwrap();
            hits[idx] += 1;
        }
        assert!(hits.iter().all(|&n| n > 0));
    }
}
