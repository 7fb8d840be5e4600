//! Colour specifications and their per-particle resolution.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Resolved display colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (leading `#` optional).
    #[must_use]
    pub fn parse_hex(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            3 => {
                let mut channels = [0u8; 3];
                for (slot, digit) in channels.iter_mut().zip(hex.chars()) {
                    let value = digit.to_digit(16)? as u8;
                    *slot = value * 17;
                }
                Some(Self::new(channels[0], channels[1], channels[2]))
            }
            6 => {
                let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
                Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
            }
            _ => None,
        }
    }

    pub fn random(rng: &mut dyn RngCore) -> Self {
        Self::new(rng.random(), rng.random(), rng.random())
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Configured colour: one value or a palette, where `"random"` means any colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    One(String),
    Palette(Vec<String>),
}

impl Default for ColorSpec {
    fn default() -> Self {
        Self::One("#ffffff".to_string())
    }
}

impl ColorSpec {
    /// Pick the colour for one particle. Unparsable entries resolve to white.
    pub fn resolve(&self, rng: &mut dyn RngCore) -> Rgb {
        match self {
            Self::One(value) => resolve_value(value, rng),
            Self::Palette(values) if values.is_empty() => Rgb::WHITE,
            Self::Palette(values) => {
                let pick = rng.random_range(0..values.len());
                resolve_value(&values[pick], rng)
            }
        }
    }
}

fn resolve_value(value: &str, rng: &mut dyn RngCore) -> Rgb {
    if value.trim().eq_ignore_ascii_case("random") {
        Rgb::random(rng)
    } else {
        Rgb::parse_hex(value).unwrap_or(Rgb::WHITE)
    }
}
