use std::sync::LazyLock;

use regex::Regex;

mod service;

pub use service::{
    luminance_values, ColorService, LuminanceValues, PRIMARY_BASE_VAR, PRIMARY_DARK_VAR,
    PRIMARY_LIGHT_VAR, TEXT_ON_PRIMARY_VAR,
};

pub const BLACK: &str = "#000000";
pub const WHITE: &str = "#ffffff";

/// WCAG AA minimum contrast for normal text.
const AA_THRESHOLD: f64 = 4.5;
/// How much better black must be to override a compliant white.
const PREFER_BLACK_WHEN_COMPLIANT: f64 = 3.0;
/// How much better black must be when neither candidate is compliant.
const PREFER_BLACK_WHEN_NEITHER: f64 = 1.5;

const NAMED_COLORS: [&str; 6] = ["red", "green", "blue", "white", "black", "transparent"];

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#([A-Fa-f0-9]{3}|[A-Fa-f0-9]{6})$").expect("valid hex regex"));
static RGB_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgba?\(\s*[0-9]+\s*,\s*[0-9]+\s*,\s*[0-9]+\s*(,\s*[0-1]?\.?[0-9]*)?\s*\)$")
        .expect("valid rgb regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        rgb_to_hex(self.r, self.g, self.b)
    }

    pub fn luminance(self) -> f64 {
        relative_luminance(self.r, self.g, self.b)
    }

    fn lighten(self, factor: f64) -> Self {
        let blend = |c: u8| {
            let c = f64::from(c);
            (c + (255.0 - c) * factor).round() as u8
        };
        Self::new(blend(self.r), blend(self.g), blend(self.b))
    }

    fn darken(self, factor: f64) -> Self {
        let blend = |c: u8| (f64::from(c) * factor).round() as u8;
        Self::new(blend(self.r), blend(self.g), blend(self.b))
    }
}

/// Primary color plus the two tints derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorVariations {
    pub primary: String,
    pub light: String,
    pub dark: String,
}

/// Parses `#rrggbb` (the `#` is optional). Anything else resolves to black so
/// that derivations downstream always produce a value.
pub fn hex_to_rgb(hex: &str) -> Rgb {
    parse_hex_rgb(hex).unwrap_or_else(|| {
        tracing::debug!(value = hex, "not a six digit hex color; using #000000");
        Rgb::default()
    })
}

fn parse_hex_rgb(value: &str) -> Option<Rgb> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let red = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let green = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let blue = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Rgb::new(red, green, blue))
}

pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Relative luminance per WCAG 2.x, in `[0, 1]`.
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    fn channel(c: u8) -> f64 {
        let c = f64::from(c) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    0.2126 * channel(r) + 0.7152 * channel(g) + 0.0722 * channel(b)
}

pub fn contrast_ratio(luminance_a: f64, luminance_b: f64) -> f64 {
    let lighter = luminance_a.max(luminance_b);
    let darker = luminance_a.min(luminance_b);
    (lighter + 0.05) / (darker + 0.05)
}

/// Derives the light and dark variants of `primary`.
///
/// Blend strength is banded on the primary's luminance: bright primaries get a
/// gentler push toward white and a stronger push toward black so both
/// variants stay distinguishable from the base.
pub fn derive_variations(primary: &str) -> ColorVariations {
    let rgb = hex_to_rgb(primary);
    let luminance = rgb.luminance();

    let light_factor = if luminance > 0.5 {
        0.65
    } else if luminance > 0.4 {
        0.75
    } else {
        0.85
    };
    let dark_factor = if luminance > 0.5 {
        0.6
    } else if luminance > 0.4 {
        0.7
    } else {
        0.9
    };

    ColorVariations {
        primary: primary.to_string(),
        light: rgb.lighten(light_factor).to_hex(),
        dark: rgb.darken(dark_factor).to_hex(),
    }
}

/// Picks black or white text for `background`, biased toward white.
///
/// White wins whenever it meets AA unless black is more than three times
/// better; black wins if only black meets AA; with neither compliant, black
/// needs a 1.5x edge.
pub fn pick_accessible_text_color(background: &str) -> &'static str {
    let background = hex_to_rgb(background).luminance();
    let black_contrast = contrast_ratio(background, 0.0);
    let white_contrast = contrast_ratio(background, 1.0);

    let black_preferred = if white_contrast >= AA_THRESHOLD {
        black_contrast > white_contrast * PREFER_BLACK_WHEN_COMPLIANT
    } else if black_contrast >= AA_THRESHOLD {
        true
    } else {
        black_contrast > white_contrast * PREFER_BLACK_WHEN_NEITHER
    };

    if black_preferred {
        BLACK
    } else {
        WHITE
    }
}

/// Accepts `#rgb`, `#rrggbb`, a handful of named colors, or `rgb()`/`rgba()`.
pub fn is_valid_color(color: &str) -> bool {
    if color.is_empty() {
        return false;
    }
    if HEX_COLOR.is_match(color) {
        return true;
    }
    if NAMED_COLORS
        .iter()
        .any(|named| named.eq_ignore_ascii_case(color))
    {
        return true;
    }
    RGB_COLOR.is_match(color)
}
