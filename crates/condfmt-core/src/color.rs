//! Color references and resolution.
//!
//! A color reference in the source carries exactly one of: an explicit RGB
//! value, a theme slot, or a legacy palette index, plus an optional tint.
//! Resolution turns the reference into a final display color using the
//! injected theme palette and the fixed legacy table.

use std::fmt;

use crate::attrs::AttributeMap;
use crate::error::Result;
use crate::host::ThemePalette;
use crate::record;

/// Final resolved display color, `0x00RRGGBB`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    /// The zero/unset color
    pub const ZERO: Rgb = Rgb(0);

    /// Create a color from components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb(((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// Red component
    pub const fn r(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// Green component
    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Blue component
    pub const fn b(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Apply a tint in `[-1.0, 1.0]` by lightening (positive) or darkening
    /// (negative) the luminance while keeping hue and saturation.
    pub fn apply_tint(self, tint: f64) -> Rgb {
        let (h, s, l) = rgb_to_hsl(self);
        let l = if tint < 0.0 {
            l * (1.0 + tint)
        } else {
            l * (1.0 - tint) + tint
        };
        hsl_to_rgb(h, s, l.clamp(0.0, 1.0))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// The mutually exclusive base of a color reference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorBase {
    /// No reference present; resolves to the zero color
    #[default]
    Auto,
    /// Explicit RGB value
    Rgb(Rgb),
    /// Theme slot, in the source format's numbering (remapped on resolve)
    Theme(u32),
    /// Legacy palette index
    Indexed(u32),
}

/// One color reference as it appears in the source
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorRef {
    /// The reference base
    pub base: ColorBase,
    /// Tint; 0.0 means "use the base color's plain RGB"
    pub tint: f64,
}

impl ColorRef {
    /// Parse a color reference from an attribute group.
    ///
    /// When more than one base attribute is present, explicit RGB wins over
    /// the theme slot, which wins over the legacy index.
    pub fn from_attrs(attrs: &AttributeMap) -> Self {
        let tint = attrs.get_f64("tint").unwrap_or(0.0);

        let base = if let Some(rgb) = attrs.get("rgb").and_then(parse_hex_rgb) {
            ColorBase::Rgb(rgb)
        } else if let Some(slot) = attrs.get_u32("theme") {
            ColorBase::Theme(slot)
        } else if let Some(index) = attrs.get_u32("indexed") {
            ColorBase::Indexed(index)
        } else {
            ColorBase::Auto
        };

        Self { base, tint }
    }

    /// Decode a color reference from an 8-byte binary color record body:
    /// base type (u8), palette/theme index (u8), tint scaled to `i16`
    /// (`value / 32767.0`), then red, green, blue, alpha bytes.
    pub fn from_record(data: &[u8]) -> Result<Self> {
        let mut offset = 0usize;
        let kind = record::read_u8(data, &mut offset)?;
        let index = record::read_u8(data, &mut offset)?;
        let tint_raw = record::read_i16(data, &mut offset)?;
        let r = record::read_u8(data, &mut offset)?;
        let g = record::read_u8(data, &mut offset)?;
        let b = record::read_u8(data, &mut offset)?;
        let _alpha = record::read_u8(data, &mut offset)?;

        let base = match kind {
            record::COLOR_TYPE_INDEXED => ColorBase::Indexed(index as u32),
            record::COLOR_TYPE_RGB => ColorBase::Rgb(Rgb::new(r, g, b)),
            record::COLOR_TYPE_THEME => ColorBase::Theme(index as u32),
            _ => ColorBase::Auto,
        };

        Ok(Self {
            base,
            tint: tint_raw as f64 / 32767.0,
        })
    }

    /// Resolve to the final display color
    pub fn resolve(&self, theme: &dyn ThemePalette) -> Rgb {
        let base = match self.base {
            ColorBase::Auto => Rgb::ZERO,
            ColorBase::Rgb(rgb) => rgb,
            ColorBase::Theme(slot) => theme
                .theme_color(remap_theme_slot(slot))
                .unwrap_or(Rgb::ZERO),
            ColorBase::Indexed(index) => legacy_index_color(index),
        };

        if self.tint != 0.0 {
            base.apply_tint(self.tint)
        } else {
            base
        }
    }
}

/// Parse an attribute-group color reference and resolve it in one step
pub fn resolve_color(attrs: &AttributeMap, theme: &dyn ThemePalette) -> Rgb {
    ColorRef::from_attrs(attrs).resolve(theme)
}

/// Remap a theme slot from the source format's numbering to the internal
/// numbering: 0 and 1 are swapped, as are 2 and 3; everything else passes
/// through. The source format numbers the window/text slot pairs in the
/// opposite order from the theme part itself.
pub fn remap_theme_slot(slot: u32) -> u32 {
    match slot {
        0 => 1,
        1 => 0,
        2 => 3,
        3 => 2,
        _ => slot,
    }
}

/// Parse a 6- or 8-digit hex color attribute value; 8-digit values carry a
/// leading alpha byte which is dropped.
fn parse_hex_rgb(hex: &str) -> Option<Rgb> {
    let hex = match hex.len() {
        6 => hex,
        8 => &hex[2..],
        _ => return None,
    };
    u32::from_str_radix(hex, 16).ok().map(Rgb)
}

/// Resolve a legacy palette index. Indices outside the table yield the zero
/// color; the table is never wrapped or clamped.
pub fn legacy_index_color(index: u32) -> Rgb {
    LEGACY_PALETTE
        .get(index as usize)
        .copied()
        .map(Rgb)
        .unwrap_or(Rgb::ZERO)
}

/// The fixed 64-entry legacy palette. Entries 0-7 are the historical EGA
/// colors, repeated at 8-15; 16-63 are the default workbook palette.
const LEGACY_PALETTE: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, // 0-7
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, // 8-15
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, // 16-23
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, // 24-31
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF, // 32-39
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99, // 40-47
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696, // 48-55
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333, // 56-63
];

fn rgb_to_hsl(c: Rgb) -> (f64, f64, f64) {
    let r = c.r() as f64 / 255.0;
    let g = c.g() as f64 / 255.0;
    let b = c.b() as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        ((g - b) / d).rem_euclid(6.0)
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    } * 60.0;

    (h, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = (h / 60.0).rem_euclid(6.0);
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(to_byte(r1), to_byte(g1), to_byte(b1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::NoTheme;
    use proptest::prelude::*;

    struct FixedTheme;

    impl ThemePalette for FixedTheme {
        fn theme_color(&self, slot: u32) -> Option<Rgb> {
            match slot {
                0 => Some(Rgb(0xFFFFFF)),
                1 => Some(Rgb(0x000000)),
                4 => Some(Rgb(0x4F81BD)),
                _ => None,
            }
        }
    }

    #[test]
    fn test_rgb_wins_over_theme_and_indexed() {
        let attrs =
            AttributeMap::from_pairs([("rgb", "FF112233"), ("theme", "4"), ("indexed", "2")]);
        assert_eq!(resolve_color(&attrs, &FixedTheme), Rgb(0x112233));
    }

    #[test]
    fn test_theme_slot_is_remapped_before_lookup() {
        // Raw slot 1 resolves through internal slot 0
        let attrs = AttributeMap::from_pairs([("theme", "1")]);
        assert_eq!(resolve_color(&attrs, &FixedTheme), Rgb(0xFFFFFF));
    }

    #[test]
    fn test_empty_reference_is_zero() {
        let attrs = AttributeMap::new();
        assert_eq!(resolve_color(&attrs, &FixedTheme), Rgb::ZERO);
    }

    #[test]
    fn test_indexed_lookup() {
        assert_eq!(legacy_index_color(2), Rgb(0xFF0000));
        assert_eq!(legacy_index_color(22), Rgb(0xC0C0C0));
        assert_eq!(legacy_index_color(63), Rgb(0x333333));
    }

    #[test]
    fn test_tint_lightens_and_darkens() {
        let red = Rgb(0xFF0000);
        let lighter = red.apply_tint(0.5);
        let darker = red.apply_tint(-0.5);
        assert!(rgb_to_hsl(lighter).2 > rgb_to_hsl(red).2);
        assert!(rgb_to_hsl(darker).2 < rgb_to_hsl(red).2);
    }

    #[test]
    fn test_zero_tint_uses_plain_rgb() {
        let attrs = AttributeMap::from_pairs([("rgb", "FF808080"), ("tint", "0")]);
        assert_eq!(resolve_color(&attrs, &NoTheme), Rgb(0x808080));
    }

    #[test]
    fn test_color_record_round() {
        // theme slot 4, no tint
        let data = [3u8, 4, 0, 0, 0, 0, 0, 0];
        let color = ColorRef::from_record(&data).unwrap();
        assert_eq!(color.base, ColorBase::Theme(4));
        assert_eq!(color.resolve(&FixedTheme), Rgb(0x4F81BD));
    }

    proptest! {
        #[test]
        fn prop_theme_remap_is_an_involution(slot in 0u32..64) {
            prop_assert_eq!(remap_theme_slot(remap_theme_slot(slot)), slot);
        }

        #[test]
        fn prop_theme_remap_identity_above_three(slot in 4u32..1000) {
            prop_assert_eq!(remap_theme_slot(slot), slot);
        }

        #[test]
        fn prop_legacy_index_is_bounds_safe(index in 0u32..10_000) {
            let color = legacy_index_color(index);
            if index >= 64 {
                prop_assert_eq!(color, Rgb::ZERO);
            }
        }
    }
}
