//! Colour, marker-size and marker-shape palettes used for hue/size/style
//! grouping.

use plotters::style::RGBColor;
use std::collections::HashMap;

const TAB10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];
const DEEP: [&str; 10] = [
    "#4c72b0", "#dd8452", "#55a868", "#c44e52", "#8172b3", "#937860", "#da8bc3", "#8c8c8c",
    "#ccb974", "#64b5cd",
];
const MUTED: [&str; 10] = [
    "#4878d0", "#ee854a", "#6acc64", "#d65f5f", "#956cb4", "#8c613c", "#dc7ec0", "#797979",
    "#d5bb67", "#82c6e2",
];
const PASTEL: [&str; 10] = [
    "#a1c9f4", "#ffb482", "#8de5a1", "#ff9f9b", "#d0bbff", "#debb9b", "#fab0e4", "#cfcfcf",
    "#fffea3", "#b9f2f0",
];
const DARK: [&str; 10] = [
    "#001c7f", "#b1400d", "#12711c", "#8c0800", "#591e71", "#592f0d", "#a23582", "#3c3c3c",
    "#b8850a", "#006374",
];

// Sequential ramps, sampled at even steps.
const VIRIDIS: [&str; 10] = [
    "#440154", "#482878", "#3e4a89", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6dcd59",
    "#b4de2c", "#fde725",
];
const MAGMA: [&str; 9] = [
    "#000004", "#1c1044", "#4f127b", "#812581", "#b5367a", "#e55064", "#fb8761", "#fec287",
    "#fcfdbf",
];
const BLUES: [&str; 9] = [
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];

/// An ordered list of colours, cycled for categorical keys and interpolated
/// for continuous values.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl ColorPalette {
    fn from_hex(hex: &[&str]) -> Self {
        Self {
            colors: hex.iter().filter_map(|h| parse_color(h)).collect(),
        }
    }

    pub fn category10() -> Self {
        Self::from_hex(&TAB10)
    }

    pub fn viridis() -> Self {
        Self::from_hex(&VIRIDIS)
    }

    /// Look up a palette by name. A single colour (`"red"`, `"#336699"`) is
    /// accepted as a one-entry palette.
    pub fn named(name: &str) -> Option<Self> {
        let palette = match name.trim().to_lowercase().as_str() {
            "tab10" | "category10" => Self::from_hex(&TAB10),
            "deep" => Self::from_hex(&DEEP),
            "muted" => Self::from_hex(&MUTED),
            "pastel" => Self::from_hex(&PASTEL),
            "dark" => Self::from_hex(&DARK),
            "viridis" => Self::from_hex(&VIRIDIS),
            "magma" => Self::from_hex(&MAGMA),
            "blues" => Self::from_hex(&BLUES),
            other => Self {
                colors: vec![parse_color(other)?],
            },
        };
        Some(palette)
    }

    /// Resolve an optional palette name, falling back to `default` when the
    /// name is absent or unknown.
    pub fn resolve(name: Option<&str>, default: fn() -> Self) -> Self {
        match name {
            Some(n) => Self::named(n).unwrap_or_else(|| {
                log::warn!("Unknown palette '{}', using default", n);
                default()
            }),
            None => default(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color(&self, idx: usize) -> RGBColor {
        if self.colors.is_empty() {
            return RGBColor(0, 0, 0);
        }
        self.colors[idx % self.colors.len()]
    }

    pub fn assign_colors(&self, keys: &[String]) -> HashMap<String, RGBColor> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), self.color(i)))
            .collect()
    }

    /// Linear interpolation along the palette, `t` in 0..=1.
    pub fn sample(&self, t: f64) -> RGBColor {
        if self.colors.len() < 2 {
            return self.color(0);
        }
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let pos = t * (self.colors.len() - 1) as f64;
        let lower = pos.floor() as usize;
        let upper = pos.ceil() as usize;
        let w = pos - lower as f64;

        let (a, b) = (self.colors[lower], self.colors[upper]);
        let lerp = |x: u8, y: u8| (f64::from(x) * (1.0 - w) + f64::from(y) * w).round() as u8;
        RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }
}

/// Marker glyphs for the `style` grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerShape {
    #[default]
    Circle,
    Square,
    Triangle,
    Diamond,
    Cross,
}

#[derive(Debug, Clone)]
pub struct ShapePalette {
    shapes: Vec<MarkerShape>,
}

impl ShapePalette {
    pub fn default_shapes() -> Self {
        Self {
            shapes: vec![
                MarkerShape::Circle,
                MarkerShape::Square,
                MarkerShape::Triangle,
                MarkerShape::Diamond,
                MarkerShape::Cross,
            ],
        }
    }

    pub fn assign_shapes(&self, keys: &[String]) -> HashMap<String, MarkerShape> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), self.shapes[i % self.shapes.len()]))
            .collect()
    }
}

/// Marker radii in pixels for the `size` grouping.
#[derive(Debug, Clone, Copy)]
pub struct SizePalette {
    pub min: f64,
    pub max: f64,
}

impl SizePalette {
    pub fn default_range() -> Self {
        Self { min: 2.0, max: 10.0 }
    }

    /// Evenly spaced sizes for categorical keys, in key order.
    pub fn assign_sizes(&self, keys: &[String]) -> HashMap<String, f64> {
        let n = keys.len();
        keys.iter()
            .enumerate()
            .map(|(i, k)| {
                let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.5 };
                (k.clone(), self.min + t * (self.max - self.min))
            })
            .collect()
    }

    /// Map a numeric value in `[lo, hi]` onto the size range.
    pub fn scale(&self, value: f64, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return (self.min + self.max) / 2.0;
        }
        let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
        self.min + t * (self.max - self.min)
    }
}

/// Parse a color string into RGBColor, supporting hex (#RRGGBB, #RGB) and named colors
pub fn parse_color(color_str: &str) -> Option<RGBColor> {
    let color_str = color_str.trim();

    if color_str.starts_with('#') {
        return parse_hex_color(color_str);
    }

    match color_str.to_lowercase().as_str() {
        "white" => Some(RGBColor(255, 255, 255)),
        "black" => Some(RGBColor(0, 0, 0)),
        "red" => Some(RGBColor(255, 0, 0)),
        "green" => Some(RGBColor(0, 128, 0)),
        "blue" => Some(RGBColor(0, 0, 255)),
        "yellow" => Some(RGBColor(255, 255, 0)),
        "cyan" => Some(RGBColor(0, 255, 255)),
        "magenta" => Some(RGBColor(255, 0, 255)),
        "orange" => Some(RGBColor(255, 165, 0)),
        "purple" => Some(RGBColor(128, 0, 128)),
        "pink" => Some(RGBColor(255, 192, 203)),
        "brown" => Some(RGBColor(139, 69, 19)),
        "gray" | "grey" => Some(RGBColor(128, 128, 128)),
        "darkgray" | "darkgrey" => Some(RGBColor(64, 64, 64)),
        "lightgray" | "lightgrey" => Some(RGBColor(192, 192, 192)),
        _ => None,
    }
}

/// Parse hex color (#RRGGBB or #RGB)
fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let hex = hex.trim_start_matches('#');
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(RGBColor(r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some(RGBColor(r, g, b))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff0000"), Some(RGBColor(255, 0, 0)));
        assert_eq!(parse_color("#f00"), Some(RGBColor(255, 0, 0)));
        assert_eq!(parse_color("Grey"), Some(RGBColor(128, 128, 128)));
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("not-a-color"), None);
    }

    #[test]
    fn test_named_palettes() {
        assert_eq!(ColorPalette::named("deep").unwrap().len(), 10);
        assert_eq!(
            ColorPalette::named("red").unwrap().color(3),
            RGBColor(255, 0, 0)
        );
        assert!(ColorPalette::named("nope").is_none());
    }

    #[test]
    fn test_resolve_falls_back() {
        let palette = ColorPalette::resolve(Some("nope"), ColorPalette::category10);
        assert_eq!(palette, ColorPalette::category10());
    }

    #[test]
    fn test_assign_colors_cycles() {
        let keys: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        let map = ColorPalette::category10().assign_colors(&keys);
        assert_eq!(map["0"], map["10"]);
        assert_ne!(map["0"], map["1"]);
    }

    #[test]
    fn test_sample_endpoints() {
        let viridis = ColorPalette::viridis();
        assert_eq!(viridis.sample(0.0), RGBColor(0x44, 0x01, 0x54));
        assert_eq!(viridis.sample(1.0), RGBColor(0xfd, 0xe7, 0x25));
        assert_eq!(viridis.sample(f64::NAN), viridis.sample(0.0));
    }

    #[test]
    fn test_size_palette() {
        let sizes = SizePalette::default_range();
        let keys = vec!["a".to_string(), "b".to_string()];
        let map = sizes.assign_sizes(&keys);
        assert_eq!(map["a"], 2.0);
        assert_eq!(map["b"], 10.0);
        assert_eq!(sizes.scale(5.0, 0.0, 10.0), 6.0);
        assert_eq!(sizes.scale(1.0, 1.0, 1.0), 6.0);
    }

    #[test]
    fn test_shapes_cycle() {
        let keys: Vec<String> = (0..6).map(|i| i.to_string()).collect();
        let map = ShapePalette::default_shapes().assign_shapes(&keys);
        assert_eq!(map["0"], MarkerShape::Circle);
        assert_eq!(map["5"], MarkerShape::Circle);
        assert_eq!(map["1"], MarkerShape::Square);
    }
}
