//! The drawing surface: an inspectable scene of layers and primitive
//! elements, plus the axis, title, legend and grid state shared by every
//! layer drawn onto it.
//!
//! Nothing is rasterised until the surface is exported, so callers can keep
//! composing onto it and tests can query what was drawn.

use crate::backend;
use crate::error::Result;
use crate::format::TickFormat;
use crate::kind::ChartKind;
use crate::palette::MarkerShape;
use plotters::style::RGBColor;
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// Style configuration for point elements
#[derive(Debug, Clone, PartialEq)]
pub struct PointStyle {
    pub color: RGBColor,
    /// Marker radius in pixels
    pub size: f64,
    pub shape: MarkerShape,
    pub alpha: f64,
}

/// Style configuration for line elements
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: RGBColor,
    pub width: f64,
    pub alpha: f64,
}

impl LineStyle {
    pub fn solid(color: RGBColor, width: f64) -> Self {
        Self {
            color,
            width,
            alpha: 1.0,
        }
    }
}

/// Style configuration for rectangles and polygons
#[derive(Debug, Clone, PartialEq)]
pub struct FillStyle {
    pub color: RGBColor,
    pub alpha: f64,
    pub outline: Option<RGBColor>,
}

/// A primitive drawing element, in data coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Points {
        points: Vec<(f64, f64)>,
        /// Per-point radii overriding `style.size`
        sizes: Option<Vec<f64>>,
        style: PointStyle,
        legend: Option<String>,
    },
    Line {
        points: Vec<(f64, f64)>,
        style: LineStyle,
        legend: Option<String>,
    },
    Rect {
        // Top-Left, Bottom-Right
        tl: (f64, f64),
        br: (f64, f64),
        style: FillStyle,
        legend: Option<String>,
    },
    Polygon {
        points: Vec<(f64, f64)>,
        style: FillStyle,
        legend: Option<String>,
    },
    Text {
        position: (f64, f64),
        text: String,
        color: RGBColor,
    },
    HLine {
        y: f64,
        style: LineStyle,
    },
    VLine {
        x: f64,
        style: LineStyle,
    },
}

impl Element {
    pub fn legend(&self) -> Option<&str> {
        match self {
            Element::Points { legend, .. }
            | Element::Line { legend, .. }
            | Element::Rect { legend, .. }
            | Element::Polygon { legend, .. } => legend.as_deref(),
            _ => None,
        }
    }

    fn x_extent(&self) -> Vec<f64> {
        match self {
            Element::Points { points, .. }
            | Element::Line { points, .. }
            | Element::Polygon { points, .. } => points.iter().map(|p| p.0).collect(),
            Element::Rect { tl, br, .. } => vec![tl.0, br.0],
            Element::Text { position, .. } => vec![position.0],
            Element::VLine { x, .. } => vec![*x],
            Element::HLine { .. } => vec![],
        }
    }

    fn y_extent(&self) -> Vec<f64> {
        match self {
            Element::Points { points, .. }
            | Element::Line { points, .. }
            | Element::Polygon { points, .. } => points.iter().map(|p| p.1).collect(),
            Element::Rect { tl, br, .. } => vec![tl.1, br.1],
            Element::Text { position, .. } => vec![position.1],
            Element::HLine { y, .. } => vec![*y],
            Element::VLine { .. } => vec![],
        }
    }
}

/// Everything one render call drew.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub kind: ChartKind,
    /// The (transformed) values a distribution kind summarised; empty otherwise.
    pub sample: Vec<f64>,
    pub elements: Vec<Element>,
}

impl Layer {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            sample: Vec::new(),
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Axis {
    pub label: Option<String>,
    pub limits: Option<(f64, f64)>,
    pub format: TickFormat,
    /// Category names for a categorical axis; category `i` sits at `i`.
    pub categories: Option<Vec<String>>,
}

impl Axis {
    fn bounds(&self, values: impl Iterator<Item = f64>) -> (f64, f64) {
        if let Some(limits) = self.limits {
            return limits;
        }

        let (min, max) = values
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        if let Some(categories) = &self.categories {
            let lo = min.min(-0.5);
            let hi = max.max(categories.len() as f64 - 0.5);
            return (lo, hi);
        }

        if min > max {
            return (0.0, 1.0);
        }
        pad_range(min, max)
    }
}

/// 5% padding either side; a degenerate range is widened by one unit.
fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    }
}

/// The mutable rendering target handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    title: Option<String>,
    x_axis: Axis,
    y_axis: Axis,
    grid: bool,
    legend: bool,
    layers: Vec<Layer>,
    guides: Vec<Element>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            title: None,
            x_axis: Axis::default(),
            y_axis: Axis::default(),
            grid: false,
            legend: true,
            layers: Vec::new(),
            guides: Vec::new(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    pub fn x_axis_mut(&mut self) -> &mut Axis {
        &mut self.x_axis
    }

    pub fn y_axis_mut(&mut self) -> &mut Axis {
        &mut self.y_axis
    }

    pub fn x_label(&self) -> Option<&str> {
        self.x_axis.label.as_deref()
    }

    pub fn y_label(&self) -> Option<&str> {
        self.y_axis.label.as_deref()
    }

    pub fn grid(&self) -> bool {
        self.grid
    }

    pub fn set_grid(&mut self, grid: bool) {
        self.grid = grid;
    }

    pub fn legend_visible(&self) -> bool {
        self.legend
    }

    pub fn set_legend(&mut self, visible: bool) {
        self.legend = visible;
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn push_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Reference lines added with `axhline`/`axvline`.
    pub fn guides(&self) -> &[Element] {
        &self.guides
    }

    /// Horizontal reference line across the whole plot.
    pub fn axhline(&mut self, y: f64, style: LineStyle) {
        self.guides.push(Element::HLine { y, style });
    }

    /// Vertical reference line across the whole plot.
    pub fn axvline(&mut self, x: f64, style: LineStyle) {
        self.guides.push(Element::VLine { x, style });
    }

    /// Every element on the surface, layers first, then guides.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.layers
            .iter()
            .flat_map(|l| l.elements.iter())
            .chain(self.guides.iter())
    }

    /// Resolved x range: the limits if set, otherwise the padded data extent.
    pub fn x_bounds(&self) -> (f64, f64) {
        self.x_axis
            .bounds(self.elements().flat_map(|e| e.x_extent()))
    }

    /// Resolved y range: the limits if set, otherwise the padded data extent.
    pub fn y_bounds(&self) -> (f64, f64) {
        self.y_axis
            .bounds(self.elements().flat_map(|e| e.y_extent()))
    }

    /// Number of individual markers drawn across all layers.
    pub fn point_count(&self) -> usize {
        self.elements()
            .map(|e| match e {
                Element::Points { points, .. } => points.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.guides.is_empty()
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        backend::to_png(self)
    }

    pub fn to_svg(&self) -> Result<String> {
        backend::to_svg(self)
    }

    /// Write the surface to `path`: SVG for a `.svg` extension, PNG otherwise.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let is_svg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

        if is_svg {
            std::fs::write(path, self.to_svg()?)?;
        } else {
            std::fs::write(path, self.to_png()?)?;
        }
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}

/// The surface a render call returns: either one it created or the
/// caller's own, handed back.
#[derive(Debug)]
pub enum SurfaceHandle<'a> {
    Owned(Surface),
    Borrowed(&'a mut Surface),
}

impl SurfaceHandle<'_> {
    pub fn is_owned(&self) -> bool {
        matches!(self, SurfaceHandle::Owned(_))
    }

    /// The created surface, or `None` if the caller supplied one.
    pub fn into_owned(self) -> Option<Surface> {
        match self {
            SurfaceHandle::Owned(surface) => Some(surface),
            SurfaceHandle::Borrowed(_) => None,
        }
    }
}

impl Deref for SurfaceHandle<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        match self {
            SurfaceHandle::Owned(surface) => surface,
            SurfaceHandle::Borrowed(surface) => surface,
        }
    }
}

impl DerefMut for SurfaceHandle<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        match self {
            SurfaceHandle::Owned(surface) => surface,
            SurfaceHandle::Borrowed(surface) => surface,
        }
    }
}
