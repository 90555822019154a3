//! Plotters backend: walks a surface's elements and draws them onto a
//! bitmap or SVG drawing area.

use crate::error::{ChartError, Result};
use crate::format::format_tick;
use crate::palette::MarkerShape;
use crate::surface::{Axis, Element, FillStyle, LineStyle, PointStyle, Surface};
use image::ImageEncoder;
use plotters::chart::SeriesAnno;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

fn backend_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Backend(e.to_string())
}

/// Largest bitmap the PNG path will allocate.
const MAX_BITMAP_BYTES: usize = 1 << 30;

fn rgb_buffer_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .filter(|len| *len <= MAX_BITMAP_BYTES)
        .ok_or_else(|| {
            ChartError::Backend(format!("figure size {}x{} is too large for PNG", width, height))
        })
}

/// Rasterise the surface and encode it as PNG
pub fn to_png(surface: &Surface) -> Result<Vec<u8>> {
    let (width, height) = surface.size();
    let mut buffer = vec![0u8; rgb_buffer_len(width, height)?];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_on(surface, &root)?;
    }

    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes).write_image(
        &buffer,
        width,
        height,
        image::ColorType::Rgb8,
    )?;
    Ok(png_bytes)
}

pub fn to_svg(surface: &Surface) -> Result<String> {
    let (width, height) = surface.size();
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        draw_on(surface, &root)?;
    }
    Ok(svg)
}

/// Tick label for an axis value: the category name on a categorical axis,
/// otherwise the formatted number.
fn tick_label(axis: &Axis, value: f64) -> String {
    match &axis.categories {
        Some(categories) => {
            let idx = value.round();
            if (value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            categories.get(idx as usize).cloned().unwrap_or_default()
        }
        None => format_tick(value, axis.format),
    }
}

pub fn draw_on<DB: DrawingBackend>(surface: &Surface, root: &DrawingArea<DB, Shift>) -> Result<()> {
    root.fill(&WHITE).map_err(backend_err)?;

    let (x_min, x_max) = surface.x_bounds();
    let (y_min, y_max) = surface.y_bounds();

    let mut builder = ChartBuilder::on(root);
    builder
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60);
    if let Some(title) = surface.title() {
        builder.caption(title, ("sans-serif", 20));
    }
    let mut chart = builder
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(backend_err)?;

    let x_formatter = |v: &f64| tick_label(surface.x_axis(), *v);
    let y_formatter = |v: &f64| tick_label(surface.y_axis(), *v);

    let mut mesh = chart.configure_mesh();
    mesh.x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter);
    if let Some(categories) = &surface.x_axis().categories {
        mesh.x_labels(categories.len().max(2));
    }
    if let Some(categories) = &surface.y_axis().categories {
        mesh.y_labels(categories.len().max(2));
    }
    if let Some(label) = surface.x_label() {
        mesh.x_desc(label);
    }
    if let Some(label) = surface.y_label() {
        mesh.y_desc(label);
    }
    if !surface.grid() {
        mesh.disable_mesh();
    }
    mesh.draw().map_err(backend_err)?;

    let mut has_legend = false;
    for element in surface.elements() {
        has_legend |= element.legend().is_some();
        draw_element(&mut chart, element, (x_min, x_max), (y_min, y_max))?;
    }

    if has_legend && surface.legend_visible() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(backend_err)?;
    }

    root.present().map_err(backend_err)?;
    Ok(())
}

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_element<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    element: &Element,
    x_range: (f64, f64),
    y_range: (f64, f64),
) -> Result<()> {
    match element {
        Element::Points {
            points,
            sizes,
            style,
            legend,
        } => draw_points(chart, points, sizes.as_deref(), style, legend.as_deref()),
        Element::Line {
            points,
            style,
            legend,
        } => draw_line(chart, points.clone(), style, legend.as_deref()),
        Element::Rect {
            tl,
            br,
            style,
            legend,
        } => {
            let anno = chart
                .draw_series(std::iter::once(Rectangle::new(
                    [*tl, *br],
                    style.color.mix(style.alpha).filled(),
                )))
                .map_err(backend_err)?;
            label_fill(anno, legend.as_deref(), style);

            if let Some(outline) = style.outline {
                chart
                    .draw_series(std::iter::once(Rectangle::new([*tl, *br], outline)))
                    .map_err(backend_err)?;
            }
            Ok(())
        }
        Element::Polygon {
            points,
            style,
            legend,
        } => {
            let anno = chart
                .draw_series(std::iter::once(Polygon::new(
                    points.clone(),
                    style.color.mix(style.alpha).filled(),
                )))
                .map_err(backend_err)?;
            label_fill(anno, legend.as_deref(), style);

            if let (Some(outline), Some(first)) = (style.outline, points.first()) {
                let mut closed = points.clone();
                closed.push(*first);
                chart
                    .draw_series(std::iter::once(PathElement::new(closed, outline)))
                    .map_err(backend_err)?;
            }
            Ok(())
        }
        Element::Text {
            position,
            text,
            color,
        } => {
            let font = ("sans-serif", 12)
                .into_font()
                .color(color)
                .pos(Pos::new(HPos::Center, VPos::Center));
            chart
                .draw_series(std::iter::once(Text::new(text.clone(), *position, font)))
                .map_err(backend_err)?;
            Ok(())
        }
        Element::HLine { y, style } => {
            draw_line(chart, vec![(x_range.0, *y), (x_range.1, *y)], style, None)
        }
        Element::VLine { x, style } => {
            draw_line(chart, vec![(*x, y_range.0), (*x, y_range.1)], style, None)
        }
    }
}

fn draw_line<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    points: Vec<(f64, f64)>,
    style: &LineStyle,
    legend: Option<&str>,
) -> Result<()> {
    let color = style.color.mix(style.alpha);
    let width = style.width.max(1.0).round() as u32;

    let anno = chart
        .draw_series(LineSeries::new(points, color.stroke_width(width)))
        .map_err(backend_err)?;
    if let Some(label) = legend {
        anno.label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
    }
    Ok(())
}

fn draw_points<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    points: &[(f64, f64)],
    sizes: Option<&[f64]>,
    style: &PointStyle,
    legend: Option<&str>,
) -> Result<()> {
    let color = style.color.mix(style.alpha);
    let radius = |i: usize| -> i32 {
        sizes
            .and_then(|s| s.get(i).copied())
            .unwrap_or(style.size)
            .round()
            .max(1.0) as i32
    };
    let markers = points.iter().enumerate().map(|(i, &p)| (p, radius(i)));

    let anno = match style.shape {
        MarkerShape::Circle => chart.draw_series(
            markers.map(|(p, r)| Circle::new(p, r, color.filled())),
        ),
        MarkerShape::Square => chart.draw_series(markers.map(|(p, r)| {
            EmptyElement::at(p) + Rectangle::new([(-r, -r), (r, r)], color.filled())
        })),
        MarkerShape::Triangle => chart.draw_series(
            markers.map(|(p, r)| TriangleMarker::new(p, r, color.filled())),
        ),
        MarkerShape::Diamond => chart.draw_series(markers.map(|(p, r)| {
            EmptyElement::at(p)
                + Polygon::new(vec![(0, -r), (r, 0), (0, r), (-r, 0)], color.filled())
        })),
        MarkerShape::Cross => chart.draw_series(
            markers.map(|(p, r)| Cross::new(p, r, color.stroke_width(2))),
        ),
    }
    .map_err(backend_err)?;

    if let Some(label) = legend {
        anno.label(label)
            .legend(move |(x, y)| Circle::new((x + 6, y), 4, color.filled()));
    }
    Ok(())
}

fn label_fill<DB: DrawingBackend>(
    anno: &mut SeriesAnno<'_, DB>,
    legend: Option<&str>,
    style: &FillStyle,
) {
    if let Some(label) = legend {
        let color = style.color.mix(style.alpha);
        anno.label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::TickFormat;

    #[test]
    fn test_png_rejects_oversized_figure() {
        assert_eq!(rgb_buffer_len(800, 600).unwrap(), 800 * 600 * 3);

        let surface = Surface::new(40000, 40000);
        let err = surface.to_png().unwrap_err();
        assert!(matches!(err, ChartError::Backend(ref msg) if msg.contains("40000x40000")));
        assert!(rgb_buffer_len(u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn test_tick_label_categorical() {
        let axis = Axis {
            categories: Some(vec!["Drama".to_string(), "Comedy".to_string()]),
            ..Axis::default()
        };
        assert_eq!(tick_label(&axis, 0.0), "Drama");
        assert_eq!(tick_label(&axis, 1.0), "Comedy");
        assert_eq!(tick_label(&axis, 0.5), "");
        assert_eq!(tick_label(&axis, 2.0), "");
        assert_eq!(tick_label(&axis, -1.0), "");
    }

    #[test]
    fn test_tick_label_numeric() {
        let mut axis = Axis::default();
        assert_eq!(tick_label(&axis, 2_000_000.0), "2e6");
        axis.format = TickFormat::Plain;
        assert_eq!(tick_label(&axis, 2_000_000.0), "2,000,000");
    }
}
