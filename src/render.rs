//! The chart renderer: parse the kind, build one layer of primitive elements
//! from the table, then place it on a (new or borrowed) surface and apply
//! the shared cosmetics.

use crate::error::{ChartError, Result};
use crate::format::format_tick;
use crate::geometry::{boxplot_geometry, dodge, violin_outline};
use crate::kind::ChartKind;
use crate::options::RenderOptions;
use crate::palette::{ColorPalette, MarkerShape, ShapePalette, SizePalette};
use crate::stats::{self, KDE_GRID_POINTS};
use crate::surface::{Element, FillStyle, Layer, LineStyle, PointStyle, Surface, SurfaceHandle};
use crate::table::{format_number, ColumnType, Table};
use plotters::style::RGBColor;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const WHITE: RGBColor = RGBColor(255, 255, 255);
const DARK: RGBColor = RGBColor(51, 51, 51);

/// What goes on an axis: a column of the table, or (for distribution
/// kinds) an explicit sequence of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selector<'a> {
    Column(&'a str),
    Values(&'a [f64]),
}

impl<'a> Selector<'a> {
    /// Column name, used as the default axis label.
    pub fn name(&self) -> Option<&'a str> {
        match *self {
            Selector::Column(name) => Some(name),
            Selector::Values(_) => None,
        }
    }
}

impl<'a> From<&'a str> for Selector<'a> {
    fn from(name: &'a str) -> Self {
        Selector::Column(name)
    }
}

impl<'a> From<&'a String> for Selector<'a> {
    fn from(name: &'a String) -> Self {
        Selector::Column(name)
    }
}

impl<'a> From<&'a [f64]> for Selector<'a> {
    fn from(values: &'a [f64]) -> Self {
        Selector::Values(values)
    }
}

impl<'a> From<&'a Vec<f64>> for Selector<'a> {
    fn from(values: &'a Vec<f64>) -> Self {
        Selector::Values(values)
    }
}

/// Draw one chart of `kind` onto `surface`, or onto a new surface sized per
/// `options.figsize` when none is given, and hand the surface back.
///
/// The table is never modified. An unknown kind fails with
/// [`ChartError::InvalidKind`] before any surface is created or touched;
/// column lookups fail with the table's own errors.
pub fn render<'s>(
    data: &Table,
    x: Selector<'_>,
    y: Option<&str>,
    kind: &str,
    options: &RenderOptions,
    surface: Option<&'s mut Surface>,
) -> Result<SurfaceHandle<'s>> {
    let kind: ChartKind = kind.parse()?;
    let built = build(data, x, y, kind, options)?;

    let mut handle = match surface {
        Some(surface) => SurfaceHandle::Borrowed(surface),
        None => SurfaceHandle::Owned(Surface::new(options.figsize.0, options.figsize.1)),
    };

    log::debug!(
        "Rendering {} layer with {} elements",
        kind,
        built.layer.elements.len()
    );
    place(&mut handle, built);
    decorate(&mut handle, x, y, kind, options);
    Ok(handle)
}

/// A finished layer plus the category names its axes need.
struct Built {
    layer: Layer,
    x_categories: Option<Vec<String>>,
    y_categories: Option<Vec<String>>,
}

impl Built {
    fn new(layer: Layer) -> Self {
        Self {
            layer,
            x_categories: None,
            y_categories: None,
        }
    }
}

struct Context<'a> {
    data: &'a Table,
    options: &'a RenderOptions,
    kind: ChartKind,
    palette: ColorPalette,
}

impl Context<'_> {
    fn alpha(&self, default: f64) -> f64 {
        self.options.alpha.unwrap_or(default).clamp(0.0, 1.0)
    }

    /// Note groupers this kind has no use for.
    fn ignore(&self, hue: bool, style: bool, size: bool) {
        let unused = [
            ("hue", hue, &self.options.hue),
            ("style", style, &self.options.style),
            ("size", size, &self.options.size),
        ];
        for (name, ignored, value) in unused {
            if let (true, Some(column)) = (ignored, value) {
                log::debug!("{}={} has no effect on {} charts", name, column, self.kind);
            }
        }
    }
}

fn build(
    data: &Table,
    x: Selector<'_>,
    y: Option<&str>,
    kind: ChartKind,
    options: &RenderOptions,
) -> Result<Built> {
    if options.transform.is_some() && !kind.is_distribution() {
        log::debug!("transform has no effect on {} charts", kind);
    }

    let ctx = Context {
        data,
        options,
        kind,
        palette: ColorPalette::resolve(options.palette.as_deref(), ColorPalette::category10),
    };

    match kind {
        ChartKind::Scatter => {
            ctx.ignore(false, false, false);
            scatter(&ctx, x, required_y(kind, y)?)
        }
        ChartKind::Line => {
            ctx.ignore(false, true, true);
            line(&ctx, x, required_y(kind, y)?)
        }
        ChartKind::Bar => {
            ctx.ignore(false, true, true);
            bar(&ctx, x, required_y(kind, y)?)
        }
        ChartKind::Heatmap => {
            ctx.ignore(true, true, true);
            heatmap(&ctx, x, required_y(kind, y)?)
        }
        ChartKind::Distribution | ChartKind::Histogram => {
            ctx.ignore(true, true, true);
            if let Some(y) = y {
                log::debug!("y={} has no effect on {} charts", y, kind);
            }
            histogram(&ctx, x, kind == ChartKind::Distribution)
        }
        ChartKind::Box => {
            ctx.ignore(true, true, true);
            boxplot(&ctx, x, y)
        }
        ChartKind::Violin => {
            ctx.ignore(true, true, true);
            violin(&ctx, x, y)
        }
    }
}

fn required_y(kind: ChartKind, y: Option<&str>) -> Result<&str> {
    y.ok_or_else(|| ChartError::Param(format!("{} charts need a y column", kind)))
}

fn place(surface: &mut Surface, built: Built) {
    if let Some(categories) = built.x_categories {
        surface.x_axis_mut().categories = Some(categories);
    }
    if let Some(categories) = built.y_categories {
        surface.y_axis_mut().categories = Some(categories);
    }
    surface.push_layer(built.layer);
}

/// Shared cosmetics, applied whatever the kind.
fn decorate(
    surface: &mut Surface,
    x: Selector<'_>,
    y: Option<&str>,
    kind: ChartKind,
    options: &RenderOptions,
) {
    if let Some(title) = &options.title {
        surface.set_title(title.clone());
    }

    let count_axis = matches!(kind, ChartKind::Distribution | ChartKind::Histogram);
    let x_label = options.xlabel.as_deref().or(x.name());
    let y_label = options
        .ylabel
        .as_deref()
        .or(y)
        .or(count_axis.then_some("Count"));

    if let Some(label) = x_label {
        surface.x_axis_mut().label = Some(label.to_string());
    }
    if let Some(label) = y_label {
        surface.y_axis_mut().label = Some(label.to_string());
    }

    if let Some(limits) = options.xlim {
        surface.x_axis_mut().limits = Some(limits);
    }
    if let Some(limits) = options.ylim {
        surface.y_axis_mut().limits = Some(limits);
    }

    if options.plain_format {
        let format = options.tick_format();
        surface.x_axis_mut().format = format;
        surface.y_axis_mut().format = format;
    }
    if options.grid {
        surface.set_grid(true);
    }
    surface.set_legend(options.legend);
}

// ---------------------------------------------------------------------------
// Column access
// ---------------------------------------------------------------------------

fn check_len(column: &str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(ChartError::LengthMismatch {
            column: column.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

fn numeric_values(data: &Table, selector: Selector<'_>) -> Result<Vec<Option<f64>>> {
    match selector {
        Selector::Column(name) => data.numeric(name),
        Selector::Values(values) => Ok(values.iter().map(|&v| Some(v)).collect()),
    }
}

fn category_values(data: &Table, selector: Selector<'_>) -> Result<Vec<Option<String>>> {
    match selector {
        Selector::Column(name) => data.categorical(name),
        Selector::Values(values) => Ok(values.iter().map(|&v| Some(format_number(v))).collect()),
    }
}

/// Per-row keys of an optional grouping column.
fn grouping(data: &Table, column: Option<&str>) -> Result<Option<Vec<Option<String>>>> {
    column.map(|c| data.categorical(c)).transpose()
}

/// Group key of `row`: empty when ungrouped, `None` when the cell is null.
fn key_at(grouping: &Option<Vec<Option<String>>>, row: usize) -> Option<String> {
    match grouping {
        None => Some(String::new()),
        Some(keys) => keys[row].clone(),
    }
}

/// Order of category keys on an axis or in a legend: keys that read as
/// numbers sort by value and ahead of text keys, text keys sort by name.
fn category_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn distinct<'a>(keys: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut keys: Vec<String> = keys
        .into_iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    keys.sort_by(|a, b| category_order(a, b));
    keys
}

/// Entries of a `(hue, style)` keyed map in legend order.
fn legend_ordered<V>(groups: BTreeMap<(String, String), V>) -> Vec<((String, String), V)> {
    let mut groups: Vec<_> = groups.into_iter().collect();
    groups.sort_by(|((h1, s1), _), ((h2, s2), _)| {
        category_order(h1, h2).then_with(|| category_order(s1, s2))
    });
    groups
}

/// Per-row marker radii for the `size` grouper: numeric columns scale
/// continuously, anything else is treated as categories.
fn marker_sizes(data: &Table, column: Option<&str>) -> Result<Option<Vec<Option<f64>>>> {
    let Some(column) = column else {
        return Ok(None);
    };
    let palette = SizePalette::default_range();

    if data.column(column)?.column_type() == ColumnType::Categorical {
        let keys = data.categorical(column)?;
        let sizes = palette.assign_sizes(&distinct(keys.iter().flatten()));
        return Ok(Some(
            keys.iter()
                .map(|k| k.as_ref().map(|k| sizes[k]))
                .collect(),
        ));
    }

    let values = data.numeric(column)?;
    let (lo, hi) = values
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    Ok(Some(
        values
            .iter()
            .map(|v| v.map(|v| palette.scale(v, lo, hi)))
            .collect(),
    ))
}

/// Apply the configured transform, dropping values that come out non-finite.
fn transform_values(options: &RenderOptions, values: Vec<f64>) -> Vec<f64> {
    let before = values.len();
    let out: Vec<f64> = match &options.transform {
        Some(transform) => values.into_iter().map(|v| transform.apply(v)).collect(),
        None => values,
    };
    let out: Vec<f64> = out.into_iter().filter(|v| v.is_finite()).collect();
    if out.len() < before {
        log::warn!(
            "Dropped {} non-finite value(s) after transform",
            before - out.len()
        );
    }
    out
}

/// The univariate sample a distribution kind summarises.
fn distribution_sample(ctx: &Context<'_>, x: Selector<'_>) -> Result<Vec<f64>> {
    let raw = numeric_values(ctx.data, x)?.into_iter().flatten().collect();
    let sample = transform_values(ctx.options, raw);
    if sample.is_empty() {
        return Err(ChartError::EmptyData(format!(
            "No finite values to plot in '{}'",
            x.name().unwrap_or("values")
        )));
    }
    Ok(sample)
}

/// Samples for box and violin charts: per category of `x` when `y` is
/// given (drawn upright), otherwise a single sample of `x` (lying down).
struct ValueGroups {
    names: Vec<String>,
    samples: Vec<Vec<f64>>,
    vertical: bool,
}

fn value_groups(ctx: &Context<'_>, x: Selector<'_>, y: Option<&str>) -> Result<ValueGroups> {
    let Some(y) = y else {
        let sample = distribution_sample(ctx, x)?;
        return Ok(ValueGroups {
            names: vec![x.name().unwrap_or("values").to_string()],
            samples: vec![sample],
            vertical: false,
        });
    };

    let keys = category_values(ctx.data, x)?;
    let values = ctx.data.numeric(y)?;
    check_len(y, keys.len(), values.len())?;

    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (key, value) in keys.into_iter().zip(values) {
        if let (Some(key), Some(value)) = (key, value) {
            groups.entry(key).or_default().push(value);
        }
    }

    let mut groups: Vec<(String, Vec<f64>)> = groups.into_iter().collect();
    groups.sort_by(|a, b| category_order(&a.0, &b.0));

    let mut names = Vec::new();
    let mut samples = Vec::new();
    for (name, values) in groups {
        let sample = transform_values(ctx.options, values);
        if !sample.is_empty() {
            names.push(name);
            samples.push(sample);
        }
    }
    if samples.is_empty() {
        return Err(ChartError::EmptyData(format!("No finite values to plot in '{}'", y)));
    }

    Ok(ValueGroups {
        names,
        samples,
        vertical: true,
    })
}

// ---------------------------------------------------------------------------
// Relational kinds
// ---------------------------------------------------------------------------

fn scatter(ctx: &Context<'_>, x: Selector<'_>, y: &str) -> Result<Built> {
    let xs = numeric_values(ctx.data, x)?;
    let ys = ctx.data.numeric(y)?;
    check_len(y, xs.len(), ys.len())?;

    let hue = grouping(ctx.data, ctx.options.hue.as_deref())?;
    let style = grouping(ctx.data, ctx.options.style.as_deref())?;
    let sizes = marker_sizes(ctx.data, ctx.options.size.as_deref())?;

    let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for row in 0..xs.len() {
        if xs[row].is_none() || ys[row].is_none() {
            continue;
        }
        if sizes.as_ref().is_some_and(|s| s[row].is_none()) {
            continue;
        }
        if let (Some(h), Some(s)) = (key_at(&hue, row), key_at(&style, row)) {
            groups.entry((h, s)).or_default().push(row);
        }
    }

    let hue_keys = distinct(groups.keys().map(|(h, _)| h));
    let colors = match ctx.options.hue.as_deref() {
        Some(column) if ctx.data.column(column)?.column_type() == ColumnType::Numeric => {
            let palette =
                ColorPalette::resolve(ctx.options.palette.as_deref(), ColorPalette::viridis);
            ramp_colors(&palette, &hue_keys)
        }
        _ => ctx.palette.assign_colors(&hue_keys),
    };
    let shapes = ShapePalette::default_shapes().assign_shapes(&distinct(groups.keys().map(|(_, s)| s)));
    let smooth = ctx.options.param_bool("smooth")?.unwrap_or(false);
    let alpha = ctx.alpha(0.8);

    let mut layer = Layer::new(ctx.kind);
    for ((h, s), rows) in &legend_ordered(groups) {
        let color = if hue.is_some() { colors[h] } else { ctx.palette.color(0) };
        let shape = if style.is_some() { shapes[s] } else { MarkerShape::Circle };

        let points: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|&r| Some((xs[r]?, ys[r]?)))
            .collect();
        let radii = sizes
            .as_ref()
            .map(|s| rows.iter().filter_map(|&r| s[r]).collect());

        let legend = [h.as_str(), s.as_str()]
            .into_iter()
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        if smooth {
            if let Some(trend) = trend_line(&points) {
                layer.push(Element::Line {
                    points: trend,
                    style: LineStyle::solid(color, 2.0),
                    legend: None,
                });
            }
        }

        layer.push(Element::Points {
            points,
            sizes: radii,
            style: PointStyle {
                color,
                size: 4.0,
                shape,
                alpha,
            },
            legend: (!legend.is_empty()).then_some(legend),
        });
    }

    Ok(Built::new(layer))
}

/// Colours for numeric hue keys, sampled along a sequential ramp by value.
fn ramp_colors(palette: &ColorPalette, keys: &[String]) -> HashMap<String, RGBColor> {
    let values: Vec<f64> = keys.iter().filter_map(|k| k.parse().ok()).collect();
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    keys.iter()
        .map(|k| {
            let t = match k.parse::<f64>() {
                Ok(v) if hi > lo => (v - lo) / (hi - lo),
                _ => 0.5,
            };
            (k.clone(), palette.sample(t))
        })
        .collect()
}

/// Least-squares line across the x extent of `points`.
fn trend_line(points: &[(f64, f64)]) -> Option<Vec<(f64, f64)>> {
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let fit = stats::linear_fit(&xs, &ys)?;

    let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(vec![(lo, fit.predict(lo)), (hi, fit.predict(hi))])
}

fn line(ctx: &Context<'_>, x: Selector<'_>, y: &str) -> Result<Built> {
    let xs = numeric_values(ctx.data, x)?;
    let ys = ctx.data.numeric(y)?;
    check_len(y, xs.len(), ys.len())?;
    let hue = grouping(ctx.data, ctx.options.hue.as_deref())?;

    let mut groups: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
    for row in 0..xs.len() {
        if let (Some(xv), Some(yv), Some(key)) = (xs[row], ys[row], key_at(&hue, row)) {
            groups.entry(key).or_default().push((xv, yv));
        }
    }

    let mut groups: Vec<(String, Vec<(f64, f64)>)> = groups.into_iter().collect();
    groups.sort_by(|a, b| category_order(&a.0, &b.0));

    let alpha = ctx.alpha(1.0);
    let mut layer = Layer::new(ctx.kind);
    for (i, (key, mut points)) in groups.into_iter().enumerate() {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        layer.push(Element::Line {
            points,
            style: LineStyle {
                color: ctx.palette.color(i),
                width: 2.0,
                alpha,
            },
            legend: hue.is_some().then_some(key),
        });
    }

    Ok(Built::new(layer))
}

// ---------------------------------------------------------------------------
// Categorical kinds
// ---------------------------------------------------------------------------

/// How bar heights and heatmap cells aggregate their values.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Estimator {
    Mean,
    Median,
    Sum,
    Count,
}

impl Estimator {
    fn from_options(options: &RenderOptions) -> Result<Self> {
        match options.param_str("estimator").as_deref() {
            None | Some("mean") => Ok(Estimator::Mean),
            Some("median") => Ok(Estimator::Median),
            Some("sum") => Ok(Estimator::Sum),
            Some("count") => Ok(Estimator::Count),
            Some(other) => Err(ChartError::Param(format!(
                "unknown estimator '{}' (expected mean, median, sum or count)",
                other
            ))),
        }
    }

    fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Estimator::Mean => stats::mean(values).unwrap_or(0.0),
            Estimator::Median => stats::percentile(&stats::sorted(values), 0.5),
            Estimator::Sum => values.iter().sum(),
            Estimator::Count => values.len() as f64,
        }
    }
}

fn bar(ctx: &Context<'_>, x: Selector<'_>, y: &str) -> Result<Built> {
    let categories = category_values(ctx.data, x)?;
    let ys = ctx.data.numeric(y)?;
    check_len(y, categories.len(), ys.len())?;
    let hue = grouping(ctx.data, ctx.options.hue.as_deref())?;
    let estimator = Estimator::from_options(ctx.options)?;

    // (category, hue) -> values
    let mut cells: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for row in 0..ys.len() {
        if let (Some(cat), Some(v), Some(h)) = (categories[row].clone(), ys[row], key_at(&hue, row)) {
            cells.entry((cat, h)).or_default().push(v);
        }
    }

    let mut order = distinct(cells.keys().map(|(c, _)| c));
    match ctx.options.param_str("order").as_deref() {
        None | Some("name") => {}
        Some("value") => {
            let mut totals: HashMap<&str, Vec<f64>> = HashMap::new();
            for ((cat, _), values) in &cells {
                totals.entry(cat.as_str()).or_default().extend(values);
            }
            let height = |c: &String| totals.get(c.as_str()).map_or(0.0, |v| estimator.apply(v));
            order.sort_by(|a, b| height(b).total_cmp(&height(a)));
        }
        Some(other) => {
            return Err(ChartError::Param(format!(
                "unknown order '{}' (expected name or value)",
                other
            )))
        }
    }

    let series = distinct(cells.keys().map(|(_, h)| h));
    let alpha = ctx.alpha(1.0);
    let mut layer = Layer::new(ctx.kind);

    for (series_idx, h) in series.iter().enumerate() {
        let color = ctx.palette.color(series_idx);
        let (slot, offset) = dodge(series_idx, series.len(), 0.8);
        let mut legend = hue.is_some().then(|| h.clone());

        for (cat_idx, cat) in order.iter().enumerate() {
            let Some(values) = cells.get(&(cat.clone(), h.clone())) else {
                continue;
            };
            let centre = cat_idx as f64 + offset;
            layer.push(Element::Rect {
                tl: (centre - slot / 2.0, estimator.apply(values)),
                br: (centre + slot / 2.0, 0.0),
                style: FillStyle {
                    color,
                    alpha,
                    outline: None,
                },
                legend: legend.take(),
            });
        }
    }

    let mut built = Built::new(layer);
    built.x_categories = Some(order);
    Ok(built)
}

fn heatmap(ctx: &Context<'_>, x: Selector<'_>, y: &str) -> Result<Built> {
    let xs = category_values(ctx.data, x)?;
    let ys = ctx.data.categorical(y)?;
    check_len(y, xs.len(), ys.len())?;

    let (values, estimator) = match ctx.options.param_str("value") {
        Some(column) => {
            let values = ctx.data.numeric(&column)?;
            check_len(&column, xs.len(), values.len())?;
            (Some(values), Estimator::Mean)
        }
        None => (None, Estimator::Count),
    };

    let mut cells: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for row in 0..xs.len() {
        let (Some(xk), Some(yk)) = (xs[row].clone(), ys[row].clone()) else {
            continue;
        };
        let value = match &values {
            Some(values) => values[row],
            None => Some(1.0),
        };
        if let Some(value) = value {
            cells.entry((xk, yk)).or_default().push(value);
        }
    }

    let x_cats = distinct(cells.keys().map(|(xk, _)| xk));
    let y_cats = distinct(cells.keys().map(|(_, yk)| yk));
    let cell_values: Vec<(f64, f64, f64)> = cells
        .iter()
        .map(|((xk, yk), v)| (position(&x_cats, xk), position(&y_cats, yk), estimator.apply(v)))
        .collect();
    let (lo, hi) = cell_values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.2), hi.max(c.2))
        });

    let palette = ColorPalette::resolve(ctx.options.palette.as_deref(), ColorPalette::viridis);
    let annotate = ctx.options.param_bool("annotate")?.unwrap_or(false);
    let alpha = ctx.alpha(1.0);
    let mut layer = Layer::new(ctx.kind);

    for &(i, j, v) in &cell_values {
        let t = if hi > lo { (v - lo) / (hi - lo) } else { 0.5 };
        let color = palette.sample(t);
        layer.push(Element::Rect {
            tl: (i - 0.5, j + 0.5),
            br: (i + 0.5, j - 0.5),
            style: FillStyle {
                color,
                alpha,
                outline: Some(WHITE),
            },
            legend: None,
        });
        if annotate {
            layer.push(Element::Text {
                position: (i, j),
                text: format_tick(v, ctx.options.tick_format()),
                color: contrasting(color),
            });
        }
    }

    let mut built = Built::new(layer);
    built.x_categories = Some(x_cats);
    built.y_categories = Some(y_cats);
    Ok(built)
}

/// Axis position of a category in an ordered category list.
fn position(categories: &[String], key: &str) -> f64 {
    categories.iter().position(|c| c == key).unwrap_or(0) as f64
}

/// Black or white, whichever reads better on `background`.
fn contrasting(background: RGBColor) -> RGBColor {
    let RGBColor(r, g, b) = background;
    let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
    if luma < 128.0 {
        WHITE
    } else {
        RGBColor(0, 0, 0)
    }
}

// ---------------------------------------------------------------------------
// Distribution kinds
// ---------------------------------------------------------------------------

/// Upper bound on an explicit bin count.
const MAX_BINS: usize = 10_000;

fn histogram(ctx: &Context<'_>, x: Selector<'_>, with_kde: bool) -> Result<Built> {
    let sample = distribution_sample(ctx, x)?;
    let bin_count = match ctx.options.param_usize("bins")? {
        Some(bins) if bins > MAX_BINS => {
            return Err(ChartError::Param(format!(
                "'bins' must be at most {}, got {}",
                MAX_BINS, bins
            )))
        }
        Some(bins) => bins,
        None => stats::sturges_bins(sample.len()),
    };
    let color = ctx.palette.color(0);
    let alpha = ctx.alpha(if with_kde { 0.6 } else { 0.8 });

    let mut layer = Layer::new(ctx.kind);
    let bins = stats::bin(&sample, bin_count);
    for b in &bins {
        layer.push(Element::Rect {
            tl: (b.lower, b.count as f64),
            br: (b.upper, 0.0),
            style: FillStyle {
                color,
                alpha,
                outline: Some(WHITE),
            },
            legend: None,
        });
    }

    let kde = ctx.options.param_bool("kde")?;
    if !with_kde && kde == Some(true) {
        log::debug!("kde=true has no effect on histogram charts; use distribution");
    }
    if with_kde && kde.unwrap_or(true) {
        match bins.first() {
            Some(first) if sample.len() >= 2 => {
                let bandwidth = stats::silverman_bandwidth(&sample);
                let (grid, density) = stats::kde(&sample, bandwidth, KDE_GRID_POINTS);
                // Density integrates to 1; scale it to the bars' counts.
                let scale = sample.len() as f64 * first.width();
                layer.push(Element::Line {
                    points: grid
                        .into_iter()
                        .zip(density)
                        .map(|(g, d)| (g, d * scale))
                        .collect(),
                    style: LineStyle::solid(color, 2.0),
                    legend: None,
                });
            }
            _ => log::debug!("Skipping density curve for a single value"),
        }
    }

    layer.sample = sample;
    Ok(Built::new(layer))
}

fn boxplot(ctx: &Context<'_>, x: Selector<'_>, y: Option<&str>) -> Result<Built> {
    let groups = value_groups(ctx, x, y)?;
    let alpha = ctx.alpha(1.0);
    let whisker_style = LineStyle::solid(DARK, 1.0);

    let mut layer = Layer::new(ctx.kind);
    for (i, sample) in groups.samples.iter().enumerate() {
        let Some(summary) = stats::boxplot_summary(sample) else {
            continue;
        };
        let geom = boxplot_geometry(i as f64, 0.5, &summary, groups.vertical);

        // Whiskers and caps first, then the box over them
        for points in [geom.lower_whisker, geom.upper_whisker, geom.min_cap, geom.max_cap] {
            layer.push(Element::Line {
                points,
                style: whisker_style.clone(),
                legend: None,
            });
        }
        layer.push(Element::Rect {
            tl: geom.box_tl,
            br: geom.box_br,
            style: FillStyle {
                color: ctx.palette.color(i),
                alpha,
                outline: Some(DARK),
            },
            legend: None,
        });
        layer.push(Element::Line {
            points: geom.median_line,
            style: LineStyle::solid(WHITE, 2.0),
            legend: None,
        });
        if !geom.outlier_points.is_empty() {
            layer.push(Element::Points {
                points: geom.outlier_points,
                sizes: None,
                style: PointStyle {
                    color: DARK,
                    size: 3.0,
                    shape: MarkerShape::Circle,
                    alpha: 1.0,
                },
                legend: None,
            });
        }
    }

    Ok(finish_groups(layer, groups))
}

fn violin(ctx: &Context<'_>, x: Selector<'_>, y: Option<&str>) -> Result<Built> {
    let groups = value_groups(ctx, x, y)?;
    let alpha = ctx.alpha(0.7);
    let vertical = groups.vertical;
    let at = |p: f64, v: f64| if vertical { (p, v) } else { (v, p) };

    let mut layer = Layer::new(ctx.kind);
    for (i, sample) in groups.samples.iter().enumerate() {
        let pos = i as f64;
        if sample.len() >= 2 {
            let bandwidth = stats::silverman_bandwidth(sample);
            let (grid, density) = stats::kde(sample, bandwidth, KDE_GRID_POINTS);
            let outline = violin_outline(pos, 0.8, &grid, &density, vertical);
            if !outline.is_empty() {
                layer.push(Element::Polygon {
                    points: outline,
                    style: FillStyle {
                        color: ctx.palette.color(i),
                        alpha,
                        outline: Some(DARK),
                    },
                    legend: None,
                });
            }
        }

        let median = stats::percentile(&stats::sorted(sample), 0.5);
        layer.push(Element::Line {
            points: vec![at(pos - 0.1, median), at(pos + 0.1, median)],
            style: LineStyle::solid(DARK, 2.0),
            legend: None,
        });
    }

    Ok(finish_groups(layer, groups))
}

/// Record the drawn sample and label the category axis.
fn finish_groups(mut layer: Layer, groups: ValueGroups) -> Built {
    layer.sample = groups.samples.into_iter().flatten().collect();

    let vertical = groups.vertical;
    let mut built = Built::new(layer);
    if vertical {
        built.x_categories = Some(groups.names);
    } else {
        built.y_categories = Some(groups.names);
    }
    built
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Param, Transform};
    use crate::stats::Summary;
    use crate::table::Column;

    fn movies() -> Table {
        Table::new(vec![
            Column::numeric("budget_adj", vec![100.0, 200.0, 300.0, 400.0]),
            Column::numeric("revenue_adj", vec![50.0, 500.0, 900.0, 0.0]),
            Column::categorical("genre", vec!["Drama", "Comedy", "Drama", "Action"]),
            Column::categorical("rating", vec!["PG", "R", "R", "PG"]),
        ])
        .unwrap()
    }

    fn rects(layer: &Layer) -> Vec<((f64, f64), (f64, f64))> {
        layer
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::Rect { tl, br, .. } => Some((*tl, *br)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_scatter_hue_groups() {
        let options = RenderOptions {
            hue: Some("genre".to_string()),
            ..RenderOptions::default()
        };
        let surface = render(&movies(), "budget_adj".into(), Some("revenue_adj"), "scatter", &options, None)
            .unwrap();

        let layer = &surface.layers()[0];
        let legends: Vec<&str> = layer.elements.iter().filter_map(|e| e.legend()).collect();
        assert_eq!(legends, vec!["Action", "Comedy", "Drama"]);
        assert_eq!(surface.point_count(), 4);
    }

    #[test]
    fn test_scatter_smooth_adds_trend() {
        let options = RenderOptions::default().with_param("smooth", Param::Bool(true));
        let surface = render(&movies(), "budget_adj".into(), Some("revenue_adj"), "scatter", &options, None)
            .unwrap();

        let lines = surface.layers()[0]
            .elements
            .iter()
            .filter(|e| matches!(e, Element::Line { .. }))
            .count();
        assert_eq!(lines, 1);
    }

    #[test]
    fn test_scatter_size_column() {
        let options = RenderOptions {
            size: Some("budget_adj".to_string()),
            ..RenderOptions::default()
        };
        let surface = render(&movies(), "budget_adj".into(), Some("revenue_adj"), "scatter", &options, None)
            .unwrap();

        match &surface.layers()[0].elements[0] {
            Element::Points { sizes: Some(sizes), .. } => {
                assert_eq!(sizes.first(), Some(&2.0));
                assert_eq!(sizes.last(), Some(&10.0));
            }
            other => panic!("expected sized points, got {:?}", other),
        }
    }

    #[test]
    fn test_line_sorted_by_x() {
        let data = Table::new(vec![
            Column::numeric("year", vec![2001.0, 1999.0, 2000.0]),
            Column::numeric("count", vec![3.0, 1.0, 2.0]),
        ])
        .unwrap();
        let surface = render(&data, "year".into(), Some("count"), "line", &RenderOptions::default(), None)
            .unwrap();

        match &surface.layers()[0].elements[0] {
            Element::Line { points, .. } => {
                assert_eq!(points, &vec![(1999.0, 1.0), (2000.0, 2.0), (2001.0, 3.0)]);
            }
            other => panic!("expected a line, got {:?}", other),
        }
    }

    #[test]
    fn test_bar_estimators() {
        let data = movies();
        let mean = render(&data, "genre".into(), Some("revenue_adj"), "bar", &RenderOptions::default(), None)
            .unwrap();
        assert_eq!(
            mean.x_axis().categories.as_deref(),
            Some(&["Action".to_string(), "Comedy".to_string(), "Drama".to_string()][..])
        );
        let heights: Vec<f64> = rects(&mean.layers()[0]).iter().map(|r| r.0 .1).collect();
        assert_eq!(heights, vec![0.0, 500.0, 475.0]);

        let options = RenderOptions::default().with_param("estimator", Param::Text("count".into()));
        let count = render(&data, "genre".into(), Some("revenue_adj"), "bar", &options, None).unwrap();
        let heights: Vec<f64> = rects(&count.layers()[0]).iter().map(|r| r.0 .1).collect();
        assert_eq!(heights, vec![1.0, 1.0, 2.0]);

        let options = RenderOptions::default().with_param("estimator", Param::Text("mode".into()));
        assert!(render(&data, "genre".into(), Some("revenue_adj"), "bar", &options, None).is_err());
    }

    #[test]
    fn test_bar_order_by_value() {
        let options = RenderOptions::default()
            .with_param("order", Param::Text("value".into()))
            .with_param("estimator", Param::Text("sum".into()));
        let surface = render(&movies(), "genre".into(), Some("revenue_adj"), "bar", &options, None)
            .unwrap();
        assert_eq!(
            surface.x_axis().categories.as_deref(),
            Some(&["Drama".to_string(), "Comedy".to_string(), "Action".to_string()][..])
        );
    }

    #[test]
    fn test_bar_dodges_hue() {
        let options = RenderOptions {
            hue: Some("rating".to_string()),
            ..RenderOptions::default()
        };
        let surface = render(&movies(), "genre".into(), Some("revenue_adj"), "bar", &options, None)
            .unwrap();
        let layer = &surface.layers()[0];

        // Action only has PG, drawn left of centre
        let action = rects(layer)[0];
        assert!((action.0 .0 + 0.4).abs() < 1e-12);
        assert!(action.1 .0.abs() < 1e-12);

        let legends: Vec<&str> = layer.elements.iter().filter_map(|e| e.legend()).collect();
        assert_eq!(legends, vec!["PG", "R"]);
    }

    #[test]
    fn test_histogram_counts_and_bins() {
        let values = [1.0, 2.0, 2.0, 3.0, 3.0, 3.0];
        let options = RenderOptions::default().with_param("bins", Param::Int(3));
        let surface = render(&Table::default(), Selector::Values(&values), None, "hist", &options, None)
            .unwrap();

        let layer = &surface.layers()[0];
        let counts: Vec<f64> = rects(layer).iter().map(|r| r.0 .1).collect();
        assert_eq!(counts, vec![1.0, 2.0, 3.0]);
        assert_eq!(layer.elements.len(), 3);
        assert_eq!(surface.y_label(), Some("Count"));
        assert_eq!(surface.x_label(), None);
    }

    #[test]
    fn test_distribution_density_toggle() {
        let values = [1.0, 2.0, 2.0, 3.0, 3.0, 3.0];
        let with_kde = render(
            &Table::default(),
            Selector::Values(&values),
            None,
            "distribution",
            &RenderOptions::default(),
            None,
        )
        .unwrap();
        assert!(with_kde.layers()[0]
            .elements
            .iter()
            .any(|e| matches!(e, Element::Line { .. })));

        let options = RenderOptions::default().with_param("kde", Param::Bool(false));
        let without = render(&Table::default(), Selector::Values(&values), None, "dist", &options, None)
            .unwrap();
        assert!(without.layers()[0]
            .elements
            .iter()
            .all(|e| matches!(e, Element::Rect { .. })));
    }

    #[test]
    fn test_transform_applies_to_distribution_sample() {
        let options = RenderOptions {
            transform: Some(Transform::Log10),
            ..RenderOptions::default()
        };
        let data = Table::new(vec![Column::numeric("v", vec![1.0, 10.0, 100.0, 0.0])]).unwrap();
        let surface = render(&data, "v".into(), None, "histogram", &options, None).unwrap();

        // log10(0) is dropped
        let summary = Summary::of(&surface.layers()[0].sample).unwrap();
        assert_eq!(summary.count, 3);
        assert!((summary.max - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_box_per_category() {
        let surface = render(&movies(), "genre".into(), Some("revenue_adj"), "box", &RenderOptions::default(), None)
            .unwrap();
        assert_eq!(surface.x_axis().categories.as_ref().map(|c| c.len()), Some(3));
        assert_eq!(rects(&surface.layers()[0]).len(), 3);
        assert_eq!(surface.layers()[0].sample.len(), 4);
    }

    #[test]
    fn test_univariate_box_lies_down() {
        let surface = render(&movies(), "budget_adj".into(), None, "boxplot", &RenderOptions::default(), None)
            .unwrap();
        assert_eq!(
            surface.y_axis().categories,
            Some(vec!["budget_adj".to_string()])
        );
        let (tl, br) = rects(&surface.layers()[0])[0];
        assert_eq!((tl.1, br.1), (-0.25, 0.25));
    }

    #[test]
    fn test_violin_outline_and_median() {
        let surface = render(&movies(), "rating".into(), Some("budget_adj"), "violin", &RenderOptions::default(), None)
            .unwrap();
        let layer = &surface.layers()[0];
        let polygons = layer
            .elements
            .iter()
            .filter(|e| matches!(e, Element::Polygon { .. }))
            .count();
        assert_eq!(polygons, 2);
        assert_eq!(layer.elements.len(), 4);
    }

    #[test]
    fn test_heatmap_counts_and_means() {
        let data = movies();
        let counts = render(&data, "genre".into(), Some("rating"), "heatmap", &RenderOptions::default(), None)
            .unwrap();
        assert_eq!(rects(&counts.layers()[0]).len(), 4);
        assert_eq!(counts.y_axis().categories, Some(vec!["PG".to_string(), "R".to_string()]));

        let options = RenderOptions::default()
            .with_param("value", Param::Text("revenue_adj".into()))
            .with_param("annotate", Param::Bool(true));
        let means = render(&data, "genre".into(), Some("rating"), "heatmap", &options, None).unwrap();
        let texts: Vec<&str> = means.layers()[0]
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        // (Action, PG), (Comedy, R), (Drama, PG), (Drama, R)
        assert_eq!(texts, vec!["0", "500", "50", "900"]);
    }

    #[test]
    fn test_missing_y_is_an_error() {
        let err = render(&movies(), "budget_adj".into(), None, "scatter", &RenderOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, ChartError::Param(_)));
    }

    #[test]
    fn test_table_errors_pass_through() {
        let err = render(&movies(), "missing".into(), Some("revenue_adj"), "scatter", &RenderOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, ChartError::ColumnNotFound(ref c) if c == "missing"));

        let err = render(&movies(), "genre".into(), Some("revenue_adj"), "scatter", &RenderOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, ChartError::NotNumeric { .. }));
    }

    #[test]
    fn test_contrasting_text() {
        assert_eq!(contrasting(RGBColor(0x44, 0x01, 0x54)), WHITE);
        assert_eq!(contrasting(RGBColor(0xfd, 0xe7, 0x25)), RGBColor(0, 0, 0));
    }

    fn runtimes() -> Table {
        Table::new(vec![
            Column::numeric("runtime", vec![100.0, 9.0, 10.0, 9.0]),
            Column::numeric("revenue_adj", vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_numeric_categories_sort_by_value() {
        let expected = Some(vec!["9".to_string(), "10".to_string(), "100".to_string()]);
        for kind in ["bar", "box", "violin"] {
            let surface = render(&runtimes(), "runtime".into(), Some("revenue_adj"), kind, &RenderOptions::default(), None)
                .unwrap();
            assert_eq!(surface.x_axis().categories, expected, "{}", kind);
        }

        let heatmap = render(&runtimes(), "revenue_adj".into(), Some("runtime"), "heatmap", &RenderOptions::default(), None)
            .unwrap();
        assert_eq!(heatmap.y_axis().categories, expected);
    }

    #[test]
    fn test_category_order_mixed_keys() {
        let keys = ["b", "100", "a", "9.5", "10"].map(String::from);
        assert_eq!(distinct(keys.iter()), vec!["9.5", "10", "100", "a", "b"]);
    }

    #[test]
    fn test_explicit_bins_are_honoured() {
        let values: Vec<f64> = (0..1000).map(f64::from).collect();
        let options = RenderOptions::default().with_param("bins", Param::Int(100));
        let surface = render(&Table::default(), Selector::Values(&values), None, "hist", &options, None)
            .unwrap();
        assert_eq!(rects(&surface.layers()[0]).len(), 100);

        let options = RenderOptions::default().with_param("bins", Param::Int(0));
        assert!(matches!(
            render(&Table::default(), Selector::Values(&values), None, "hist", &options, None),
            Err(ChartError::Param(_))
        ));
        let options = RenderOptions::default().with_param("bins", Param::Int(1_000_000));
        assert!(matches!(
            render(&Table::default(), Selector::Values(&values), None, "hist", &options, None),
            Err(ChartError::Param(_))
        ));
    }

    #[test]
    fn test_numeric_hue_uses_a_ramp() {
        let options = RenderOptions {
            hue: Some("runtime".to_string()),
            ..RenderOptions::default()
        };
        let surface = render(&runtimes(), "revenue_adj".into(), Some("revenue_adj"), "scatter", &options, None)
            .unwrap();

        let points: Vec<(&str, RGBColor)> = surface.layers()[0]
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::Points { style, legend: Some(l), .. } => Some((l.as_str(), style.color)),
                _ => None,
            })
            .collect();
        let viridis = ColorPalette::viridis();
        assert_eq!(
            points,
            vec![
                ("9", viridis.sample(0.0)),
                ("10", viridis.sample(1.0 / 91.0)),
                ("100", viridis.sample(1.0)),
            ]
        );
    }
}
