//! Geometry helpers turning summary statistics into primitive shapes.

use crate::stats::BoxSummary;

/// Computed geometry for a single boxplot, expressed as primitive shapes
#[derive(Debug, Clone, PartialEq)]
pub struct BoxplotGeometry {
    pub lower_whisker: Vec<(f64, f64)>,
    pub upper_whisker: Vec<(f64, f64)>,
    pub min_cap: Vec<(f64, f64)>,
    pub max_cap: Vec<(f64, f64)>,
    pub box_tl: (f64, f64),
    pub box_br: (f64, f64),
    pub median_line: Vec<(f64, f64)>,
    pub outlier_points: Vec<(f64, f64)>,
}

/// Boxplot primitives centred on `pos`, drawn upright or lying on its side.
pub fn boxplot_geometry(
    pos: f64,
    width: f64,
    summary: &BoxSummary,
    is_vertical: bool,
) -> BoxplotGeometry {
    let half_width = width / 2.0;
    let cap_half = width * 0.2;
    let at = |p: f64, v: f64| if is_vertical { (p, v) } else { (v, p) };

    let BoxSummary {
        lower_whisker: min,
        q1,
        median,
        q3,
        upper_whisker: max,
        ..
    } = *summary;

    BoxplotGeometry {
        lower_whisker: vec![at(pos, min), at(pos, q1)],
        upper_whisker: vec![at(pos, q3), at(pos, max)],
        min_cap: vec![at(pos - cap_half, min), at(pos + cap_half, min)],
        max_cap: vec![at(pos - cap_half, max), at(pos + cap_half, max)],
        box_tl: at(pos - half_width, q3),
        box_br: at(pos + half_width, q1),
        median_line: vec![at(pos - half_width, median), at(pos + half_width, median)],
        outlier_points: summary.outliers.iter().map(|&v| at(pos, v)).collect(),
    }
}

/// Closed outline of a violin: the density mirrored either side of `pos`,
/// scaled so the widest point spans `width`.
pub fn violin_outline(
    pos: f64,
    width: f64,
    grid: &[f64],
    density: &[f64],
    is_vertical: bool,
) -> Vec<(f64, f64)> {
    let peak = density.iter().copied().fold(0.0, f64::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let half = width / 2.0;
    let at = |p: f64, v: f64| if is_vertical { (p, v) } else { (v, p) };

    let right = grid
        .iter()
        .zip(density)
        .map(|(&v, &d)| at(pos + d / peak * half, v));
    let left = grid
        .iter()
        .zip(density)
        .rev()
        .map(|(&v, &d)| at(pos - d / peak * half, v));
    right.chain(left).collect()
}

/// Side-by-side slot for series `series_idx` of `num_series` within a
/// category of total `width`: returns `(slot_width, centre_offset)`.
pub fn dodge(series_idx: usize, num_series: usize, width: f64) -> (f64, f64) {
    let num_series = num_series.max(1);
    let slot = width / num_series as f64;
    let offset = (series_idx as f64 - (num_series as f64 - 1.0) / 2.0) * slot;
    (slot, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::boxplot_summary;

    #[test]
    fn test_vertical_boxplot() {
        let summary = boxplot_summary(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
        let geom = boxplot_geometry(2.0, 0.5, &summary, true);

        assert_eq!(geom.box_tl, (1.75, summary.q3));
        assert_eq!(geom.box_br, (2.25, summary.q1));
        assert_eq!(geom.median_line[0].1, summary.median);
        assert_eq!(geom.outlier_points, vec![(2.0, 100.0)]);
    }

    #[test]
    fn test_horizontal_boxplot_swaps_axes() {
        let summary = boxplot_summary(&[1.0, 2.0, 3.0]).unwrap();
        let geom = boxplot_geometry(0.0, 0.5, &summary, false);

        assert_eq!(geom.lower_whisker, vec![(1.0, 0.0), (1.5, 0.0)]);
        assert_eq!(geom.box_tl, (summary.q3, -0.25));
    }

    #[test]
    fn test_violin_outline_is_symmetric() {
        let grid = [0.0, 1.0, 2.0];
        let density = [0.1, 0.4, 0.2];
        let outline = violin_outline(1.0, 0.8, &grid, &density, true);

        assert_eq!(outline.len(), 6);
        assert!((outline[1].0 - 1.4).abs() < 1e-12);
        assert!((outline[4].0 - 0.6).abs() < 1e-12);
        assert_eq!(outline[1].1, outline[4].1);
        assert!(violin_outline(0.0, 0.8, &grid, &[0.0; 3], true).is_empty());
    }

    #[test]
    fn test_dodge_offsets() {
        assert_eq!(dodge(0, 1, 0.8), (0.8, 0.0));
        let (slot, first) = dodge(0, 2, 0.8);
        let (_, second) = dodge(1, 2, 0.8);
        assert_eq!(slot, 0.4);
        assert!((first + 0.2).abs() < 1e-12);
        assert!((second - 0.2).abs() < 1e-12);
    }
}
