//! Descriptive statistics and the density/binning helpers behind the
//! distribution charts.

/// Resolution of KDE curves.
pub const KDE_GRID_POINTS: usize = 128;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Linearly interpolated percentile of already sorted data, `p` in 0..=1.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted_data[0];
    }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

/// Count, mean, spread and quartiles of a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Option<Summary> {
        let data = sorted(values);
        let (&min, &max) = (data.first()?, data.last()?);
        Some(Summary {
            count: data.len(),
            mean: mean(&data)?,
            std: std_dev(&data),
            min,
            q1: percentile(&data, 0.25),
            median: percentile(&data, 0.5),
            q3: percentile(&data, 0.75),
            max,
        })
    }
}

/// Tukey box: quartiles, 1.5 IQR whiskers and the points beyond them.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

pub fn boxplot_summary(values: &[f64]) -> Option<BoxSummary> {
    if values.is_empty() {
        return None;
    }
    let ys = sorted(values);

    let q1 = percentile(&ys, 0.25);
    let median = percentile(&ys, 0.50);
    let q3 = percentile(&ys, 0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let lower_whisker = ys
        .iter()
        .copied()
        .find(|&v| v >= lower_fence)
        .unwrap_or(q1);
    let upper_whisker = ys
        .iter()
        .rev()
        .copied()
        .find(|&v| v <= upper_fence)
        .unwrap_or(q3);

    let outliers = ys
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    Some(BoxSummary {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

/// One histogram bin, `[lower, upper)` except the last which is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl Bin {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Sturges' rule, clamped to a sane range.
pub fn sturges_bins(n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    let bins = (n as f64).log2().ceil() as usize + 1;
    bins.clamp(1, 50)
}

/// Equal-width binning over the sample's range.
pub fn bin(values: &[f64], bins: usize) -> Vec<Bin> {
    let bins = bins.max(1);
    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = values.iter().copied().fold(min, f64::max);

    let (start, width) = if max == min {
        (min - 0.5, 1.0 / bins as f64)
    } else {
        (min, (max - min) / bins as f64)
    };

    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lower: start + i as f64 * width,
            upper: start + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for &v in values {
        let idx = (((v - start) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }

    out
}

/// Silverman's rule of thumb for bandwidth selection
pub fn silverman_bandwidth(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if n < 2.0 {
        return 1.0;
    }

    let std_dev = std_dev(data).unwrap_or(0.0);

    // IQR-based estimate for robustness
    let sorted = sorted(data);
    let iqr = percentile(&sorted, 0.75) - percentile(&sorted, 0.25);

    // h = 0.9 * min(std, IQR/1.34) * n^(-1/5)
    let scale = if iqr > 0.0 { std_dev.min(iqr / 1.34) } else { std_dev };
    if scale <= 0.0 {
        return 1.0;
    }
    0.9 * scale * n.powf(-0.2)
}

fn gaussian_kernel(u: f64) -> f64 {
    const SQRT_2PI: f64 = 2.5066282746310002;
    (-0.5 * u * u).exp() / SQRT_2PI
}

/// Gaussian KDE evaluated on an even grid spanning the data +/- 3 bandwidths.
///
/// Returns `(grid, density)`; densities integrate to 1.
pub fn kde(data: &[f64], bandwidth: f64, grid_points: usize) -> (Vec<f64>, Vec<f64>) {
    let n = data.len() as f64;
    if data.is_empty() || grid_points < 2 {
        return (vec![], vec![]);
    }

    let min_y = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max_y = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let extend = 3.0 * bandwidth;
    let start = min_y - extend;
    let step = (max_y + extend - start) / (grid_points - 1) as f64;

    let grid: Vec<f64> = (0..grid_points).map(|i| start + i as f64 * step).collect();
    let density = grid
        .iter()
        .map(|&y| {
            data.iter()
                .map(|&xi| gaussian_kernel((y - xi) / bandwidth))
                .sum::<f64>()
                / (n * bandwidth)
        })
        .collect();

    (grid, density)
}

/// Ordinary least-squares line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let n = xs.len() as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xx: f64 = xs.iter().map(|&x| x * x).sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(&x, &y)| x * y).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    Some(LinearFit { slope, intercept })
}

/// Pearson correlation coefficient; `None` when either side is constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }

    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}
