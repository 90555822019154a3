use crate::error::ChartError;
use std::fmt;
use std::str::FromStr;

/// The chart kinds the renderer can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Scatter,
    /// Histogram with an overlaid density curve.
    Distribution,
    Line,
    Bar,
    Histogram,
    Box,
    Violin,
    Heatmap,
}

impl ChartKind {
    pub const ALL: [ChartKind; 8] = [
        ChartKind::Scatter,
        ChartKind::Distribution,
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::Histogram,
        ChartKind::Box,
        ChartKind::Violin,
        ChartKind::Heatmap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Scatter => "scatter",
            ChartKind::Distribution => "distribution",
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Histogram => "histogram",
            ChartKind::Box => "box",
            ChartKind::Violin => "violin",
            ChartKind::Heatmap => "heatmap",
        }
    }

    /// Kinds that summarise a single value sequence (and accept a transform).
    pub fn is_distribution(&self) -> bool {
        matches!(
            self,
            ChartKind::Distribution | ChartKind::Histogram | ChartKind::Box | ChartKind::Violin
        )
    }

    /// Kinds that cannot be drawn without a `y` column.
    pub fn requires_y(&self) -> bool {
        matches!(
            self,
            ChartKind::Scatter | ChartKind::Line | ChartKind::Bar | ChartKind::Heatmap
        )
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scatter" => Ok(ChartKind::Scatter),
            "distribution" | "dist" => Ok(ChartKind::Distribution),
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            "histogram" | "hist" => Ok(ChartKind::Histogram),
            "box" | "boxplot" => Ok(ChartKind::Box),
            "violin" => Ok(ChartKind::Violin),
            "heatmap" => Ok(ChartKind::Heatmap),
            _ => Err(ChartError::InvalidKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_names() {
        for kind in ChartKind::ALL {
            assert_eq!(kind.name().parse::<ChartKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("dist".parse::<ChartKind>().unwrap(), ChartKind::Distribution);
        assert_eq!(" Hist ".parse::<ChartKind>().unwrap(), ChartKind::Histogram);
        assert_eq!("boxplot".parse::<ChartKind>().unwrap(), ChartKind::Box);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "pie".parse::<ChartKind>().unwrap_err();
        assert!(matches!(err, ChartError::InvalidKind(ref k) if k == "pie"));
        assert!(err.to_string().contains("Unknown chart kind"));
    }

    #[test]
    fn test_distribution_kinds() {
        assert!(ChartKind::Violin.is_distribution());
        assert!(!ChartKind::Scatter.is_distribution());
        assert!(ChartKind::Heatmap.requires_y());
        assert!(!ChartKind::Histogram.requires_y());
    }
}
