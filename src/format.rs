//! Axis tick label formatting.

use serde::Deserialize;

/// How numeric tick labels are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickFormat {
    /// Scientific notation for very large or very small magnitudes, decimal otherwise.
    #[default]
    Auto,
    /// Always plain digits with thousands separators, never an exponent.
    Plain,
}

/// Format one tick value.
pub fn format_tick(value: f64, format: TickFormat) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    match format {
        TickFormat::Plain => format_plain(value),
        TickFormat::Auto => {
            let magnitude = value.abs();
            if magnitude >= 1e6 || (magnitude > 0.0 && magnitude < 1e-3) {
                format_scientific(value)
            } else {
                trim_decimal(value)
            }
        }
    }
}

fn format_scientific(value: f64) -> String {
    // Rust writes `1.5e8`; drop a redundant `.0` mantissa.
    let s = format!("{:.1e}", value);
    s.replace(".0e", "e")
}

fn trim_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        return format!("{:.0}", value);
    }
    let s = format!("{:.3}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn format_plain(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let abs = rounded.abs();

    let whole = abs.trunc() as u64;
    let mut digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    while digits.len() > 3 {
        let tail = digits.split_off(digits.len() - 3);
        grouped = format!(",{}{}", tail, grouped);
    }
    grouped = format!("{}{}", digits, grouped);

    let frac = abs - abs.trunc();
    if frac > 0.0 {
        let decimals = format!("{:.2}", frac);
        let decimals = decimals.trim_start_matches('0').trim_end_matches('0');
        grouped.push_str(decimals);
    }

    if negative && grouped != "0" {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_formatting() {
        assert_eq!(format_tick(0.0, TickFormat::Auto), "0");
        assert_eq!(format_tick(250.0, TickFormat::Auto), "250");
        assert_eq!(format_tick(2.5, TickFormat::Auto), "2.5");
        assert_eq!(format_tick(150_000_000.0, TickFormat::Auto), "1.5e8");
        assert_eq!(format_tick(1_000_000.0, TickFormat::Auto), "1e6");
        assert_eq!(format_tick(0.0001, TickFormat::Auto), "1e-4");
    }

    #[test]
    fn test_plain_formatting() {
        assert_eq!(format_tick(150_000_000.0, TickFormat::Plain), "150,000,000");
        assert_eq!(format_tick(999.0, TickFormat::Plain), "999");
        assert_eq!(format_tick(1000.0, TickFormat::Plain), "1,000");
        assert_eq!(format_tick(-2500.5, TickFormat::Plain), "-2,500.5");
        assert_eq!(format_tick(0.25, TickFormat::Plain), "0.25");
    }
}
