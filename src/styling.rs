//! Cell styling for the normalized table.
//!
//! Values that cannot be compared (missing, NaN) get no style instead of
//! failing the render.

pub const NEGATIVE_STYLE: &str = "color:red;";
pub const POSITIVE_STYLE: &str = "color:green;";

pub fn style_negative(value: Option<f64>) -> Option<&'static str> {
    match value {
        Some(v) if v < 0.0 => Some(NEGATIVE_STYLE),
        _ => None,
    }
}

pub fn style_positive(value: Option<f64>) -> Option<&'static str> {
    match value {
        Some(v) if v > 0.0 => Some(POSITIVE_STYLE),
        _ => None,
    }
}

/// Negative wins over positive; zero and blanks stay plain.
pub fn cell_style(value: Option<f64>) -> Option<&'static str> {
    style_negative(value).or_else(|| style_positive(value))
}

/// Percent with one decimal, blank for missing values.
pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1}%", v * 100.0),
        _ => String::new(),
    }
}
