//! Display formatting for evaluated values.

use super::cell::Value;

/// Format a value for grid display. Errors render their short marker; the
/// full cause stays available through the value itself.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Empty => String::new(),
        Value::Int(n) => n.to_string(),
        Value::Num(n) => format_number(*n),
        Value::Bool(b) => b.to_string(),
        Value::Text(s) => s.clone(),
        Value::Seq(items) => {
            let parts: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Error(err) => err.marker().to_string(),
    }
}

/// Format a float: integral values print without a decimal point,
/// non-finite values print a marker.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "#NAN!".to_string();
    }
    if n.is_infinite() {
        return "#INF!".to_string();
    }
    if n == n.trunc() && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    n.to_string()
}

#[cfg(test)]
mod tests {
    use super::{format_number, format_value};
    use crate::engine::{CellError, Coord, Value};

    #[test]
    fn test_integral_floats_print_without_point() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[test]
    fn test_non_finite_markers() {
        assert_eq!(format_number(f64::NAN), "#NAN!");
        assert_eq!(format_number(f64::INFINITY), "#INF!");
    }

    #[test]
    fn test_error_values_render_their_marker() {
        let value = Value::Error(CellError::CircularReference {
            coord: Coord::new(0, 0, 0),
        });
        assert_eq!(format_value(&value), "#CYCLE!");
    }

    #[test]
    fn test_sequences_render_nested() {
        let value = Value::Seq(vec![
            Value::Int(1),
            Value::Seq(vec![Value::Int(2), Value::Int(3)]),
        ]);
        assert_eq!(format_value(&value), "[1, [2, 3]]");
    }
}
