//! Runtime values for the bytecode VM.
//!
//! A [`Value`] is a small `Copy` tagged union. Heap data (strings) is not
//! owned by the value: `Value::Obj` holds an [`ObjRef`] handle into the
//! [`Heap`], which keeps every object alive until the VM is torn down.

use std::fmt;

use super::object::{Heap, Obj, ObjRef};

/// Significant digits used when rendering numbers (the `%g` default).
const SIGNIFICANT_DIGITS: usize = 6;

/// A runtime value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// The nil literal
    Nil,
    /// Boolean value
    Bool(bool),
    /// Double-precision number
    Number(f64),
    /// Reference to a heap object
    Obj(ObjRef),
}

impl Value {
    pub fn as_obj(&self) -> Option<ObjRef> {
        match self {
            Value::Obj(r) => Some(*r),
            _ => None,
        }
    }

    /// Nil and false are falsey; everything else, including `0`, is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Render this value against the heap that owns its objects.
    pub fn display<'a>(&self, heap: &'a Heap) -> ValueDisplay<'a> {
        ValueDisplay { value: *self, heap }
    }
}

/// Tag-sensitive equality. Objects compare by identity, which is content
/// equality for strings because every string is interned.
pub fn values_equal(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Obj(x), Value::Obj(y)) => x == y,
        _ => false,
    }
}

/// Format a number the way C's `%g` does: six significant digits, trailing
/// zeros stripped, exponent form outside `1e-4 <= |n| < 1e6`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let sci = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, n);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Display adapter returned by [`Value::display`].
pub struct ValueDisplay<'a> {
    value: Value,
    heap: &'a Heap,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(n)),
            Value::Obj(r) => match self.heap.get(r) {
                Some(Obj::String(s)) => write!(f, "{}", s.as_str_lossy()),
                None => write!(f, "<freed object>"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falsey() {
        assert!(Value::Nil.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Number(0.0).is_falsey());
    }

    #[test]
    fn test_values_equal_is_tag_sensitive() {
        assert!(values_equal(Value::Nil, Value::Nil));
        assert!(values_equal(Value::Bool(true), Value::Bool(true)));
        assert!(!values_equal(Value::Number(0.0), Value::Bool(false)));
        assert!(!values_equal(Value::Nil, Value::Bool(false)));
        assert!(values_equal(Value::Number(2.5), Value::Number(2.5)));
        assert!(!values_equal(Value::Number(f64::NAN), Value::Number(f64::NAN)));
    }

    #[test]
    fn test_format_number_matches_printf_g() {
        assert_eq!(format_number(1.2), "1.2");
        assert_eq!(format_number(1.2 + 3.4), "4.6");
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(100000.0), "100000");
        assert_eq!(format_number(1000000.0), "1e+06");
        assert_eq!(format_number(123456789.0), "1.23457e+08");
        assert_eq!(format_number(0.0001), "0.0001");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn test_format_number_specials() {
        assert_eq!(format_number(f64::INFINITY), "inf");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_number(f64::NAN), "nan");
    }

    #[test]
    fn test_display_literals() {
        let heap = Heap::new();
        assert_eq!(Value::Nil.display(&heap).to_string(), "nil");
        assert_eq!(Value::Bool(true).display(&heap).to_string(), "true");
        assert_eq!(Value::Bool(false).display(&heap).to_string(), "false");
        assert_eq!(Value::Number(7.0).display(&heap).to_string(), "7");
    }

    #[test]
    fn test_display_string_is_unquoted() {
        let mut heap = Heap::new();
        let s = heap.copy_string(b"hello world");
        assert_eq!(Value::Obj(s).display(&heap).to_string(), "hello world");
    }
}
