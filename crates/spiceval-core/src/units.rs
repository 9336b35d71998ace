//! SPICE numeric literals: magnitude suffixes, units and number formatting.
//!
//! A literal has the shape `[+|-]digits[.digits][(e|E|d|D)[+|-]digits][suffix][unit]`.
//! The suffix scales the mantissa by a power of ten:
//!
//! | suffix | scale   |
//! |--------|---------|
//! | `t`    | 1e12    |
//! | `g`    | 1e9     |
//! | `meg`  | 1e6     |
//! | `k`    | 1e3     |
//! | `m`    | 1e-3    |
//! | `mil`  | 25.4e-6 |
//! | `u`    | 1e-6    |
//! | `n`    | 1e-9    |
//! | `p`    | 1e-12   |
//! | `f`    | 1e-15   |
//! | `a`    | 1e-18   |
//!
//! Suffixes are case-insensitive, and `meg`/`mil` win over `m`. Anything
//! alphabetic after the suffix is kept as a free-form unit string, so `1farad`
//! is one femto-"arad" exactly like every other SPICE.

/// Micrometres per mil; the `mil` suffix scales by `MIL_SCALE * 1e-6`.
pub const MIL_SCALE: f64 = 25.4;

/// Which characters may follow a number as its unit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitChars {
    /// Letters, digits and `_` only; used inside expressions where `/`, `-`
    /// and `^` are operators.
    #[default]
    Word,
    /// Also accepts the separators `/`, `.`, `-` and `^` (`m/s`, `V-s`).
    Free,
}

/// A successfully scanned numeric literal.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberScan {
    /// Scaled value.
    pub value: f64,
    /// Normalized trailing unit, if any.
    pub unit: Option<String>,
    /// Number of bytes consumed from the input.
    pub len: usize,
}

/// Scan a numeric literal at the start of `text`.
///
/// Returns `None` when the text does not start with a number; a lone sign is
/// never a number. With `whole` set, the literal (including its unit) must
/// cover the entire input.
pub fn scan_number(text: &str, whole: bool) -> Option<NumberScan> {
    scan_number_with(text, whole, UnitChars::Free)
}

/// [`scan_number`] with an explicit unit character set.
pub fn scan_number_with(text: &str, whole: bool, units: UnitChars) -> Option<NumberScan> {
    let bytes = text.as_bytes();
    let mut pos = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let starts_number = match bytes.get(pos) {
        Some(c) if c.is_ascii_digit() => true,
        Some(b'.') => bytes.get(pos + 1).is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    };
    if !starts_number {
        return None;
    }

    // Digits are collected as text and converted once, with the decimal
    // exponent folded in, so the result is correctly rounded.
    let mut digits = String::new();
    let mut exponent: i32 = 0;

    while let Some(&c) = bytes.get(pos).filter(|c| c.is_ascii_digit()) {
        digits.push(char::from(c));
        pos += 1;
    }
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        while let Some(&c) = bytes.get(pos).filter(|c| c.is_ascii_digit()) {
            digits.push(char::from(c));
            exponent = exponent.saturating_sub(1);
            pos += 1;
        }
    }

    // The exponent letter only counts when digits follow it.
    if let Some(b'e' | b'E' | b'd' | b'D') = bytes.get(pos) {
        let mut look = pos + 1;
        let exp_negative = match bytes.get(look) {
            Some(b'-') => {
                look += 1;
                true
            }
            Some(b'+') => {
                look += 1;
                false
            }
            _ => false,
        };
        if bytes.get(look).is_some_and(|c| c.is_ascii_digit()) {
            let mut explicit: i32 = 0;
            while let Some(c) = bytes.get(look).filter(|c| c.is_ascii_digit()) {
                explicit = explicit.saturating_mul(10).saturating_add(i32::from(c - b'0'));
                look += 1;
            }
            exponent = exponent.saturating_add(if exp_negative { -explicit } else { explicit });
            pos = look;
        }
    }

    let mut factor = 1.0;
    if let Some((shift, scale, len)) = magnitude_suffix(&bytes[pos..]) {
        exponent = exponent.saturating_add(shift);
        factor = scale;
        pos += len;
    }

    let unit_len = unit_length(&bytes[pos..], units);
    let unit = (unit_len > 0).then(|| normalize_unit(&text[pos..pos + unit_len]));
    pos += unit_len;

    if whole && pos != bytes.len() {
        return None;
    }

    let mut value = decimal_to_f64(&digits, exponent)? * factor;
    if negative {
        value = -value;
    }

    Some(NumberScan {
        value,
        unit,
        len: pos,
    })
}

/// Parse a complete SPICE value such as `4.7k`, `1.5MEG` or `10uF`.
pub fn parse_value(s: &str) -> Option<f64> {
    scan_number(s.trim(), true).map(|n| n.value)
}

/// Match a magnitude suffix, returning (power of ten, extra factor, length).
fn magnitude_suffix(rest: &[u8]) -> Option<(i32, f64, usize)> {
    let lower = |i: usize| rest.get(i).map(u8::to_ascii_lowercase);
    match lower(0)? {
        b'm' if lower(1) == Some(b'e') && lower(2) == Some(b'g') => Some((6, 1.0, 3)),
        b'm' if lower(1) == Some(b'i') && lower(2) == Some(b'l') => Some((-6, MIL_SCALE, 3)),
        b'm' => Some((-3, 1.0, 1)),
        b't' => Some((12, 1.0, 1)),
        b'g' => Some((9, 1.0, 1)),
        b'k' => Some((3, 1.0, 1)),
        b'u' => Some((-6, 1.0, 1)),
        b'n' => Some((-9, 1.0, 1)),
        b'p' => Some((-12, 1.0, 1)),
        b'f' => Some((-15, 1.0, 1)),
        b'a' => Some((-18, 1.0, 1)),
        _ => None,
    }
}

fn unit_length(rest: &[u8], units: UnitChars) -> usize {
    if !rest.first().is_some_and(u8::is_ascii_alphabetic) {
        return 0;
    }
    rest.iter()
        .take_while(|&&c| {
            c.is_ascii_alphanumeric()
                || c == b'_'
                || (units == UnitChars::Free && matches!(c, b'/' | b'.' | b'-' | b'^'))
        })
        .count()
}

/// Unit concatenation separators become `*`: `V-s` and `kg.m` read as products.
fn normalize_unit(unit: &str) -> String {
    unit.chars()
        .map(|c| match c {
            '.' | '-' | '_' => '*',
            other => other,
        })
        .collect()
}

/// `digits * 10^exponent`, correctly rounded.
fn decimal_to_f64(digits: &str, exponent: i32) -> Option<f64> {
    format!("{digits}e{exponent}").parse().ok()
}

/// Format a number the way C's `%.15g` does: enough digits to survive a
/// round trip through the scanner, no trailing zeros.
pub fn format_number(value: f64) -> String {
    format_general(value, 15)
}

/// `%.<precision>g` formatting.
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= precision as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.unsigned_abs())
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Shortest text that scans back to exactly `value`.
pub fn format_literal(value: f64) -> String {
    let text = format!("{value:?}");
    match text.strip_suffix(".0") {
        Some(trimmed) => trimmed.to_string(),
        None => text,
    }
}

/// Format a value with the SPICE magnitude suffix that keeps the mantissa in
/// `[1, 1000)`.
pub fn format_value(value: f64) -> String {
    let abs_value = value.abs();

    let (scaled, suffix) = if abs_value >= 1e12 {
        (value / 1e12, "T")
    } else if abs_value >= 1e9 {
        (value / 1e9, "G")
    } else if abs_value >= 1e6 {
        (value / 1e6, "Meg")
    } else if abs_value >= 1e3 {
        (value / 1e3, "k")
    } else if abs_value >= 1.0 {
        (value, "")
    } else if abs_value >= 1e-3 {
        (value * 1e3, "m")
    } else if abs_value >= 1e-6 {
        (value * 1e6, "u")
    } else if abs_value >= 1e-9 {
        (value * 1e9, "n")
    } else if abs_value >= 1e-12 {
        (value * 1e12, "p")
    } else if abs_value >= 1e-15 {
        (value * 1e15, "f")
    } else if abs_value >= 1e-18 {
        (value * 1e18, "a")
    } else if abs_value == 0.0 {
        (0.0, "")
    } else {
        (value, "")
    };

    format!("{:.4}{}", scaled, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|v| (v - b).abs() < b.abs() * 1e-12 + 1e-30)
    }

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(parse_value("1.5"), Some(1.5));
        assert_eq!(parse_value("-2.5"), Some(-2.5));
        assert_eq!(parse_value("1e-3"), Some(1e-3));
        assert_eq!(parse_value(".5"), Some(0.5));
        assert_eq!(parse_value("3."), Some(3.0));
    }

    #[test]
    fn test_parse_with_suffix() {
        assert!(approx_eq(parse_value("10k"), 1e4));
        assert!(approx_eq(parse_value("4.7K"), 4.7e3));
        assert!(approx_eq(parse_value("10M"), 10e-3));
        assert!(approx_eq(parse_value("1.5MEG"), 1.5e6));
        assert!(approx_eq(parse_value("100n"), 100e-9));
        assert!(approx_eq(parse_value("1u"), 1e-6));
        assert!(approx_eq(parse_value("10p"), 10e-12));
        assert!(approx_eq(parse_value("2a"), 2e-18));
        assert!(approx_eq(parse_value("3t"), 3e12));
        assert!(approx_eq(parse_value("1g"), 1e9));
    }

    #[test]
    fn test_mil_scale() {
        assert!(approx_eq(parse_value("5mil"), 5.0 * 25.4e-6));
        assert!(approx_eq(parse_value("5MIL"), 5.0 * 25.4e-6));
    }

    #[test]
    fn test_m_mil_meg_disambiguation() {
        // meg and mil are matched before the single-letter milli.
        assert!(approx_eq(parse_value("2mega"), 2e6));
        assert!(approx_eq(parse_value("2mils"), 2.0 * 25.4e-6));
        assert!(approx_eq(parse_value("2me"), 2e-3));
        assert!(approx_eq(parse_value("2mi"), 2e-3));
        assert!(approx_eq(parse_value("2meter"), 2e-3));

        let scan = scan_number("2mega", true).unwrap();
        assert_eq!(scan.unit.as_deref(), Some("a"));
        let scan = scan_number("2meter", true).unwrap();
        assert_eq!(scan.unit.as_deref(), Some("eter"));
    }

    #[test]
    fn test_fortran_exponent() {
        assert!(approx_eq(parse_value("1d3"), 1e3));
        assert!(approx_eq(parse_value("2.5D-2"), 2.5e-2));
    }

    #[test]
    fn test_exponent_needs_digits() {
        // A dangling `e` is a unit, not an exponent.
        let scan = scan_number("5e", true).unwrap();
        assert_eq!(scan.value, 5.0);
        assert_eq!(scan.unit.as_deref(), Some("e"));

        let scan = scan_number_with("5e+x", false, UnitChars::Word).unwrap();
        assert_eq!(scan.len, 2);
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_value("bad"), None);
        assert_eq!(parse_value("-"), None);
        assert_eq!(parse_value("+"), None);
        assert_eq!(parse_value("."), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("-.x"), None);
    }

    #[test]
    fn test_whole_rejects_trailing_garbage() {
        assert!(scan_number("10k+1", true).is_none());
        let scan = scan_number("10k+1", false).unwrap();
        assert_eq!(scan.len, 3);
        assert!(approx_eq(Some(scan.value), 1e4));
    }

    #[test]
    fn test_unit_capture_and_normalization() {
        let scan = scan_number("10uF", true).unwrap();
        assert!(approx_eq(Some(scan.value), 10e-6));
        assert_eq!(scan.unit.as_deref(), Some("F"));

        let scan = scan_number("3V-s", true).unwrap();
        assert_eq!(scan.unit.as_deref(), Some("V*s"));

        let scan = scan_number("1kg.m/s^2", true).unwrap();
        assert!(approx_eq(Some(scan.value), 1e3));
        assert_eq!(scan.unit.as_deref(), Some("g*m/s^2"));

        // Word units stop at operator characters.
        let scan = scan_number_with("3V-s", false, UnitChars::Word).unwrap();
        assert_eq!(scan.len, 2);
        assert_eq!(scan.unit.as_deref(), Some("V"));
    }

    #[test]
    fn test_large_exponents_are_exact() {
        assert_eq!(parse_value("1e30"), Some(1e30));
        assert_eq!(parse_value("1e-30"), Some(1e-30));
        assert_eq!(parse_value("1e20meg"), Some(1e26));
        assert_eq!(parse_value("0.1"), Some(0.1));
        assert_eq!(parse_value("0.1e-27"), Some(1e-28));
        assert_eq!(parse_value("4.35e-21"), Some(4.35e-21));
        assert_eq!(parse_value("1e400"), Some(f64::INFINITY));
        assert_eq!(parse_value("1e-400"), Some(0.0));
    }

    #[test]
    fn test_scan_matches_std_parse() {
        // Deterministic xorshift so failures reproduce.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        for _ in 0..5000 {
            let int = next() % 1000;
            let frac = next() % 10_000;
            let exp = (next() % 700) as i32 - 350;
            let text = format!("{int}.{frac}e{exp}");
            let expected: f64 = text.parse().unwrap();
            assert_eq!(parse_value(&text), Some(expected), "{text}");

            let printed = format_literal(expected);
            assert_eq!(parse_value(&printed), Some(expected), "{text} printed as {printed}");
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(78.53975), "78.53975");
        assert_eq!(format_number(3.14159 * 5.0 * 5.0), "78.53975");
        assert_eq!(format_number(1.5e6), "1500000");
        assert_eq!(format_number(1e-5), "1e-05");
        assert_eq!(format_number(1e20), "1e+20");
        assert_eq!(format_number(-0.25), "-0.25");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn test_format_literal_round_trips() {
        for v in [1.0, 0.1, 1.5e6, 1e-20, 123.456, 6.02e23] {
            let text = format_literal(v);
            assert_eq!(parse_value(&text), Some(v), "{text}");
        }
        assert_eq!(format_literal(14.0), "14");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1000.0), "1.0000k");
        assert_eq!(format_value(0.001), "1.0000m");
        assert_eq!(format_value(1e-9), "1.0000n");
        assert_eq!(format_value(2.5e6), "2.5000Meg");
    }
}
