//! ASCII decimal rendering and parameter parsing.
//!
//! This module converts binary values into the decimal text carried in
//! gateway replies, and parses decimal command parameters back into scaled
//! integers. All functions are pure and allocation-free.
//!
//! ## Digit correction table
//!
//! Rendering does not divide the whole value by ten repeatedly. The value is
//! split into hexadecimal nibbles `n3 n2 n1 n0` and each nibble's weight is
//! expanded into decimal digits:
//!
//! | Nibble weight | Thousands | Hundreds | Tens | Ones |
//! |---------------|-----------|----------|------|------|
//! | 16^3 = 4096   |         4 |        0 |    9 |    6 |
//! | 16^2 = 256    |           |        2 |    5 |    6 |
//! | 16^1 = 16     |           |          |    1 |    6 |
//! | 16^0 = 1      |           |          |      |    1 |
//!
//! The columns are summed from the ones digit upward, carrying `q = d / 10`
//! at each step. The extended formatter adds a fifth nibble `n4` worth
//! 65536 = 6·10^4 + 5·10^3 + 5·10^2 + 3·10 + 6.
//!
//! ## Functions
//!
//! - [`format_decimal`]: shortest decimal text of a `u16`
//! - [`format_extended_decimal`]: 20-bit value with an optional decimal point
//! - [`parse_scaled_parameter`]: decimal parameter → integer scaled by 10^n

use heapless::Vec;

use crate::consts::{CR, PARAM_START};

/// Longest output of [`format_decimal`] (`65535`).
pub const DECIMAL_LEN: usize = 5;

/// Longest output of [`format_extended_decimal`] (`0.` plus seven digits).
pub const EXTENDED_DECIMAL_LEN: usize = 9;

/// Largest accepted `decimal_places` argument.
pub const MAX_DECIMAL_PLACES: u8 = 7;

fn digit(d: u16) -> u8 {
    b'0' + d as u8
}

/// Renders `value` as the shortest ASCII decimal string.
///
/// Leading zeros are suppressed, but at least one digit is always produced,
/// so `0` renders as `"0"`.
pub fn format_decimal(value: u16) -> Vec<u8, DECIMAL_LEN> {
    let n0 = value & 0xF;
    let n1 = (value >> 4) & 0xF;
    let n2 = (value >> 8) & 0xF;
    let n3 = (value >> 12) & 0xF;

    let mut d0 = 6 * (n3 + n2 + n1) + n0;
    let mut q = d0 / 10;
    d0 %= 10;

    let mut d1 = q + 9 * n3 + 5 * n2 + n1;
    q = d1 / 10;
    d1 %= 10;

    let mut d2 = q + 2 * n2;
    q = d2 / 10;
    d2 %= 10;

    let mut d3 = q + 4 * n3;
    q = d3 / 10;
    d3 %= 10;

    let d4 = q;

    let mut out = Vec::new();
    let mut leading = true;
    for d in [d4, d3, d2, d1] {
        if d != 0 || !leading {
            leading = false;
            let _ = out.push(digit(d));
        }
    }
    let _ = out.push(digit(d0));
    out
}

/// Renders the 20-bit value `(high & 0x0F) << 16 | low` as ASCII decimal.
///
/// `decimal_places` selects where a decimal point is inserted, counted from
/// the right: `0` prints an integer, `2` prints `123.45` for `12345`. Digits
/// left of the point are printed without leading zeros, except that a point
/// is always preceded by at least one digit (`0.05`). `7` prints a literal
/// `0.` followed by all seven digit positions, for values below one.
/// Values above 7 are treated as 7.
///
/// Only the low nibble of `high` contributes, so the largest representable
/// value is 1 048 575.
pub fn format_extended_decimal(
    high: u8,
    low: u16,
    decimal_places: u8,
) -> Vec<u8, EXTENDED_DECIMAL_LEN> {
    let places = decimal_places.min(MAX_DECIMAL_PLACES);

    let n0 = low & 0xF;
    let n1 = (low >> 4) & 0xF;
    let n2 = (low >> 8) & 0xF;
    let n3 = (low >> 12) & 0xF;
    let n4 = u16::from(high & 0xF);

    let mut d0 = 6 * (n4 + n3 + n2 + n1) + n0;
    let mut q = d0 / 10;
    d0 %= 10;

    let mut d1 = q + 3 * n4 + 9 * n3 + 5 * n2 + n1;
    q = d1 / 10;
    d1 %= 10;

    let mut d2 = q + 5 * n4 + 2 * n2;
    q = d2 / 10;
    d2 %= 10;

    let mut d3 = q + 5 * n4 + 4 * n3;
    q = d3 / 10;
    d3 %= 10;

    let mut d4 = q + 6 * n4;
    q = d4 / 10;
    d4 %= 10;

    let mut d5 = q;
    q = d5 / 10;
    d5 %= 10;

    let d6 = q;

    let mut out = Vec::new();
    if places == 7 {
        let _ = out.extend_from_slice(b"0.");
    }
    // Most significant first; position `p` is the power of ten of the digit.
    let digits = [d6, d5, d4, d3, d2, d1];
    let mut leading = true;
    for (i, &d) in digits.iter().enumerate() {
        let p = (6 - i) as u8;
        if d != 0 || !leading || places >= p {
            leading = false;
            let _ = out.push(digit(d));
        }
        if places == p {
            let _ = out.push(b'.');
        }
    }
    let _ = out.push(digit(d0));
    out
}

/// Parses the decimal parameter of a command frame as a scaled integer.
///
/// Scanning starts at `PARAM_START + offset` (just past `ID C C :`) and stops
/// at the CR terminator or the end of `frame`. The digits, with at most one
/// `.`, are accumulated as an integer equal to the parameter multiplied by
/// `10^fractional_digits`: fractional digits beyond that are ignored and
/// missing ones are padded with zeros.
///
/// Returns `None` when no digit precedes the end of the scan, when any other
/// character is found, or when the result does not fit in a `u32`.
///
/// # Example
/// ```rust
/// use samewire::codec::parse_scaled_parameter;
///
/// assert_eq!(parse_scaled_parameter(b"~XX:12.5\r", 0, 1), Some(125));
/// assert_eq!(parse_scaled_parameter(b"~XX:12\r", 0, 2), Some(1200));
/// ```
pub fn parse_scaled_parameter(frame: &[u8], offset: usize, fractional_digits: u8) -> Option<u32> {
    let text = frame.get(PARAM_START + offset..)?;
    let mut value: u32 = 0;
    let mut seen_digit = false;
    let mut seen_point = false;
    let mut fraction: u8 = 0;

    for &b in text {
        match b {
            CR => break,
            b'.' if !seen_point => seen_point = true,
            b'0'..=b'9' => {
                if seen_point {
                    if fraction >= fractional_digits {
                        break;
                    }
                    fraction += 1;
                }
                value = value.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
                seen_digit = true;
            }
            _ => return None,
        }
    }

    if !seen_digit {
        return None;
    }
    while fraction < fractional_digits {
        value = value.checked_mul(10)?;
        fraction += 1;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    fn text<const N: usize>(v: &Vec<u8, N>) -> &str {
        core::str::from_utf8(v).unwrap()
    }

    #[test]
    fn test_format_decimal_matches_display_for_every_u16() {
        for v in 0..=u16::MAX {
            assert_eq!(text(&format_decimal(v)), format!("{}", v), "value {}", v);
        }
    }

    #[test]
    fn test_format_decimal_edges() {
        assert_eq!(text(&format_decimal(0)), "0");
        assert_eq!(text(&format_decimal(10)), "10");
        assert_eq!(text(&format_decimal(1000)), "1000");
        assert_eq!(text(&format_decimal(65535)), "65535");
    }

    #[test]
    fn test_format_extended_decimal_integers_across_20_bits() {
        let mut v: u32 = 0;
        while v <= 0xF_FFFF {
            let out = format_extended_decimal((v >> 16) as u8, v as u16, 0);
            assert_eq!(text(&out), format!("{}", v), "value {}", v);
            v += 97;
        }
        let out = format_extended_decimal(0x0F, 0xFFFF, 0);
        assert_eq!(text(&out), "1048575");
    }

    #[test]
    fn test_format_extended_decimal_ignores_high_nibble_of_extension() {
        assert_eq!(text(&format_extended_decimal(0x10, 1000, 0)), "1000");
    }

    #[test]
    fn test_format_extended_decimal_places() {
        assert_eq!(text(&format_extended_decimal(0, 12345, 2)), "123.45");
        assert_eq!(text(&format_extended_decimal(0, 12345, 5)), "0.12345");
        assert_eq!(text(&format_extended_decimal(0, 5, 2)), "0.05");
        assert_eq!(text(&format_extended_decimal(0, 5, 1)), "0.5");
        assert_eq!(text(&format_extended_decimal(0, 0, 0)), "0");
        assert_eq!(text(&format_extended_decimal(0x0F, 0x4240, 6)), "1.000000");
    }

    #[test]
    fn test_format_extended_decimal_seven_places_prefixes_zero_point() {
        assert_eq!(text(&format_extended_decimal(0, 1234, 7)), "0.0001234");
        assert_eq!(text(&format_extended_decimal(0, 0, 7)), "0.0000000");
        assert_eq!(text(&format_extended_decimal(0, 0, 9)), "0.0000000");
    }

    #[test]
    fn test_parse_scaled_parameter_fraction_and_padding() {
        assert_eq!(parse_scaled_parameter(b"~RD:12.5\r", 0, 1), Some(125));
        assert_eq!(parse_scaled_parameter(b"~RD:12\r", 0, 2), Some(1200));
        assert_eq!(parse_scaled_parameter(b"~RD:12.3456\r", 0, 2), Some(1234));
        assert_eq!(parse_scaled_parameter(b"~RD:12.5\r", 0, 0), Some(12));
        assert_eq!(parse_scaled_parameter(b"~RD:.5\r", 0, 1), Some(5));
    }

    #[test]
    fn test_parse_scaled_parameter_integer_and_offset() {
        assert_eq!(parse_scaled_parameter(b"~RD:300000\r", 0, 0), Some(300_000));
        assert_eq!(parse_scaled_parameter(b"~XY:A42\r", 1, 0), Some(42));
        assert_eq!(parse_scaled_parameter(b"~RD:7", 0, 0), Some(7));
    }

    #[test]
    fn test_parse_scaled_parameter_rejects_bad_input() {
        assert_eq!(parse_scaled_parameter(b"~RD:\r", 0, 0), None);
        assert_eq!(parse_scaled_parameter(b"~RD\r", 0, 0), None);
        assert_eq!(parse_scaled_parameter(b"~RD:1x\r", 0, 0), None);
        assert_eq!(parse_scaled_parameter(b"~RD:1.2.3\r", 0, 3), None);
        assert_eq!(parse_scaled_parameter(b"~RD:99999999999\r", 0, 0), None);
    }
}
