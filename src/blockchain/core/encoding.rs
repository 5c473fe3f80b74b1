//! Text forms folded into block digests
//!
//! Ledger digests cover a decimal timestamp that always carries a fraction
//! or an exponent, followed by the payload as JSON with spaced separators
//! and `\uXXXX` escapes for everything outside printable ASCII. Existing
//! ledgers were hashed over exactly these bytes.

use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Shortest round-trip decimal form of `value`.
///
/// Integral values keep a trailing `.0`; magnitudes below `1e-4` or from
/// `1e16` upwards use exponent notation with a signed, two-digit exponent.
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sci = format!("{:e}", value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        let mut plain = value.to_string();
        if !plain.contains('.') {
            plain.push_str(".0");
        }
        plain
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// Compact JSON with `", "` / `": "` separators and ASCII-only strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    // Quotes, backslashes and control characters arrive through
    // `write_char_escape`; fragments hold everything else.
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for ch in fragment.chars() {
            if (' '..='~').contains(&ch) {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Serialize `value` with [`SpacedAsciiFormatter`].
pub fn to_spaced_ascii_json<T>(value: &T) -> serde_json::Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedAsciiFormatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_float_repr_keeps_fraction() {
        assert_eq!(float_repr(1700000000.0), "1700000000.0");
        assert_eq!(float_repr(1700000000.123456), "1700000000.123456");
        assert_eq!(float_repr(123.456), "123.456");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(0.0), "0.0");
        assert_eq!(float_repr(-0.0), "-0.0");
    }

    #[test]
    fn test_float_repr_exponent_form() {
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1e22), "1e+22");
        assert_eq!(float_repr(1.5e-5), "1.5e-05");
        assert_eq!(float_repr(-2.5e-7), "-2.5e-07");
    }

    #[test]
    fn test_spaced_separators() {
        let bytes = to_spaced_ascii_json(&json!({"username": "alice", "tags": [1, 2]})).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"tags": [1, 2], "username": "alice"}"#
        );
    }

    #[test]
    fn test_escapes_match_ledger_form() {
        let value = json!("a\"b\\\n\u{1}\u{7f}\u{1F600}");
        let bytes = to_spaced_ascii_json(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#""a\"b\\\n\u0001\u007f\ud83d\ude00""#
        );
    }
}
