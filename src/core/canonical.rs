//! Canonical JSON encodings used for content addressing and artifacts.
//!
//! Key order is imposed explicitly so the output does not depend on which
//! map representation `serde_json` was built with.

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};
use std::io;

/// Return a copy of `value` with every object's keys in sorted order.
pub fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sorted(&map[key.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Compact formatter that escapes every non-ASCII character as `\uXXXX`.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units).iter() {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Sorted keys, `,`/`:` separators with no whitespace, ASCII-only output.
///
/// Two documents that are equal as JSON values always encode to the same
/// bytes.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter);
    sorted(value).serialize(&mut ser)?;
    Ok(buf)
}

/// Round `v` to `places` decimal digits, judged on its exact binary value
/// with ties to even.
///
/// Non-finite values and magnitudes past 1e15, which carry no digit below
/// the third decimal, come back unchanged.
pub fn round_decimal(v: f64, places: usize) -> f64 {
    if !v.is_finite() || v.abs() >= 1e15 {
        return v;
    }
    format!("{:.*}", places, v).parse().unwrap_or(v)
}

/// Two-space indented JSON with sorted keys, the on-disk artifact format.
pub fn pretty_sorted(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&sorted(value))
}
