use std::fmt;

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use crate::error::{LineError, Result};

/// Wire text for a null value.
pub const NULL_LITERAL: &str = "(null)";

/// Fractional digits written for every float.
pub const FLOAT_PRECISION: usize = 10;

/// One protocol field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Bool(bool),
    Int(i32),
    Float(f64),
    Null,
}

/// The type a field is expected to have.
///
/// Fields on the wire are not self-describing; the reader always knows
/// which kind it is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Str,
    Bool,
    Int,
    Float,
}

impl ScalarKind {
    /// Value substituted when a field of this kind cannot be read.
    pub fn default_value(self) -> Scalar {
        match self {
            Self::Str => Scalar::Str(String::new()),
            Self::Bool => Scalar::Bool(false),
            Self::Int => Scalar::Int(0),
            Self::Float => Scalar::Float(0.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Scalar {
    /// The kind this value decodes as, `None` for null.
    pub fn kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Str(_) => Some(ScalarKind::Str),
            Self::Bool(_) => Some(ScalarKind::Bool),
            Self::Int(_) => Some(ScalarKind::Int),
            Self::Float(_) => Some(ScalarKind::Float),
            Self::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Take the string out, mapping null to the empty string.
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::Str(value) => Some(value),
            Self::Null => Some(String::new()),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Text of a value as it appears on the wire, without the terminator.
pub fn encode_line(value: &Scalar) -> String {
    match value {
        Scalar::Str(text) => text.replace('\n', "\r"),
        Scalar::Bool(true) => "true".to_string(),
        Scalar::Bool(false) => "false".to_string(),
        Scalar::Int(number) => number.to_string(),
        Scalar::Float(number) => format!("{number:.prec$}", prec = FLOAT_PRECISION),
        Scalar::Null => NULL_LITERAL.to_string(),
    }
}

/// Append a value and its line terminator to `dst`.
pub fn encode_scalar(value: &Scalar, dst: &mut BytesMut) {
    let text = encode_line(value);
    dst.reserve(text.len() + 1);
    dst.put_slice(text.as_bytes());
    dst.put_u8(b'\n');
}

/// Decode one line (terminator already stripped) as `kind`.
///
/// Strings never fail: `(null)` decodes to [`Scalar::Null`] and `\r` is
/// turned back into `\n`. Numbers and booleans fail on empty or malformed
/// input instead of being coerced to zero.
pub fn decode_scalar(line: &str, kind: ScalarKind) -> Result<Scalar> {
    let malformed = || LineError::Malformed {
        kind,
        line: line.to_string(),
    };
    let text = line.trim();

    match kind {
        ScalarKind::Str if line == NULL_LITERAL => Ok(Scalar::Null),
        ScalarKind::Str => Ok(Scalar::Str(line.replace('\r', "\n"))),
        _ if text.is_empty() => Err(malformed()),
        ScalarKind::Bool => match text {
            "true" => Ok(Scalar::Bool(true)),
            "false" => Ok(Scalar::Bool(false)),
            _ => Err(malformed()),
        },
        ScalarKind::Int => text.parse().map(Scalar::Int).map_err(|_| malformed()),
        ScalarKind::Float => text.parse().map(Scalar::Float).map_err(|_| malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: Scalar) -> Scalar {
        let kind = value.kind().unwrap_or(ScalarKind::Str);
        let mut buf = BytesMut::new();
        encode_scalar(&value, &mut buf);
        assert_eq!(buf.last(), Some(&b'\n'));
        let line = std::str::from_utf8(&buf[..buf.len() - 1]).unwrap();
        assert!(!line.contains('\n'), "encoded line must be single-line: {line:?}");
        decode_scalar(line, kind).unwrap()
    }

    #[test]
    fn scalars_survive_the_wire() {
        let values = [
            Scalar::Str("plain".into()),
            Scalar::Str("two\nlines\n".into()),
            Scalar::Str(String::new()),
            Scalar::Bool(true),
            Scalar::Bool(false),
            Scalar::Int(0),
            Scalar::Int(-42),
            Scalar::Int(i32::MAX),
            Scalar::Float(0.25),
            Scalar::Float(-1.5),
            Scalar::Float(0.0),
            Scalar::Null,
        ];
        for value in values {
            assert_eq!(roundtrip(value.clone()), value);
        }
    }

    #[test]
    fn negative_zero_float_roundtrips() {
        let decoded = roundtrip(Scalar::Float(-0.0));
        let value = decoded.as_float().unwrap();
        assert_eq!(value, 0.0);
        assert!(value.is_sign_negative());
    }

    #[test]
    fn float_uses_ten_fraction_digits() {
        assert_eq!(encode_line(&Scalar::Float(0.25)), "0.2500000000");
        assert_eq!(encode_line(&Scalar::Float(-3.0)), "-3.0000000000");
    }

    #[test]
    fn integer_has_no_padding() {
        assert_eq!(encode_line(&Scalar::Int(5)), "5");
        assert_eq!(encode_line(&Scalar::Int(-17)), "-17");
    }

    #[test]
    fn newline_becomes_carriage_return() {
        assert_eq!(encode_line(&Scalar::from("a\nb")), "a\rb");
        assert_eq!(
            decode_scalar("a\rb", ScalarKind::Str).unwrap(),
            Scalar::from("a\nb")
        );
    }

    #[test]
    fn null_literal() {
        assert_eq!(encode_line(&Scalar::Null), "(null)");
        assert_eq!(encode_line(&Scalar::from(None::<&str>)), "(null)");
        assert_eq!(
            decode_scalar("(null)", ScalarKind::Str).unwrap(),
            Scalar::Null
        );
    }

    #[test]
    fn empty_numeric_lines_are_errors() {
        for kind in [ScalarKind::Int, ScalarKind::Float, ScalarKind::Bool] {
            let err = decode_scalar("", kind).unwrap_err();
            assert!(matches!(err, LineError::Malformed { .. }), "{kind}");
        }
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert!(decode_scalar("five", ScalarKind::Int).is_err());
        assert!(decode_scalar("1.5", ScalarKind::Int).is_err());
        assert!(decode_scalar("99999999999", ScalarKind::Int).is_err());
        assert!(decode_scalar("0,25", ScalarKind::Float).is_err());
        assert!(decode_scalar("yes", ScalarKind::Bool).is_err());
        assert!(decode_scalar("True", ScalarKind::Bool).is_err());
    }

    #[test]
    fn decodes_integer_into_float_slot() {
        assert_eq!(
            decode_scalar("3", ScalarKind::Float).unwrap(),
            Scalar::Float(3.0)
        );
    }

    #[test]
    fn defaults_per_kind() {
        assert_eq!(ScalarKind::Int.default_value(), Scalar::Int(0));
        assert_eq!(ScalarKind::Float.default_value(), Scalar::Float(0.0));
        assert_eq!(ScalarKind::Bool.default_value(), Scalar::Bool(false));
        assert_eq!(ScalarKind::Str.default_value(), Scalar::Str(String::new()));
    }
}
