//! The built-in field types: the pattern each one matches and how its text
//! becomes a [`Value`].

use crate::datetime::{DateKind, StrptimeFormat};
use crate::error::ConvertError;
use crate::extra::{ExtraTypes, TypeBuilder};
use crate::spec::{Align, Cardinality, FieldSpec};
use crate::value::Value;
use fancy_regex::Captures;
use rust_decimal::Decimal;
use std::num::IntErrorKind;

#[derive(Debug, Clone)]
pub enum TypeKind {
    /// No type code: any text.
    Text,
    /// `d`
    Int,
    /// `n`
    Grouped,
    /// `b`
    Binary,
    /// `o`
    Octal,
    /// `x`
    Hex,
    /// `%`
    Percent,
    /// `f`
    Float,
    /// `F`
    Decimal,
    /// `e`
    Exp,
    /// `g`
    General,
    /// `w`
    Word,
    /// `W`
    NonWord,
    /// `s`
    Space,
    /// `S`
    NonSpace,
    /// `D`
    NonDigit,
    /// `l`
    Letters,
    DateTime(DateKind),
    Strptime(StrptimeFormat),
    Extra(crate::extra::ExtraType),
}

impl TypeKind {
    /// Resolves a type code. Extra types shadow the built-in codes.
    pub fn resolve(
        code: Option<&str>,
        cardinality: Cardinality,
        extra_types: &ExtraTypes,
    ) -> Option<Self> {
        let Some(code) = code else {
            return Some(TypeKind::Text);
        };
        if let Some(ty) = extra_types.get(code) {
            let ty = TypeBuilder::with_cardinality(ty, cardinality, TypeBuilder::DEFAULT_SEPARATOR);
            return Some(TypeKind::Extra(ty));
        }
        if cardinality != Cardinality::One {
            return None;
        }
        Self::builtin(code)
    }

    fn builtin(code: &str) -> Option<Self> {
        let kind = match code {
            "d" => TypeKind::Int,
            "n" => TypeKind::Grouped,
            "b" => TypeKind::Binary,
            "o" => TypeKind::Octal,
            "x" => TypeKind::Hex,
            "%" => TypeKind::Percent,
            "f" => TypeKind::Float,
            "F" => TypeKind::Decimal,
            "e" => TypeKind::Exp,
            "g" => TypeKind::General,
            "w" => TypeKind::Word,
            "W" => TypeKind::NonWord,
            "s" => TypeKind::Space,
            "S" => TypeKind::NonSpace,
            "D" => TypeKind::NonDigit,
            "l" => TypeKind::Letters,
            _ => {
                if let Some(kind) = DateKind::from_code(code) {
                    return Some(TypeKind::DateTime(kind));
                }
                return StrptimeFormat::parse(code).map(TypeKind::Strptime);
            }
        };
        Some(kind)
    }

    /// Capturing groups inside [`TypeKind::core_pattern`].
    pub fn group_count(&self) -> usize {
        match self {
            TypeKind::DateTime(kind) => kind.group_count(),
            TypeKind::Strptime(format) => format.group_count(),
            TypeKind::Extra(ty) => ty.group_count(),
            _ => 0,
        }
    }

    /// Types that take a sign and `0`/`=` padding.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeKind::Int
                | TypeKind::Grouped
                | TypeKind::Binary
                | TypeKind::Octal
                | TypeKind::Hex
                | TypeKind::Percent
                | TypeKind::Float
                | TypeKind::Decimal
                | TypeKind::Exp
                | TypeKind::General
        )
    }

    /// The pattern for the value itself, without sign, padding or the
    /// wrapping group. Never has a top-level alternation.
    pub fn core_pattern(&self, spec: &FieldSpec) -> String {
        match self {
            TypeKind::Text => text_pattern(spec.width, spec.precision),
            TypeKind::Int => {
                let w = spec
                    .width
                    .map_or_else(|| "+".to_string(), |w| format!("{{1,{}}}", w));
                format!(r"(?:0[xX][0-9a-fA-F]{w}|0[bB][01]{w}|0[oO][0-7]{w}|[0-9]{w})")
            }
            TypeKind::Grouped => r"[0-9]{1,3}(?:[,.][0-9]{3})*".to_string(),
            TypeKind::Binary => "(?:0[bB])?[01]+".to_string(),
            TypeKind::Octal => "(?:0[oO])?[0-7]+".to_string(),
            TypeKind::Hex => "(?:0[xX])?[0-9a-fA-F]+".to_string(),
            TypeKind::Percent => r"[0-9]+(?:\.[0-9]+)?%".to_string(),
            TypeKind::Float | TypeKind::Decimal => r"[0-9]*\.[0-9]+".to_string(),
            TypeKind::Exp => r"(?:[0-9]*\.[0-9]+[eE][-+]?[0-9]+|(?i:nan|inf))".to_string(),
            TypeKind::General => {
                r"(?:[0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?|(?i:nan|inf))".to_string()
            }
            TypeKind::Word => r"\w+".to_string(),
            TypeKind::NonWord => r"\W+".to_string(),
            TypeKind::Space => r"\s+".to_string(),
            TypeKind::NonSpace => r"\S+".to_string(),
            TypeKind::NonDigit => r"\D+".to_string(),
            TypeKind::Letters => "[A-Za-z]+".to_string(),
            TypeKind::DateTime(kind) => kind.pattern(),
            TypeKind::Strptime(format) => format.pattern().to_string(),
            TypeKind::Extra(ty) => ty.pattern().to_string(),
        }
    }

    /// Converts `text`, the contents of wrapping group `base`. Composite
    /// types read their sub-captures from `caps` relative to `base`.
    pub fn convert(&self, text: &str, caps: &Captures, base: usize) -> Result<Value, ConvertError> {
        match self {
            TypeKind::Text
            | TypeKind::Word
            | TypeKind::NonWord
            | TypeKind::Space
            | TypeKind::NonSpace
            | TypeKind::NonDigit
            | TypeKind::Letters => Ok(Value::from(text)),
            TypeKind::Int => int_convert(text, None),
            TypeKind::Grouped => int_convert(text, Some(10)),
            TypeKind::Binary => int_convert(text, Some(2)),
            TypeKind::Octal => int_convert(text, Some(8)),
            TypeKind::Hex => int_convert(text, Some(16)),
            TypeKind::Percent => percent_convert(text),
            TypeKind::Float | TypeKind::Exp | TypeKind::General => float_convert(text),
            TypeKind::Decimal => decimal_convert(text),
            TypeKind::DateTime(kind) => kind.convert(caps, base),
            TypeKind::Strptime(format) => format.convert(caps, base),
            TypeKind::Extra(ty) => ty.convert(text),
        }
    }
}

/// Width is a minimum length and precision a maximum.
fn text_pattern(width: Option<usize>, precision: Option<usize>) -> String {
    match (width, precision) {
        (Some(w), Some(p)) => format!(".{{{},{}}}?", w, p),
        (None, Some(p)) => format!(".{{1,{}}}?", p),
        (Some(w), None) => format!(".{{{},}}?", w),
        (None, None) => ".+?".to_string(),
    }
}

// ============ Field Patterns ============

/// A field's pattern split around its wrapping capture group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPattern {
    /// Alignment padding before the group.
    pub before: String,
    /// Contents of the group.
    pub inner: String,
    /// Alignment padding after the group.
    pub after: String,
}

impl FieldSpec {
    pub fn pattern(&self) -> FieldPattern {
        let mut inner = self.kind.core_pattern(self);
        if self.kind.is_numeric() {
            if self.align == Some(Align::Numeric) {
                let fill = escape_char(self.fill.unwrap_or('0'));
                inner = format!("{}*{}", fill, inner);
            } else if self.zero && self.width.is_none() {
                inner = format!("0*{}", inner);
            }
            inner = format!("[-+ ]?{}", inner);
        }

        let fill = escape_char(self.fill.unwrap_or(' '));
        let align = self.align.or(self.width.map(|_| Align::Right));
        let (before, after) = match align {
            Some(Align::Left) => (String::new(), format!("{}*", fill)),
            Some(Align::Right) => (format!("{}*", fill), String::new()),
            Some(Align::Center) => (format!("{}*", fill), format!("{}*", fill)),
            Some(Align::Numeric) | None => (String::new(), String::new()),
        };
        FieldPattern {
            before,
            inner,
            after,
        }
    }

    /// Converts the text of this field's wrapping group.
    pub fn convert(&self, text: &str, caps: &Captures, base: usize) -> Result<Value, ConvertError> {
        if self.align == Some(Align::Numeric) && self.kind.is_numeric() {
            if let Some(fill) = self.fill.filter(|c| !c.is_ascii_digit()) {
                return self.kind.convert(&strip_fill(text, fill), caps, base);
            }
        }
        self.kind.convert(text, caps, base)
    }
}

fn escape_char(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0; 4]))
}

/// Drops `=` padding sitting between the sign and the digits.
fn strip_fill(text: &str, fill: char) -> String {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix(['-', '+']) {
        Some(rest) => (&text[..1], rest),
        None => ("", text),
    };
    format!("{}{}", sign, digits.trim_start_matches(fill))
}

// ============ Converters ============

/// Parses an integer with an optional sign. With no base given, a `0b`, `0o`
/// or `0x` prefix picks one; otherwise it is decimal. Characters that are not
/// digits of the base (prefixes, group separators) are skipped.
pub fn int_convert(text: &str, base: Option<u32>) -> Result<Value, ConvertError> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let base = base.unwrap_or_else(|| detect_base(body));
    let digits: String = body.chars().filter(|c| c.is_digit(base)).collect();
    if digits.is_empty() {
        return Err(ConvertError::Integer {
            text: text.to_string(),
            base,
        });
    }
    let signed = if negative {
        format!("-{}", digits)
    } else {
        digits
    };
    i64::from_str_radix(&signed, base)
        .map(Value::Int)
        .map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                ConvertError::Overflow(text.to_string())
            }
            _ => ConvertError::Integer {
                text: text.to_string(),
                base,
            },
        })
}

fn detect_base(body: &str) -> u32 {
    let bytes = body.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'0' {
        match bytes[1].to_ascii_lowercase() {
            b'b' => return 2,
            b'o' => return 8,
            b'x' => return 16,
            _ => {}
        }
    }
    10
}

fn float_convert(text: &str) -> Result<Value, ConvertError> {
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| ConvertError::Float(text.to_string()))
}

fn percent_convert(text: &str) -> Result<Value, ConvertError> {
    let number = text.trim().trim_end_matches('%');
    number
        .parse::<f64>()
        .map(|n| Value::Float(n / 100.0))
        .map_err(|_| ConvertError::Float(text.to_string()))
}

fn decimal_convert(text: &str) -> Result<Value, ConvertError> {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let normalized = if let Some(rest) = unsigned.strip_prefix("-.") {
        format!("-0.{}", rest)
    } else if let Some(rest) = unsigned.strip_prefix('.') {
        format!("0.{}", rest)
    } else {
        unsigned.to_string()
    };
    let fraction = normalized.split_once('.').map_or(0, |(_, f)| f.len());
    // 28 fractional digits at most; refuse to round the rest away.
    match Decimal::from_str_exact(&normalized) {
        Ok(d) if d.scale() as usize == fraction => Ok(Value::Decimal(d)),
        _ => Err(ConvertError::Decimal(text.to_string())),
    }
}
