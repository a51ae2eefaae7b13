//! Parsing of the `[[fill]align][sign][#][0][width][,][.precision][type][cardinality]`
//! mini-language that follows a field's `:`.

use crate::error::{Error, Result};
use crate::extra::ExtraTypes;
use crate::types::TypeKind;
use winnow::ascii::{digit0, digit1};
use winnow::combinator::{alt, opt, preceded};
use winnow::prelude::*;
use winnow::token::{any, one_of, rest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign and the digits.
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sign {
    #[default]
    None,
    Plus,
    Minus,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    #[default]
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Cardinality {
    fn from_suffix(c: char) -> Option<Self> {
        match c {
            '?' => Some(Cardinality::ZeroOrOne),
            '*' => Some(Cardinality::ZeroOrMore),
            '+' => Some(Cardinality::OneOrMore),
            _ => None,
        }
    }
}

/// A parsed field specifier together with the type it resolves to.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub fill: Option<char>,
    pub align: Option<Align>,
    pub sign: Sign,
    pub alternate: bool,
    pub zero: bool,
    pub width: Option<usize>,
    pub grouping: bool,
    pub precision: Option<usize>,
    /// The type code as written, without any cardinality suffix.
    pub type_code: Option<String>,
    pub cardinality: Cardinality,
    pub kind: TypeKind,
}

impl FieldSpec {
    /// The spec of a field written without `:`.
    pub fn text() -> Self {
        FieldSpec {
            fill: None,
            align: None,
            sign: Sign::None,
            alternate: false,
            zero: false,
            width: None,
            grouping: false,
            precision: None,
            type_code: None,
            cardinality: Cardinality::One,
            kind: TypeKind::Text,
        }
    }
}

// ============ Spec Grammar ============

struct Prefix<'a> {
    fill: Option<char>,
    align: Option<Align>,
    sign: Sign,
    alternate: bool,
    zero: bool,
    width: Option<usize>,
    grouping: bool,
    precision: Option<usize>,
    rest: &'a str,
}

fn align_char(input: &mut &str) -> ModalResult<Align> {
    one_of(['<', '>', '^', '='])
        .map(|c| match c {
            '<' => Align::Left,
            '>' => Align::Right,
            '^' => Align::Center,
            _ => Align::Numeric,
        })
        .parse_next(input)
}

fn fill_align(input: &mut &str) -> ModalResult<(Option<char>, Option<Align>)> {
    let found = opt(alt((
        align_char.map(|a| (None, a)),
        (any, align_char).map(|(fill, a)| (Some(fill), a)),
    )))
    .parse_next(input)?;
    Ok(match found {
        Some((fill, align)) => (fill, Some(align)),
        None => (None, None),
    })
}

fn sign(input: &mut &str) -> ModalResult<Sign> {
    opt(one_of(['+', '-', ' ']))
        .map(|c| match c {
            Some('+') => Sign::Plus,
            Some('-') => Sign::Minus,
            Some(_) => Sign::Space,
            None => Sign::None,
        })
        .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<usize> {
    digit1.try_map(str::parse::<usize>).parse_next(input)
}

fn precision(input: &mut &str) -> ModalResult<Option<usize>> {
    let digits: Option<&str> = opt(preceded('.', digit0)).parse_next(input)?;
    Ok(digits.and_then(|d| d.parse().ok()))
}

fn prefix<'a>(input: &mut &'a str) -> ModalResult<Prefix<'a>> {
    let (fill, align) = fill_align.parse_next(input)?;
    let sign = sign.parse_next(input)?;
    let alternate = opt('#').parse_next(input)?.is_some();
    let zero = opt('0').parse_next(input)?.is_some();
    let width = opt(number).parse_next(input)?;
    let grouping = opt(one_of([',', '_'])).parse_next(input)?.is_some();
    let precision = precision.parse_next(input)?;
    let rest = rest.parse_next(input)?;
    Ok(Prefix {
        fill,
        align,
        sign,
        alternate,
        zero,
        width,
        grouping,
        precision,
        rest,
    })
}

/// Splits a trailing `?`, `*` or `+` off a registered extra type name.
fn split_cardinality<'a>(code: &'a str, extra_types: &ExtraTypes) -> (&'a str, Cardinality) {
    if extra_types.contains_key(code) {
        return (code, Cardinality::One);
    }
    let mut chars = code.chars();
    if let Some(card) = chars.next_back().and_then(Cardinality::from_suffix) {
        let base = chars.as_str();
        if extra_types.contains_key(base) {
            return (base, card);
        }
    }
    (code, Cardinality::One)
}

/// Parses the text after a field's `:` and resolves its type.
pub fn extract_format(spec: &str, extra_types: &ExtraTypes) -> Result<FieldSpec> {
    let mut input = spec;
    let parsed = prefix.parse_next(&mut input).map_err(|_| Error::SpecFormat {
        spec: spec.to_string(),
    })?;

    let (type_code, cardinality) = if parsed.rest.is_empty() {
        (None, Cardinality::One)
    } else {
        let (code, card) = split_cardinality(parsed.rest, extra_types);
        (Some(code.to_string()), card)
    };

    let kind = TypeKind::resolve(type_code.as_deref(), cardinality, extra_types).ok_or_else(
        || Error::SpecFormat {
            spec: spec.to_string(),
        },
    )?;
    if let TypeKind::Extra(ty) = &kind {
        ty.validate(parsed.rest)?;
    }

    Ok(FieldSpec {
        fill: parsed.fill,
        align: parsed.align,
        sign: parsed.sign,
        alternate: parsed.alternate,
        zero: parsed.zero,
        width: parsed.width,
        grouping: parsed.grouping,
        precision: parsed.precision,
        type_code,
        cardinality,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extra::ExtraType;
    use crate::value::Value;

    fn extras() -> ExtraTypes {
        let mut extras = ExtraTypes::new();
        extras.insert(
            "spam".to_string(),
            ExtraType::new(|s| Ok(Value::from(s))),
        );
        extras
    }

    fn extract(spec: &str) -> FieldSpec {
        extract_format(spec, &extras()).unwrap()
    }

    #[test]
    fn test_plain_types() {
        for t in ["%", "o", "b", "x", "e", "g", "f", "d", "D", "w", "W", "s", "S", "l"] {
            let spec = extract(t);
            assert_eq!(spec.type_code.as_deref(), Some(t));
            assert_eq!(spec.width, None);

            let spec = extract(&format!("10{}", t));
            assert_eq!(spec.type_code.as_deref(), Some(t));
            assert_eq!(spec.width, Some(10));
        }
    }

    #[test]
    fn test_zero_and_width() {
        let spec = extract("05d");
        assert!(spec.zero);
        assert_eq!(spec.width, Some(5));
        assert_eq!(spec.type_code.as_deref(), Some("d"));
    }

    #[test]
    fn test_fill_and_align() {
        assert_eq!(extract("<").align, Some(Align::Left));
        assert_eq!(extract(">").align, Some(Align::Right));
        assert_eq!(extract("^").align, Some(Align::Center));

        let spec = extract(".<");
        assert_eq!(spec.align, Some(Align::Left));
        assert_eq!(spec.fill, Some('.'));

        let spec = extract("x=d");
        assert_eq!(spec.align, Some(Align::Numeric));
        assert_eq!(spec.fill, Some('x'));
        assert_eq!(spec.type_code.as_deref(), Some("d"));
    }

    #[test]
    fn test_everything_at_once() {
        let spec = extract(".^010d");
        assert_eq!(spec.fill, Some('.'));
        assert_eq!(spec.align, Some(Align::Center));
        assert!(spec.zero);
        assert_eq!(spec.width, Some(10));
        assert_eq!(spec.type_code.as_deref(), Some("d"));
    }

    #[test]
    fn test_precision() {
        let spec = extract(".2f");
        assert_eq!(spec.precision, Some(2));
        assert_eq!(spec.width, None);

        let spec = extract("10.2f");
        assert_eq!(spec.precision, Some(2));
        assert_eq!(spec.width, Some(10));

        let spec = extract("4.4");
        assert_eq!(spec.precision, Some(4));
        assert!(spec.type_code.is_none());
    }

    #[test]
    fn test_sign_alternate_grouping() {
        let spec = extract("+#,d");
        assert_eq!(spec.sign, Sign::Plus);
        assert!(spec.alternate);
        assert!(spec.grouping);

        assert_eq!(extract("-.7f").sign, Sign::Minus);
        assert_eq!(extract(" .7f").sign, Sign::Space);
    }

    #[test]
    fn test_datetime_and_extra_types() {
        assert!(matches!(extract("ti").kind, TypeKind::DateTime(_)));
        assert!(matches!(extract("spam").kind, TypeKind::Extra(_)));
        assert!(matches!(extract("%Y-%m-%d").kind, TypeKind::Strptime(_)));
    }

    #[test]
    fn test_cardinality_suffix() {
        assert_eq!(extract("spam").cardinality, Cardinality::One);
        assert_eq!(extract("spam?").cardinality, Cardinality::ZeroOrOne);
        assert_eq!(extract("spam*").cardinality, Cardinality::ZeroOrMore);
        let spec = extract("spam+");
        assert_eq!(spec.cardinality, Cardinality::OneOrMore);
        assert_eq!(spec.type_code.as_deref(), Some("spam"));
    }

    #[test]
    fn test_unknown_type() {
        assert!(matches!(
            extract_format("z", &extras()),
            Err(Error::SpecFormat { .. })
        ));
        assert!(matches!(
            extract_format("d+", &extras()),
            Err(Error::SpecFormat { .. })
        ));
        assert!(matches!(
            extract_format("%Q", &extras()),
            Err(Error::SpecFormat { .. })
        ));
    }
}
