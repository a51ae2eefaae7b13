//! Caller-registered field types and helpers for building them.

use crate::error::{ConvertError, Error, Result};
use crate::spec::Cardinality;
use crate::value::Value;
use fancy_regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Pattern used by an extra type that does not declare one.
pub const DEFAULT_PATTERN: &str = ".+?";

pub type Converter = Arc<dyn Fn(&str) -> std::result::Result<Value, ConvertError> + Send + Sync>;

/// Extra types available to a template, keyed by the name used after `:`.
pub type ExtraTypes = HashMap<String, ExtraType>;

/// A converter plus the pattern its text must match.
///
/// A pattern containing capturing groups must declare how many it has, so
/// that later fields keep their capture indices.
#[derive(Clone)]
pub struct ExtraType {
    converter: Converter,
    pattern: Option<String>,
    group_count: usize,
}

impl fmt::Debug for ExtraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraType")
            .field("pattern", &self.pattern())
            .field("group_count", &self.group_count)
            .finish_non_exhaustive()
    }
}

impl ExtraType {
    pub fn new<F>(converter: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<Value, ConvertError> + Send + Sync + 'static,
    {
        ExtraType {
            converter: Arc::new(converter),
            pattern: None,
            group_count: 0,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>, group_count: usize) -> Self {
        self.pattern = Some(pattern.into());
        self.group_count = group_count;
        self
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_deref().unwrap_or(DEFAULT_PATTERN)
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn convert(&self, text: &str) -> std::result::Result<Value, ConvertError> {
        (self.converter)(text)
    }

    /// Compiles the pattern on its own and checks its groups against the
    /// declared count.
    pub fn validate(&self, name: &str) -> Result<()> {
        let re = Regex::new(self.pattern()).map_err(|source| Error::CustomPattern {
            name: name.to_string(),
            source,
        })?;
        let actual = re.captures_len() - 1;
        if actual != self.group_count {
            return Err(Error::GroupCountMismatch {
                name: name.to_string(),
                declared: self.group_count,
                actual,
            });
        }
        Ok(())
    }
}

// ============ Type Builder ============

/// Factories for common extra types.
pub struct TypeBuilder;

impl TypeBuilder {
    pub const DEFAULT_SEPARATOR: &'static str = ",";

    /// Maps each key to a fixed value. Lookup falls back to case-folded keys
    /// so that case-insensitive matches still resolve.
    pub fn make_enum<K, V, I>(mappings: I) -> ExtraType
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mappings: Vec<(String, Value)> = mappings
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let pattern = alternation(mappings.iter().map(|(k, _)| k.as_str()));
        let folded: HashMap<String, Value> = mappings
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        let lookup: HashMap<String, Value> = mappings.into_iter().collect();
        ExtraType::new(move |text| {
            lookup
                .get(text)
                .or_else(|| folded.get(&text.to_lowercase()))
                .cloned()
                .ok_or_else(|| ConvertError::custom(format!("'{}' is not a known value", text)))
        })
        .with_pattern(pattern, 0)
    }

    /// Matches one of `choices` and returns it as written in `choices`.
    pub fn make_choice<S, I>(choices: I) -> ExtraType
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        let pattern = alternation(choices.iter().map(String::as_str));
        ExtraType::new(move |text| {
            find_choice(&choices, text).map(|(_, choice)| Value::from(choice))
        })
        .with_pattern(pattern, 0)
    }

    /// Like [`TypeBuilder::make_choice`] but returns `[index, choice]`.
    pub fn make_choice_indexed<S, I>(choices: I) -> ExtraType
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        let pattern = alternation(choices.iter().map(String::as_str));
        ExtraType::new(move |text| {
            let (index, choice) = find_choice(&choices, text)?;
            Ok(Value::Array(vec![
                Value::Int(index as i64),
                Value::from(choice),
            ]))
        })
        .with_pattern(pattern, 0)
    }

    pub fn with_cardinality(ty: &ExtraType, cardinality: Cardinality, separator: &str) -> ExtraType {
        match cardinality {
            Cardinality::One => ty.clone(),
            Cardinality::ZeroOrOne => Self::with_zero_or_one(ty),
            Cardinality::ZeroOrMore => list(ty, separator, true),
            Cardinality::OneOrMore => list(ty, separator, false),
        }
    }

    /// `(base)?`; empty text converts to [`Value::Null`].
    pub fn with_zero_or_one(ty: &ExtraType) -> ExtraType {
        let base = ty.clone();
        ExtraType::new(move |text| {
            if text.is_empty() {
                Ok(Value::Null)
            } else {
                base.convert(text)
            }
        })
        .with_pattern(format!("({})?", ty.pattern()), 1 + ty.group_count())
    }

    pub fn with_optional(ty: &ExtraType) -> ExtraType {
        Self::with_zero_or_one(ty)
    }

    pub fn with_zero_or_more(ty: &ExtraType) -> ExtraType {
        list(ty, Self::DEFAULT_SEPARATOR, true)
    }

    pub fn with_one_or_more(ty: &ExtraType) -> ExtraType {
        list(ty, Self::DEFAULT_SEPARATOR, false)
    }

    pub fn with_many(ty: &ExtraType) -> ExtraType {
        Self::with_one_or_more(ty)
    }
}

fn alternation<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.map(regex::escape).collect::<Vec<_>>().join("|")
}

fn find_choice<'c>(
    choices: &'c [String],
    text: &str,
) -> std::result::Result<(usize, &'c str), ConvertError> {
    choices
        .iter()
        .position(|c| c == text)
        .or_else(|| choices.iter().position(|c| c.eq_ignore_ascii_case(text)))
        .map(|i| (i, choices[i].as_str()))
        .ok_or_else(|| ConvertError::custom(format!("'{}' is not one of the choices", text)))
}

/// `(base)(\s*sep\s*(base))*`, optionally allowed to be empty.
fn list(ty: &ExtraType, separator: &str, allow_empty: bool) -> ExtraType {
    let base_pattern = ty.pattern();
    let sep = regex::escape(separator);
    let repeated = format!(r"({base_pattern})(\s*{sep}\s*({base_pattern}))*");
    let pattern = if allow_empty {
        format!("(?:{repeated})?")
    } else {
        repeated
    };

    let base = ty.clone();
    let separator = separator.to_string();
    ExtraType::new(move |text| {
        if allow_empty && text.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        text.split(separator.as_str())
            .map(|part| base.convert(part.trim()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array)
    })
    .with_pattern(pattern, 3 + 2 * ty.group_count())
}
