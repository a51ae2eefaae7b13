//! Parse results and the conversion of a raw match into one.

use crate::compiler::{CompiledField, FieldRole};
use crate::error::{Error, Result};
use crate::value::Value;
use fancy_regex::Captures;
use std::collections::HashMap;
use std::ops::{Index, Range};

/// Identifies a field: by position for anonymous fields, by name otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Index(usize),
    Name(String),
}

impl From<usize> for FieldKey {
    fn from(i: usize) -> Self {
        FieldKey::Index(i)
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        FieldKey::Name(name.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        FieldKey::Name(name)
    }
}

/// Values pulled out of one successful match.
///
/// `spans` are byte ranges into the subject and exclude alignment padding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseResult {
    fixed: Vec<Value>,
    named: HashMap<String, Value>,
    spans: HashMap<FieldKey, Range<usize>>,
}

impl ParseResult {
    pub fn new(
        fixed: Vec<Value>,
        named: HashMap<String, Value>,
        spans: HashMap<FieldKey, Range<usize>>,
    ) -> Self {
        ParseResult {
            fixed,
            named,
            spans,
        }
    }

    /// Anonymous fields in template order.
    pub fn fixed(&self) -> &[Value] {
        &self.fixed
    }

    /// Named fields. Bracketed names (`a[b]`) are nested under their base name.
    pub fn named(&self) -> &HashMap<String, Value> {
        &self.named
    }

    pub fn spans(&self) -> &HashMap<FieldKey, Range<usize>> {
        &self.spans
    }

    pub fn span(&self, key: impl Into<FieldKey>) -> Option<Range<usize>> {
        self.spans.get(&key.into()).cloned()
    }

    pub fn get(&self, key: impl Into<FieldKey>) -> Option<&Value> {
        match key.into() {
            FieldKey::Index(i) => self.fixed.get(i),
            FieldKey::Name(name) => self.named.get(&name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    pub fn into_parts(self) -> (Vec<Value>, HashMap<String, Value>) {
        (self.fixed, self.named)
    }
}

impl Index<usize> for ParseResult {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.fixed[index]
    }
}

impl Index<&str> for ParseResult {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.named.get(name) {
            Some(value) => value,
            None => panic!("no field named '{}'", name),
        }
    }
}

// ============ Evaluation ============

fn label(field: &CompiledField) -> String {
    match &field.role {
        FieldRole::Positional(i) => i.to_string(),
        FieldRole::Named { name, .. } => name.clone(),
    }
}

/// Splits `a[b][c]` into `a` and `[b, c]`.
fn bracket_path(name: &str) -> Option<(&str, Vec<&str>)> {
    let (base, rest) = name.split_once('[')?;
    let keys = rest.strip_suffix(']')?.split("][").collect();
    Some((base, keys))
}

/// Stores a named value, nesting bracketed names. A name may not land on a
/// slot another field already filled.
fn insert_named(named: &mut HashMap<String, Value>, name: &str, value: Value) -> Result<()> {
    let conflict = || Error::NameConflict {
        name: name.to_string(),
    };
    let Some((base, keys)) = bracket_path(name) else {
        if named.contains_key(name) {
            return Err(conflict());
        }
        named.insert(name.to_string(), value);
        return Ok(());
    };
    let Some((last, parents)) = keys.split_last() else {
        return Err(conflict());
    };
    let mut slot = named
        .entry(base.to_string())
        .or_insert_with(|| Value::Object(HashMap::new()));
    for key in parents {
        slot = match slot {
            Value::Object(map) => map
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(HashMap::new())),
            _ => return Err(conflict()),
        };
    }
    match slot {
        Value::Object(map) if !map.contains_key(*last) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        _ => Err(conflict()),
    }
}

fn span(m: &fancy_regex::Match) -> Range<usize> {
    m.start()..m.end()
}

/// Converts every field of a match.
pub(crate) fn evaluate(fields: &[CompiledField], caps: &Captures) -> Result<ParseResult> {
    let mut fixed = Vec::new();
    let mut named = HashMap::new();
    let mut spans = HashMap::new();

    for field in fields {
        let capture = caps.get(field.group);
        let value = match &capture {
            Some(m) => field
                .spec
                .convert(m.as_str(), caps, field.group)
                .map_err(|source| Error::Conversion {
                    field: label(field),
                    source,
                })?,
            None => Value::Null,
        };
        match &field.role {
            FieldRole::Positional(i) => {
                if let Some(m) = &capture {
                    spans.insert(FieldKey::Index(*i), span(m));
                }
                fixed.push(value);
            }
            FieldRole::Named { name, .. } => {
                if let Some(m) = &capture {
                    spans.insert(FieldKey::Name(name.clone()), span(m));
                }
                insert_named(&mut named, name, value)?;
            }
        }
    }

    Ok(ParseResult::new(fixed, named, spans))
}
