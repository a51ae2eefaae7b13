//! Turns a template into a regular expression and a map from capture groups
//! back to fields.

use crate::error::{Error, Result};
use crate::extra::ExtraTypes;
use crate::spec::{extract_format, FieldSpec};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// `{{`, `}}`, or a whole `{name.path[key]:spec}` field.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{[\w-]*(?:\.[\w-]+|\[[^\]]+\])*(?::[^}]+)?\}").unwrap()
});

static GROUP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// What a field contributes to the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRole {
    /// The n-th anonymous field.
    Positional(usize),
    /// A named field and the group name it was compiled to.
    Named { name: String, group_name: String },
}

#[derive(Debug, Clone)]
pub struct CompiledField {
    pub role: FieldRole,
    /// Index of the wrapping capture group.
    pub group: usize,
    pub spec: FieldSpec,
}

#[derive(Debug, Clone)]
pub struct Compiled {
    /// Unanchored pattern.
    pub expression: String,
    pub fields: Vec<CompiledField>,
    /// Capturing groups the expression should contain.
    pub group_count: usize,
}

struct FirstUse {
    spec: String,
    group_name: String,
}

struct Compiler<'a> {
    extra_types: &'a ExtraTypes,
    group_index: usize,
    fixed_count: usize,
    group_to_name: HashMap<String, String>,
    names: HashMap<String, FirstUse>,
    fields: Vec<CompiledField>,
}

/// Compiles `template` into an unanchored expression.
pub fn compile(template: &str, extra_types: &ExtraTypes) -> Result<Compiled> {
    let mut compiler = Compiler {
        extra_types,
        group_index: 0,
        fixed_count: 0,
        group_to_name: HashMap::new(),
        names: HashMap::new(),
        fields: Vec::new(),
    };

    let mut expression = String::new();
    let mut last_end = 0;
    for token in TOKEN.find_iter(template) {
        expression.push_str(&regex::escape(&template[last_end..token.start()]));
        match token.as_str() {
            "{{" => expression.push_str(r"\{"),
            "}}" => expression.push_str(r"\}"),
            field => {
                let body = &field[1..field.len() - 1];
                expression.push_str(&compiler.field(body)?);
            }
        }
        last_end = token.end();
    }
    expression.push_str(&regex::escape(&template[last_end..]));

    debug!(
        template,
        expression = %expression,
        groups = compiler.group_index,
        "compiled template"
    );

    Ok(Compiled {
        expression,
        fields: compiler.fields,
        group_count: compiler.group_index,
    })
}

impl Compiler<'_> {
    fn field(&mut self, body: &str) -> Result<String> {
        let (name, format) = match body.split_once(':') {
            Some((name, format)) => (name, Some(format)),
            None => (body, None),
        };
        let spec = match format {
            Some(format) => extract_format(format, self.extra_types)?,
            None => FieldSpec::text(),
        };
        let group = self.group_index + 1;
        let pattern = spec.pattern();

        let (role, open) = if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            let role = FieldRole::Positional(self.fixed_count);
            self.fixed_count += 1;
            (role, "(".to_string())
        } else if let Some(first) = self.names.get(name) {
            let format = format.unwrap_or_default();
            if first.spec != format {
                return Err(Error::RepeatedName {
                    name: name.to_string(),
                    first: first.spec.clone(),
                    second: format.to_string(),
                });
            }
            trace!(field = body, group_name = %first.group_name, "backreference");
            return Ok(format!("(?P={})", first.group_name));
        } else {
            let group_name = self.group_name(name)?;
            self.names.insert(
                name.to_string(),
                FirstUse {
                    spec: format.unwrap_or_default().to_string(),
                    group_name: group_name.clone(),
                },
            );
            let open = format!("(?P<{}>", group_name);
            let role = FieldRole::Named {
                name: name.to_string(),
                group_name,
            };
            (role, open)
        };

        trace!(field = body, group, role = ?role, "compiled field");
        self.group_index += 1 + spec.kind.group_count();
        self.fields.push(CompiledField { role, group, spec });

        Ok(format!(
            "{}{}{}){}",
            pattern.before, open, pattern.inner, pattern.after
        ))
    }

    /// Maps a field name onto a capture group name, disambiguating names that
    /// sanitise to the same group.
    fn group_name(&mut self, field: &str) -> Result<String> {
        let mut group = field.replace(['.', '[', ']', '-'], "_");
        let mut n = 1;
        while self.group_to_name.contains_key(&group) {
            n += 1;
            let underscores = "_".repeat(n);
            group = if field.contains('.') {
                field.replace('.', &underscores)
            } else if field.contains('_') {
                field.replace('_', &underscores)
            } else if field.contains('-') {
                field.replace('-', &underscores)
            } else {
                return Err(Error::UnsupportedGroupName {
                    field: field.to_string(),
                });
            };
        }
        if !GROUP_NAME.is_match(&group) {
            return Err(Error::UnsupportedGroupName {
                field: field.to_string(),
            });
        }
        self.group_to_name.insert(group.clone(), field.to_string());
        Ok(group)
    }
}
