//! Compiled, reusable parsers.

use crate::compiler::{compile, Compiled, FieldRole};
use crate::error::{Error, Result};
use crate::extra::{ExtraType, ExtraTypes};
use crate::result::{evaluate, ParseResult};
use fancy_regex::{Captures, Regex};
use std::borrow::Cow;
use std::ops::Range;
use std::sync::OnceLock;
use tracing::trace;

/// A template compiled once and matched many times.
///
/// The search and exact-match expressions are built on first use and cached.
/// Matching is case-insensitive unless configured otherwise.
#[derive(Debug, Clone)]
pub struct Parser {
    template: String,
    compiled: Compiled,
    case_sensitive: bool,
    search_re: OnceLock<Result<Regex>>,
    match_re: OnceLock<Result<Regex>>,
}

/// Builder for [`Parser`].
#[derive(Debug, Clone)]
pub struct ParserBuilder {
    template: String,
    extra_types: ExtraTypes,
    case_sensitive: bool,
}

impl ParserBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        ParserBuilder {
            template: template.into(),
            extra_types: ExtraTypes::new(),
            case_sensitive: false,
        }
    }

    pub fn extra_type(mut self, name: impl Into<String>, ty: ExtraType) -> Self {
        self.extra_types.insert(name.into(), ty);
        self
    }

    pub fn extra_types(mut self, types: ExtraTypes) -> Self {
        self.extra_types.extend(types);
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn build(self) -> Result<Parser> {
        let compiled = compile(&self.template, &self.extra_types)?;
        let parser = Parser {
            template: self.template,
            compiled,
            case_sensitive: self.case_sensitive,
            search_re: OnceLock::new(),
            match_re: OnceLock::new(),
        };
        parser.search_regex()?;
        Ok(parser)
    }
}

impl Parser {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        ParserBuilder::new(template).build()
    }

    pub fn builder(template: impl Into<String>) -> ParserBuilder {
        ParserBuilder::new(template)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// The unanchored expression used for searching.
    pub fn expression(&self) -> &str {
        &self.compiled.expression
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Wrapping group index of each anonymous field, in order.
    pub fn fixed_fields(&self) -> Vec<usize> {
        self.compiled
            .fields
            .iter()
            .filter(|f| matches!(f.role, FieldRole::Positional(_)))
            .map(|f| f.group)
            .collect()
    }

    /// Names of the named fields in template order, each listed once.
    pub fn named_fields(&self) -> Vec<&str> {
        self.compiled
            .fields
            .iter()
            .filter_map(|f| match &f.role {
                FieldRole::Named { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The capture group name a named field was compiled to.
    pub fn group_name(&self, field: &str) -> Option<&str> {
        self.compiled.fields.iter().find_map(|f| match &f.role {
            FieldRole::Named { name, group_name } if name == field => Some(group_name.as_str()),
            _ => None,
        })
    }

    fn build_regex(&self, expression: &str) -> Result<Regex> {
        let flags = if self.case_sensitive { "(?s)" } else { "(?si)" };
        let re = Regex::new(&format!("{}{}", flags, expression)).map_err(|e| match e {
            fancy_regex::Error::CompileError(fancy_regex::CompileError::InnerError(inner))
                if inner.size_limit().is_some() =>
            {
                Error::TooManyFields
            }
            e => Error::RegexBuild(e),
        })?;
        let actual = re.captures_len() - 1;
        if actual != self.compiled.group_count {
            return Err(Error::CaptureCount {
                expected: self.compiled.group_count,
                actual,
            });
        }
        Ok(re)
    }

    fn search_regex(&self) -> Result<&Regex> {
        self.search_re
            .get_or_init(|| self.build_regex(&self.compiled.expression))
            .as_ref()
            .map_err(Clone::clone)
    }

    fn match_regex(&self) -> Result<&Regex> {
        self.match_re
            .get_or_init(|| self.build_regex(&format!(r"\A(?:{})\z", self.compiled.expression)))
            .as_ref()
            .map_err(Clone::clone)
    }

    // ============ Exact Match ============

    /// Matches the whole of `subject`.
    pub fn parse(&self, subject: &str) -> Result<Option<ParseResult>> {
        self.parse_match(subject)?
            .map(|m| m.evaluate_result())
            .transpose()
    }

    /// Like [`Parser::parse`] but leaves conversion to the caller.
    pub fn parse_match<'s>(&self, subject: &'s str) -> Result<Option<Match<'_, 's>>> {
        let re = self.match_regex()?;
        let captures = re.captures(subject).map_err(Error::RegexRun)?;
        Ok(captures.map(|captures| Match {
            parser: self,
            captures,
        }))
    }

    // ============ Search ============

    pub fn search(&self, subject: &str) -> Result<Option<ParseResult>> {
        self.search_range(subject, 0, subject.len())
    }

    /// Searches `subject[..end]` starting at byte `start`.
    pub fn search_range(&self, subject: &str, start: usize, end: usize) -> Result<Option<ParseResult>> {
        self.search_match_range(subject, start, end)?
            .map(|m| m.evaluate_result())
            .transpose()
    }

    pub fn search_match<'s>(&self, subject: &'s str) -> Result<Option<Match<'_, 's>>> {
        self.search_match_range(subject, 0, subject.len())
    }

    pub fn search_match_range<'s>(
        &self,
        subject: &'s str,
        start: usize,
        end: usize,
    ) -> Result<Option<Match<'_, 's>>> {
        let re = self.search_regex()?;
        let (haystack, start) = bounded(subject, start, end);
        if start > haystack.len() {
            return Ok(None);
        }
        let captures = re
            .captures_from_pos(haystack, start)
            .map_err(Error::RegexRun)?;
        Ok(captures.map(|captures| Match {
            parser: self,
            captures,
        }))
    }

    // ============ Find All ============

    pub fn find_all<'s>(&self, subject: &'s str) -> Result<FindAll<'_, 's>> {
        self.find_all_range(subject, 0, subject.len())
    }

    /// Successive non-overlapping results in `subject[start..end]`.
    pub fn find_all_range<'s>(&self, subject: &'s str, start: usize, end: usize) -> Result<FindAll<'_, 's>> {
        FindAll::new(Cow::Borrowed(self), subject, start, end)
    }

    pub fn find_all_matches<'s>(&self, subject: &'s str) -> Result<FindMatches<'_, 's>> {
        self.find_all_matches_range(subject, 0, subject.len())
    }

    pub fn find_all_matches_range<'s>(
        &self,
        subject: &'s str,
        start: usize,
        end: usize,
    ) -> Result<FindMatches<'_, 's>> {
        let re = self.search_regex()?;
        let (haystack, pos) = bounded(subject, start, end);
        Ok(FindMatches {
            parser: self,
            re,
            haystack,
            pos,
        })
    }
}

/// Clips `subject` to `..end` and moves `start` onto a char boundary.
fn bounded(subject: &str, start: usize, end: usize) -> (&str, usize) {
    let mut end = end.min(subject.len());
    while !subject.is_char_boundary(end) {
        end -= 1;
    }
    let haystack = &subject[..end];
    let mut start = start;
    while start < haystack.len() && !haystack.is_char_boundary(start) {
        start += 1;
    }
    (haystack, start)
}

fn next_char(s: &str, i: usize) -> usize {
    s.get(i..)
        .and_then(|rest| rest.chars().next())
        .map_or(i + 1, |c| i + c.len_utf8())
}

/// The next match at or after `*pos`. Moves `*pos` past it, or past the end
/// of `haystack` once nothing is left.
fn next_captures<'s>(re: &Regex, haystack: &'s str, pos: &mut usize) -> Option<Result<Captures<'s>>> {
    if *pos > haystack.len() {
        return None;
    }
    let caps = match re.captures_from_pos(haystack, *pos) {
        Ok(Some(caps)) => caps,
        Ok(None) => {
            *pos = haystack.len() + 1;
            return None;
        }
        Err(e) => {
            *pos = haystack.len() + 1;
            return Some(Err(Error::RegexRun(e)));
        }
    };
    let (start, end) = caps.get(0).map(|m| (m.start(), m.end()))?;
    *pos = if start == end {
        next_char(haystack, end)
    } else {
        end
    };
    trace!(start, end, "find_all advanced");
    Some(Ok(caps))
}

// ============ Match Types ============

/// A successful match whose fields have not been converted yet.
#[derive(Debug)]
pub struct Match<'p, 's> {
    parser: &'p Parser,
    captures: Captures<'s>,
}

impl<'p, 's> Match<'p, 's> {
    /// Byte range of the whole match.
    pub fn span(&self) -> Range<usize> {
        self.captures.get(0).map_or(0..0, |m| m.start()..m.end())
    }

    pub fn as_str(&self) -> &'s str {
        self.captures.get(0).map_or("", |m| m.as_str())
    }

    pub fn parser(&self) -> &'p Parser {
        self.parser
    }

    pub fn evaluate_result(&self) -> Result<ParseResult> {
        evaluate(&self.parser.compiled.fields, &self.captures)
    }
}

/// Iterator over successive results. Ends at the first position with no
/// further match.
#[derive(Debug)]
pub struct FindAll<'p, 's> {
    parser: Cow<'p, Parser>,
    haystack: &'s str,
    pos: usize,
}

impl<'p, 's> FindAll<'p, 's> {
    pub(crate) fn new(parser: Cow<'p, Parser>, subject: &'s str, start: usize, end: usize) -> Result<Self> {
        parser.search_regex()?;
        let (haystack, pos) = bounded(subject, start, end);
        Ok(FindAll {
            parser,
            haystack,
            pos,
        })
    }
}

impl Iterator for FindAll<'_, '_> {
    type Item = Result<ParseResult>;

    fn next(&mut self) -> Option<Self::Item> {
        let re = match self.parser.search_regex() {
            Ok(re) => re,
            Err(e) => {
                self.pos = self.haystack.len() + 1;
                return Some(Err(e));
            }
        };
        let fields = &self.parser.compiled.fields;
        next_captures(re, self.haystack, &mut self.pos)
            .map(|caps| caps.and_then(|caps| evaluate(fields, &caps)))
    }
}

/// Like [`FindAll`] but yields unconverted [`Match`]es.
#[derive(Debug)]
pub struct FindMatches<'p, 's> {
    parser: &'p Parser,
    re: &'p Regex,
    haystack: &'s str,
    pos: usize,
}

impl<'p, 's> Iterator for FindMatches<'p, 's> {
    type Item = Result<Match<'p, 's>>;

    fn next(&mut self) -> Option<Self::Item> {
        let parser = self.parser;
        next_captures(self.re, self.haystack, &mut self.pos)
            .map(|caps| caps.map(|captures| Match { parser, captures }))
    }
}
