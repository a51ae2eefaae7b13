//! Parse strings using `format()`-style templates.
//!
//! A template like `"It's {}, I love it!"` is compiled into a regular
//! expression. Matching a string against it pulls the field values back out,
//! converted according to each field's type code.
//!
//! # Example
//!
//! ```
//! use unformat::{parse, search, Parser, Value};
//!
//! let r = parse("{} is {:d} years old", "Brian is 42 years old")
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(r[0], Value::from("Brian"));
//! assert_eq!(r[1], Value::Int(42));
//!
//! // Named fields land in `named()`
//! let r = search("Age: {age:d}\n", "Name: Rufus\nAge: 42\nColor: red\n")
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(r["age"], Value::Int(42));
//!
//! // No match is Ok(None), not an error
//! assert!(parse("{:d} apples", "many apples").unwrap().is_none());
//!
//! // Compile once, match many times
//! let p = Parser::new("<{:d}>").unwrap();
//! let total: i64 = p
//!     .find_all("<1> <2> <3>")
//!     .unwrap()
//!     .map(|r| r.unwrap()[0].as_int().unwrap())
//!     .sum();
//! assert_eq!(total, 6);
//! ```

mod compiler;
mod datetime;
mod error;
mod extra;
mod parser;
mod result;
mod spec;
mod types;
mod value;

pub use datetime::{DateKind, StrptimeFormat};
pub use error::{ConvertError, Error, Result};
pub use extra::{ExtraType, ExtraTypes, TypeBuilder};
pub use parser::{FindAll, FindMatches, Match, Parser, ParserBuilder};
pub use result::{FieldKey, ParseResult};
pub use spec::{extract_format, Align, Cardinality, FieldSpec, Sign};
pub use types::{int_convert, TypeKind};
pub use value::Value;

use std::borrow::Cow;

/// Matches the whole of `subject` against `template`.
///
/// The free functions compile with default options: no extra types, and
/// case-insensitive matching. Use [`Parser::builder`] to register extra
/// types or match case-sensitively:
///
/// ```
/// use unformat::{ExtraType, Parser, Value};
///
/// let shout = ExtraType::new(|s| Ok(Value::from(s.to_uppercase())));
/// let p = Parser::builder("{:Shout} world")
///     .extra_type("Shout", shout)
///     .case_sensitive(true)
///     .build()
///     .unwrap();
/// assert_eq!(p.parse("hello world").unwrap().unwrap()[0], Value::from("HELLO"));
/// assert!(p.parse("hello WORLD").unwrap().is_none());
/// ```
pub fn parse(template: &str, subject: &str) -> Result<Option<ParseResult>> {
    Parser::new(template)?.parse(subject)
}

/// Finds the first place in `subject` that matches `template`.
///
/// To search only part of `subject`, use [`Parser::search_range`].
pub fn search(template: &str, subject: &str) -> Result<Option<ParseResult>> {
    Parser::new(template)?.search(subject)
}

/// Every non-overlapping match of `template` in `subject`.
///
/// To limit the scan to a range, use [`Parser::find_all_range`].
pub fn find_all<'s>(template: &str, subject: &'s str) -> Result<FindAll<'static, 's>> {
    let parser = Parser::new(template)?;
    FindAll::new(Cow::Owned(parser), subject, 0, subject.len())
}

/// Compiles `template` for repeated use. Equivalent to [`Parser::new`]; see
/// [`Parser::builder`] for extra types and case sensitivity.
pub fn compile(template: &str) -> Result<Parser> {
    Parser::new(template)
}
