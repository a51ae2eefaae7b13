use thiserror::Error;

/// Errors raised while compiling a template or converting a match into values.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("format spec '{spec}' not recognised")]
    SpecFormat { spec: String },

    #[error("field '{name}' is repeated with a different spec ('{first}' then '{second}')")]
    RepeatedName {
        name: String,
        first: String,
        second: String,
    },

    #[error("too many fields: the compiled pattern exceeds the regex size limit")]
    TooManyFields,

    #[error("field name '{field}' cannot be turned into a capture group name")]
    UnsupportedGroupName { field: String },

    #[error("custom type '{name}' pattern has {actual} capturing groups but declares {declared}")]
    GroupCountMismatch {
        name: String,
        declared: usize,
        actual: usize,
    },

    #[error("custom type '{name}' has an invalid pattern: {source}")]
    CustomPattern {
        name: String,
        #[source]
        source: fancy_regex::Error,
    },

    #[error("compiled pattern has {actual} capture groups but its fields account for {expected}")]
    CaptureCount { expected: usize, actual: usize },

    #[error("failed to build pattern regex: {0}")]
    RegexBuild(#[from] fancy_regex::Error),

    #[error("regex engine gave up while matching: {0}")]
    RegexRun(#[source] fancy_regex::Error),

    #[error("field '{name}' clashes with another field sharing its base name")]
    NameConflict { name: String },

    #[error("failed to convert field '{field}': {source}")]
    Conversion {
        field: String,
        #[source]
        source: ConvertError,
    },
}

/// Errors returned by type converters, built-in or caller supplied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("invalid base-{base} integer '{text}'")]
    Integer { text: String, base: u32 },

    #[error("integer '{0}' does not fit in 64 bits")]
    Overflow(String),

    #[error("invalid number '{0}'")]
    Float(String),

    #[error("invalid decimal '{0}'")]
    Decimal(String),

    #[error("unknown month '{0}'")]
    Month(String),

    #[error("invalid date or time '{0}'")]
    DateTime(String),

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("{0}")]
    Custom(String),
}

impl ConvertError {
    pub fn custom(message: impl Into<String>) -> Self {
        ConvertError::Custom(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
