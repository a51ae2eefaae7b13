//! Date and time fields: the eight `t?` codes and strptime-style directive runs.
//!
//! Every pattern here carries its own capturing groups. Converters receive the
//! index of the field's wrapping group and read their sub-captures relative to it.

use crate::error::ConvertError;
use crate::value::Value;
use chrono::{Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use fancy_regex::Captures;

const MONTHS_SHORT: &str = "(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)";
const MONTHS_FULL: &str =
    "(?:January|February|March|April|May|June|July|August|September|October|November|December)";
const MONTHS_ALL: &str = "(?:January|February|March|April|May|June|July|August|September|\
                          October|November|December|Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sept|Sep|\
                          Oct|Nov|Dec)";
const DAYS_SHORT: &str = "(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun)";
const DAYS_FULL: &str = "(?:Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)";
const TIME: &str = r"([0-9]{1,2}:[0-9]{1,2}(?::[0-9]{1,2}(?:\.[0-9]+)?)?)";
const AM: &str = r"(\s+[AP]M)";
const TZ: &str = r"(\s+[-+][0-9]{1,2}:?[0-9]{2})";

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

// ============ Fixed Formats ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    /// `ti`: ISO 8601.
    Iso,
    /// `te`: RFC 2822 e-mail.
    Email,
    /// `tg`: day/month/year.
    Global,
    /// `ta`: month/day/year.
    American,
    /// `tc`: ctime().
    Ctime,
    /// `th`: HTTP access log.
    HttpLog,
    /// `ts`: syslog, no year.
    Syslog,
    /// `tt`: time of day only.
    Time,
}

/// Where a date lives in the captures, relative to the wrapping group.
#[derive(Debug, Clone, Copy)]
enum DateLayout {
    Ymd(usize),
    Dmy(usize),
    Mdy(usize),
    Parts {
        month: usize,
        day: usize,
        year: Option<usize>,
    },
    None,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    date: DateLayout,
    hms: usize,
    am: Option<usize>,
    tz: Option<usize>,
}

impl DateKind {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "ti" => DateKind::Iso,
            "te" => DateKind::Email,
            "tg" => DateKind::Global,
            "ta" => DateKind::American,
            "tc" => DateKind::Ctime,
            "th" => DateKind::HttpLog,
            "ts" => DateKind::Syslog,
            "tt" => DateKind::Time,
            _ => return None,
        })
    }

    pub fn pattern(self) -> String {
        match self {
            DateKind::Iso => format!(
                r"([0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}})(?:(?:\s+|T){TIME})?(Z|\s*[-+][0-9]{{2}}:?[0-9]{{2}})?"
            ),
            DateKind::Email => format!(
                r"(?:{DAYS_SHORT},\s+)?([0-9]{{1,2}}\s+{MONTHS_SHORT}\s+[0-9]{{4}})\s+{TIME}{TZ}"
            ),
            DateKind::Global => format!(
                r"([0-9]{{1,2}}[-/](?:[0-9]{{1,2}}|{MONTHS_ALL})[-/][0-9]{{4}})(?:\s+{TIME})?{AM}?{TZ}?"
            ),
            DateKind::American => format!(
                r"((?:[0-9]{{1,2}}|{MONTHS_ALL})[-/][0-9]{{1,2}}[-/][0-9]{{4}})(?:\s+{TIME})?{AM}?{TZ}?"
            ),
            DateKind::Ctime => format!(
                r"{DAYS_SHORT}\s+({MONTHS_SHORT})\s+([0-9]{{1,2}})\s+{TIME}\s+([0-9]{{4}})"
            ),
            DateKind::HttpLog => {
                format!(r"([0-9]{{1,2}}[-/]{MONTHS_SHORT}[-/][0-9]{{4}}):{TIME}{TZ}")
            }
            DateKind::Syslog => format!(r"({MONTHS_SHORT})\s+([0-9]{{1,2}})\s+{TIME}"),
            DateKind::Time => format!("{TIME}{AM}?{TZ}?"),
        }
    }

    pub fn group_count(self) -> usize {
        match self {
            DateKind::Global | DateKind::American | DateKind::Ctime => 4,
            _ => 3,
        }
    }

    fn layout(self) -> Layout {
        match self {
            DateKind::Iso => Layout {
                date: DateLayout::Ymd(1),
                hms: 2,
                am: None,
                tz: Some(3),
            },
            DateKind::Email | DateKind::HttpLog => Layout {
                date: DateLayout::Dmy(1),
                hms: 2,
                am: None,
                tz: Some(3),
            },
            DateKind::Global => Layout {
                date: DateLayout::Dmy(1),
                hms: 2,
                am: Some(3),
                tz: Some(4),
            },
            DateKind::American => Layout {
                date: DateLayout::Mdy(1),
                hms: 2,
                am: Some(3),
                tz: Some(4),
            },
            DateKind::Ctime => Layout {
                date: DateLayout::Parts {
                    month: 1,
                    day: 2,
                    year: Some(4),
                },
                hms: 3,
                am: None,
                tz: None,
            },
            DateKind::Syslog => Layout {
                date: DateLayout::Parts {
                    month: 1,
                    day: 2,
                    year: None,
                },
                hms: 3,
                am: None,
                tz: None,
            },
            DateKind::Time => Layout {
                date: DateLayout::None,
                hms: 1,
                am: Some(2),
                tz: Some(3),
            },
        }
    }

    /// Assembles a value from the sub-captures following group `base`.
    pub fn convert(self, caps: &Captures, base: usize) -> Result<Value, ConvertError> {
        let layout = self.layout();
        let group = |i: usize| caps.get(base + i).map(|m| m.as_str());
        let whole = group(0).unwrap_or_default();

        let date = match layout.date {
            DateLayout::None => None,
            DateLayout::Ymd(i) => {
                let [y, m, d] = split_date(group(i).unwrap_or_default(), whole)?;
                Some(make_date(number(y, whole)?, month(m)?, number(d, whole)?, whole)?)
            }
            DateLayout::Dmy(i) => {
                let [d, m, y] = split_date(group(i).unwrap_or_default(), whole)?;
                Some(make_date(number(y, whole)?, month(m)?, number(d, whole)?, whole)?)
            }
            DateLayout::Mdy(i) => {
                let [m, d, y] = split_date(group(i).unwrap_or_default(), whole)?;
                Some(make_date(number(y, whole)?, month(m)?, number(d, whole)?, whole)?)
            }
            DateLayout::Parts { month: m, day, year } => {
                let year = match year.and_then(group) {
                    Some(y) => number(y, whole)?,
                    None => Local::now().year(),
                };
                let m = month(group(m).unwrap_or_default())?;
                let d = number(group(day).unwrap_or_default(), whole)?;
                Some(make_date(year, m, d, whole)?)
            }
        };

        let mut time = match group(layout.hms) {
            Some(hms) => parse_hms(hms, whole)?,
            None => NaiveTime::MIN,
        };
        if let Some(am) = layout.am.and_then(group) {
            time = apply_meridiem(time, am.trim(), whole)?;
        }
        let offset = layout.tz.and_then(group).map(parse_offset).transpose()?;

        match (date, offset) {
            (Some(date), None) => Ok(Value::DateTime(date.and_time(time))),
            (Some(date), Some(offset)) => localize(date.and_time(time), offset, whole),
            (None, None) => Ok(Value::Time(time)),
            (None, Some(offset)) => Ok(Value::TimeTz(time, offset)),
        }
    }
}

fn invalid(text: &str) -> ConvertError {
    ConvertError::DateTime(text.to_string())
}

fn number<T: std::str::FromStr>(text: &str, whole: &str) -> Result<T, ConvertError> {
    text.trim().parse().map_err(|_| invalid(whole))
}

fn split_date<'a>(text: &'a str, whole: &str) -> Result<[&'a str; 3], ConvertError> {
    let mut parts = text
        .split(|c: char| c == '-' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), Some(c)) => Ok([a, b, c]),
        _ => Err(invalid(whole)),
    }
}

/// A month given as a number or by name (only the first three letters count).
pub(crate) fn month(text: &str) -> Result<u32, ConvertError> {
    if let Ok(n) = text.parse::<u32>() {
        return Ok(n);
    }
    let prefix: String = text.chars().take(3).collect::<String>().to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| *name == prefix)
        .map(|i| i as u32 + 1)
        .ok_or_else(|| ConvertError::Month(text.to_string()))
}

fn make_date(year: i32, month: u32, day: u32, whole: &str) -> Result<NaiveDate, ConvertError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid(whole))
}

/// Pads or truncates a fractional-second digit run to microseconds.
fn micros(fraction: &str) -> u32 {
    let digits: String = fraction.chars().chain(std::iter::repeat('0')).take(6).collect();
    digits.parse().unwrap_or(0)
}

fn parse_hms(text: &str, whole: &str) -> Result<NaiveTime, ConvertError> {
    let mut parts = text.split(':');
    let hour: u32 = number(parts.next().unwrap_or_default(), whole)?;
    let minute: u32 = number(parts.next().unwrap_or_default(), whole)?;
    let (second, micro) = match parts.next() {
        Some(sec) => match sec.split_once('.') {
            Some((s, frac)) => (number(s, whole)?, micros(frac)),
            None => (number(sec, whole)?, 0),
        },
        None => (0, 0),
    };
    NaiveTime::from_hms_micro_opt(hour, minute, second, micro).ok_or_else(|| invalid(whole))
}

/// 12 AM is midnight; every PM hour but 12 moves forward by twelve.
fn apply_meridiem(time: NaiveTime, marker: &str, whole: &str) -> Result<NaiveTime, ConvertError> {
    use chrono::Timelike;
    let hour = time.hour();
    let hour = if marker.eq_ignore_ascii_case("pm") && hour != 12 {
        hour + 12
    } else if marker.eq_ignore_ascii_case("am") && hour == 12 {
        0
    } else {
        hour
    };
    time.with_hour(hour).ok_or_else(|| invalid(whole))
}

/// `Z`, or a signed `H[H][:]MM` offset.
fn parse_offset(text: &str) -> Result<FixedOffset, ConvertError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| invalid(text));
    }
    let (sign, digits) = match text.split_at_checked(1) {
        Some(("-", rest)) => (-1, rest),
        Some(("+", rest)) => (1, rest),
        _ => return Err(invalid(text)),
    };
    let (hours, minutes) = match digits.split_once(':') {
        Some(split) => split,
        None if digits.len() > 2 => digits.split_at(digits.len() - 2),
        None => (digits, "0"),
    };
    let hours: i32 = number(hours, text)?;
    let minutes: i32 = number(minutes, text)?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(|| invalid(text))
}

fn localize(dt: NaiveDateTime, offset: FixedOffset, whole: &str) -> Result<Value, ConvertError> {
    offset
        .from_local_datetime(&dt)
        .single()
        .map(Value::DateTimeTz)
        .ok_or_else(|| invalid(whole))
}

// ============ Strptime Directives ============

/// A run of `%x` directives compiled into one capture group per directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrptimeFormat {
    source: String,
    pattern: String,
    directives: Vec<char>,
}

fn directive_pattern(directive: char) -> Option<String> {
    Some(match directive {
        'a' => DAYS_SHORT.to_string(),
        'A' => DAYS_FULL.to_string(),
        'b' => MONTHS_SHORT.to_string(),
        'B' => MONTHS_FULL.to_string(),
        'd' | 'm' | 'H' | 'I' | 'M' | 'S' | 'U' | 'W' => r"[0-9]{1,2}".to_string(),
        'f' => r"[0-9]{1,6}".to_string(),
        'j' => r"[0-9]{1,3}".to_string(),
        'w' => r"[0-9]".to_string(),
        'y' => r"[0-9]{2}".to_string(),
        'Y' => r"[0-9]{4}".to_string(),
        'p' => "(?:am|pm|AM|PM)".to_string(),
        'z' => r"[-+][0-9]{2}(?::?[0-9]{2})?(?::?[0-9]{2})?".to_string(),
        _ => return None,
    })
}

const DATE_DIRECTIVES: &str = "aAwdbBmyYjUW";
const TIME_DIRECTIVES: &str = "HIpMSfz";

impl StrptimeFormat {
    /// Compiles `source`, or returns `None` when it holds no directives or an
    /// unknown one.
    pub fn parse(source: &str) -> Option<Self> {
        let mut pattern = String::new();
        let mut directives = Vec::new();
        let mut chars = source.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
                continue;
            }
            match chars.next()? {
                '%' => pattern.push('%'),
                d => {
                    pattern.push('(');
                    pattern.push_str(&directive_pattern(d)?);
                    pattern.push(')');
                    directives.push(d);
                }
            }
        }
        if directives.is_empty() {
            return None;
        }
        Some(StrptimeFormat {
            source: source.to_string(),
            pattern,
            directives,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn group_count(&self) -> usize {
        self.directives.len()
    }

    fn has_any(&self, set: &str) -> bool {
        self.directives.iter().any(|d| set.contains(*d))
    }

    pub fn convert(&self, caps: &Captures, base: usize) -> Result<Value, ConvertError> {
        let whole = caps.get(base).map(|m| m.as_str()).unwrap_or_default();
        let mut year = None;
        let mut month_of_year = None;
        let mut day = None;
        let mut ordinal = None;
        let mut hour = None;
        let mut hour12 = None;
        let mut pm = false;
        let mut minute = 0;
        let mut second = 0;
        let mut micro = 0;
        let mut offset = None;

        for (i, directive) in self.directives.iter().enumerate() {
            let Some(text) = caps.get(base + 1 + i).map(|m| m.as_str()) else {
                continue;
            };
            match directive {
                'Y' => year = Some(number(text, whole)?),
                'y' => {
                    let short: i32 = number(text, whole)?;
                    year = Some(if short < 69 { 2000 + short } else { 1900 + short });
                }
                'm' | 'b' | 'B' => month_of_year = Some(month(text)?),
                'd' => day = Some(number(text, whole)?),
                'j' => ordinal = Some(number(text, whole)?),
                'H' => hour = Some(number(text, whole)?),
                'I' => hour12 = Some(number::<u32>(text, whole)?),
                'p' => pm = text.eq_ignore_ascii_case("pm"),
                'M' => minute = number(text, whole)?,
                'S' => second = number(text, whole)?,
                'f' => micro = micros(text),
                'z' => offset = Some(parse_strptime_offset(text)?),
                _ => {}
            }
        }

        let hour = match (hour, hour12) {
            (Some(h), _) => h,
            (None, Some(h)) => h % 12 + if pm { 12 } else { 0 },
            (None, None) => 0,
        };
        let time = NaiveTime::from_hms_micro_opt(hour, minute, second, micro)
            .ok_or_else(|| invalid(whole))?;

        let is_date = self.has_any(DATE_DIRECTIVES);
        let is_time = self.has_any(TIME_DIRECTIVES);
        if !is_date {
            return Ok(Value::Time(time));
        }

        let year = year.unwrap_or_else(|| Local::now().year());
        let date = match (ordinal, month_of_year, day) {
            (Some(ordinal), None, None) => NaiveDate::from_yo_opt(year, ordinal),
            _ => NaiveDate::from_ymd_opt(year, month_of_year.unwrap_or(1), day.unwrap_or(1)),
        }
        .ok_or_else(|| invalid(whole))?;

        if !is_time {
            return Ok(Value::Date(date));
        }
        match offset {
            Some(offset) => localize(date.and_time(time), offset, whole),
            None => Ok(Value::DateTime(date.and_time(time))),
        }
    }
}

/// `±HH[[:]MM[[:]SS]]`.
fn parse_strptime_offset(text: &str) -> Result<FixedOffset, ConvertError> {
    let sign = if text.starts_with('-') { -1 } else { 1 };
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    let field = |range: std::ops::Range<usize>| -> i32 {
        digits.get(range).and_then(|d| d.parse().ok()).unwrap_or(0)
    };
    let seconds = field(0..2) * 3600 + field(2..4) * 60 + field(4..6);
    FixedOffset::east_opt(sign * seconds).ok_or_else(|| invalid(text))
}
