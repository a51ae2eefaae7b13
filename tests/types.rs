use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use pretty_assertions::assert_eq;
use unformat::{Cardinality, ConvertError, Error, ExtraType, Parser, TypeBuilder, Value};

fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

fn zoned(offset_secs: i32, y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> Value {
    Value::DateTimeTz(
        FixedOffset::east_opt(offset_secs)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, mi, s)
            .unwrap(),
    )
}

fn first(template: &str, subject: &str) -> Value {
    Parser::new(template)
        .unwrap()
        .parse(subject)
        .unwrap()
        .unwrap_or_else(|| panic!("{:?} did not match {:?}", template, subject))[0]
        .clone()
}

fn number() -> ExtraType {
    ExtraType::new(|text| {
        text.parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ConvertError::custom(format!("not a number: {}", text)))
    })
    .with_pattern(r"\d+", 0)
}

fn person() -> ExtraType {
    TypeBuilder::make_choice(["Alice", "Bob", "Charly"])
}

// ============ Date and time codes ============

#[test]
fn test_iso() {
    assert_eq!(
        first("{:ti}", "1972-01-20T10:21:36Z"),
        zoned(0, 1972, 1, 20, 10, 21, 36)
    );
    assert_eq!(
        first("{:ti}", "1972-01-20 10:21"),
        Value::DateTime(ymd_hms(1972, 1, 20, 10, 21, 0))
    );
    assert_eq!(
        first("{:ti}", "1972-01-20"),
        Value::DateTime(ymd_hms(1972, 1, 20, 0, 0, 0))
    );
    assert_eq!(
        first("{:ti}", "1972-01-20T10:21:36-05:30"),
        zoned(-19800, 1972, 1, 20, 10, 21, 36)
    );
}

#[test]
fn test_email() {
    assert_eq!(
        first("{:te}", "Mon, 20 Jan 1972 10:21:36 +1000"),
        zoned(36000, 1972, 1, 20, 10, 21, 36)
    );
    assert_eq!(
        first("{:te}", "20 Jan 1972 10:21:36 -0500"),
        zoned(-18000, 1972, 1, 20, 10, 21, 36)
    );
}

#[test]
fn test_global_and_american() {
    assert_eq!(
        first("{:tg}", "20/1/1972 10:21:36 PM +1:00"),
        zoned(3600, 1972, 1, 20, 22, 21, 36)
    );
    assert_eq!(
        first("{:tg}", "20-Jan-1972"),
        Value::DateTime(ymd_hms(1972, 1, 20, 0, 0, 0))
    );
    assert_eq!(
        first("{:ta}", "1/20/1972 10:21:36 AM"),
        Value::DateTime(ymd_hms(1972, 1, 20, 10, 21, 36))
    );
    assert_eq!(
        first("{:ta}", "1/20/1972 12:21:36 AM"),
        Value::DateTime(ymd_hms(1972, 1, 20, 0, 21, 36))
    );
}

#[test]
fn test_ctime_and_http_log() {
    assert_eq!(
        first("{:tc}", "Sun Sep 16 01:03:52 1973"),
        Value::DateTime(ymd_hms(1973, 9, 16, 1, 3, 52))
    );
    assert_eq!(
        first("{:th}", "21/Nov/2011:10:21:36 +1000"),
        zoned(36000, 2011, 11, 21, 10, 21, 36)
    );
}

#[test]
fn test_time_only() {
    assert_eq!(
        first("{:tt}", "10:21:36 PM -5:30"),
        Value::TimeTz(
            NaiveTime::from_hms_opt(22, 21, 36).unwrap(),
            FixedOffset::east_opt(-19800).unwrap()
        )
    );
    assert_eq!(
        first("{:tt}", "12:45 PM"),
        Value::Time(NaiveTime::from_hms_opt(12, 45, 0).unwrap())
    );
}

#[test]
fn test_datetime_groups_do_not_shift_later_fields() {
    let r = Parser::new("{:ti} {:d} {n:tg} {m:d}")
        .unwrap()
        .parse("1972-01-20 5 20/1/1972 10:21 6")
        .unwrap()
        .unwrap();
    assert_eq!(r[1], Value::Int(5));
    assert_eq!(r["n"], Value::DateTime(ymd_hms(1972, 1, 20, 10, 21, 0)));
    assert_eq!(r["m"], Value::Int(6));
}

#[test]
fn test_impossible_date() {
    let err = Parser::new("{:ti}")
        .unwrap()
        .parse("2011-13-45")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Conversion {
            source: ConvertError::DateTime(_),
            ..
        }
    ));
}

// ============ strptime directives ============

#[test]
fn test_strptime_date() {
    assert_eq!(
        first("{:%Y-%m-%d}", "2023-04-05"),
        Value::Date(NaiveDate::from_ymd_opt(2023, 4, 5).unwrap())
    );
    assert_eq!(
        first("{:%b %d %Y}", "Mar 04 2021"),
        Value::Date(NaiveDate::from_ymd_opt(2021, 3, 4).unwrap())
    );
    assert_eq!(
        first("{:%Y/%j}", "2023/032"),
        Value::Date(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap())
    );
}

#[test]
fn test_strptime_datetime() {
    assert_eq!(
        first("{:%Y-%m-%d %H:%M:%S}", "2023-04-05 10:11:12"),
        Value::DateTime(ymd_hms(2023, 4, 5, 10, 11, 12))
    );
    assert_eq!(
        first("{:%Y-%m-%dT%H:%M:%S%z}", "2023-04-05T10:00:00+05:30"),
        zoned(19800, 2023, 4, 5, 10, 0, 0)
    );
}

#[test]
fn test_strptime_time() {
    assert_eq!(
        first("{:%H:%M}", "10:21"),
        Value::Time(NaiveTime::from_hms_opt(10, 21, 0).unwrap())
    );
    assert_eq!(
        first("{:%I:%M %p}", "02:15 PM"),
        Value::Time(NaiveTime::from_hms_opt(14, 15, 0).unwrap())
    );
    assert_eq!(
        first("{:%M:%S:%f}", "21:36:5"),
        Value::Time(NaiveTime::from_hms_micro_opt(0, 21, 36, 500_000).unwrap())
    );
}

// ============ Extra types ============

#[test]
fn test_extra_type_with_pattern() {
    let parser = Parser::builder("Answer: {:Number}")
        .extra_type("Number", number())
        .build()
        .unwrap();
    assert_eq!(parser.parse("Answer: 42").unwrap().unwrap()[0], Value::Int(42));
    assert!(parser.parse("Answer: many").unwrap().is_none());
}

#[test]
fn test_extra_type_default_pattern() {
    let shout = ExtraType::new(|text| Ok(Value::from(text.to_uppercase())));
    let parser = Parser::builder("{:Shout}!")
        .extra_type("Shout", shout)
        .build()
        .unwrap();
    assert_eq!(parser.parse("hey!").unwrap().unwrap()[0], Value::from("HEY"));
}

#[test]
fn test_extra_type_with_groups() {
    let yes_no = ExtraType::new(|text| Ok(Value::Bool(text.eq_ignore_ascii_case("yes"))))
        .with_pattern("(yes|no)", 1);
    let parser = Parser::builder("{:YesNo} {:d} {flag:YesNo}")
        .extra_type("YesNo", yes_no)
        .build()
        .unwrap();
    let r = parser.parse("yes 3 NO").unwrap().unwrap();
    assert_eq!(r.fixed(), &[Value::Bool(true), Value::Int(3)]);
    assert_eq!(r["flag"], Value::Bool(false));
}

#[test]
fn test_extra_type_group_count_checked() {
    let wrong = ExtraType::new(|text| Ok(Value::from(text))).with_pattern(r"(\d+)", 0);
    let err = Parser::builder("{:Wrong}")
        .extra_type("Wrong", wrong)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::GroupCountMismatch {
            declared: 0,
            actual: 1,
            ..
        }
    ));

    let broken = ExtraType::new(|text| Ok(Value::from(text))).with_pattern(r"(\d+", 1);
    let err = Parser::builder("{:Broken}")
        .extra_type("Broken", broken)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::CustomPattern { .. }));
}

#[test]
fn test_extra_type_shadows_builtin() {
    let parser = Parser::builder("{:d}")
        .extra_type("d", ExtraType::new(|text| Ok(Value::from(text))).with_pattern("[a-z]+", 0))
        .build()
        .unwrap();
    assert_eq!(parser.parse("abc").unwrap().unwrap()[0], Value::from("abc"));
    assert!(parser.parse("12").unwrap().is_none());
}

// ============ Cardinality ============

#[test]
fn test_zero_or_one() {
    let parser = Parser::builder("Hello {person:Person?}")
        .extra_type("Person", person())
        .build()
        .unwrap();
    assert_eq!(
        parser.parse("Hello Alice").unwrap().unwrap()["person"],
        Value::from("Alice")
    );
    assert_eq!(parser.parse("Hello ").unwrap().unwrap()["person"], Value::Null);
    assert!(parser.parse("Hello Zed").unwrap().is_none());
}

#[test]
fn test_one_or_more() {
    let parser = Parser::builder("Hello {people:Person+}")
        .extra_type("Person", person())
        .build()
        .unwrap();
    assert_eq!(
        parser.parse("Hello Alice, Bob,Charly").unwrap().unwrap()["people"],
        Value::Array(vec![
            Value::from("Alice"),
            Value::from("Bob"),
            Value::from("Charly")
        ])
    );
    assert!(parser.parse("Hello ").unwrap().is_none());
}

#[test]
fn test_zero_or_more() {
    let parser = Parser::builder("Hello {people:Person*}.")
        .extra_type("Person", person())
        .build()
        .unwrap();
    assert_eq!(
        parser.parse("Hello .").unwrap().unwrap()["people"],
        Value::Array(Vec::new())
    );
    assert_eq!(
        parser.parse("Hello Bob.").unwrap().unwrap()["people"],
        Value::Array(vec![Value::from("Bob")])
    );
}

#[test]
fn test_cardinality_fields_keep_later_groups() {
    let parser = Parser::builder("{a:Number+} {b:Number?} {c:d}")
        .extra_type("Number", number())
        .build()
        .unwrap();
    let r = parser.parse("1, 2 3 4").unwrap().unwrap();
    assert_eq!(r["a"], Value::Array(vec![Value::Int(1), Value::Int(2)]));
    assert_eq!(r["b"], Value::Int(3));
    assert_eq!(r["c"], Value::Int(4));
}

#[test]
fn test_builtin_types_reject_cardinality() {
    assert!(matches!(
        Parser::new("{:d+}").unwrap_err(),
        Error::SpecFormat { .. }
    ));
}

#[test]
fn test_list_with_other_separator() {
    let numbers = TypeBuilder::with_cardinality(&number(), Cardinality::OneOrMore, ";");
    let parser = Parser::builder("[{:Numbers}]")
        .extra_type("Numbers", numbers)
        .build()
        .unwrap();
    assert_eq!(
        parser.parse("[1; 2;3]").unwrap().unwrap()[0],
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn test_prebuilt_lists() {
    let parser = Parser::builder("{:Many}|{:Some}")
        .extra_type("Many", TypeBuilder::with_many(&number()))
        .extra_type("Some", TypeBuilder::with_zero_or_more(&number()))
        .build()
        .unwrap();
    let r = parser.parse("1,2|").unwrap().unwrap();
    assert_eq!(r[0], Value::Array(vec![Value::Int(1), Value::Int(2)]));
    assert_eq!(r[1], Value::Array(Vec::new()));
}

// ============ Enums and choices ============

#[test]
fn test_make_enum() {
    let parser = Parser::builder("Answer: {:YesNo}")
        .extra_type("YesNo", TypeBuilder::make_enum([("yes", true), ("no", false)]))
        .build()
        .unwrap();
    assert_eq!(parser.parse("Answer: YES").unwrap().unwrap()[0], Value::Bool(true));
    assert_eq!(parser.parse("Answer: no").unwrap().unwrap()[0], Value::Bool(false));
    assert!(parser.parse("Answer: maybe").unwrap().is_none());
}

#[test]
fn test_make_choice_returns_canonical_spelling() {
    let parser = Parser::builder("{:Color}")
        .extra_type("Color", TypeBuilder::make_choice(["red", "green"]))
        .build()
        .unwrap();
    assert_eq!(parser.parse("RED").unwrap().unwrap()[0], Value::from("red"));

    let parser = Parser::builder("{:Color}")
        .extra_type("Color", TypeBuilder::make_choice_indexed(["red", "green"]))
        .build()
        .unwrap();
    assert_eq!(
        parser.parse("green").unwrap().unwrap()[0],
        Value::Array(vec![Value::Int(1), Value::from("green")])
    );
}
