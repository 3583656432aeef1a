use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]+( [A-Za-z]+)*$").expect("name pattern compiles")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+[._]?[a-z0-9]+@\w+\.\w{2,3}$").expect("email pattern compiles")
});

/// Hire date layouts tried in order.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m-%d-%y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Outcome of validating one CSV cell.
///
/// `Blank` means the cell was present but empty: it clears the stored column
/// on update. `Invalid` is never written anywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Value(T),
    Blank,
    Invalid(FieldError),
}

impl<T> Field<T> {
    pub fn error(&self) -> Option<&FieldError> {
        match self {
            Field::Invalid(e) => Some(e),
            _ => None,
        }
    }

    /// Value to store on insert.
    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            Field::Blank | Field::Invalid(_) => None,
        }
    }

    /// Change to apply on update: `None` keeps the column, `Some(None)` clears it.
    pub fn into_change(self) -> Option<Option<T>> {
        match self {
            Field::Value(v) => Some(Some(v)),
            Field::Blank => Some(None),
            Field::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    BlankName,
    InvalidName(String),
    BlankUserEmail,
    InvalidUserEmail(String),
    InvalidEmail(String),
    InvalidManager(String),
    SelfManaged(String),
    InvalidSalary(String),
    InvalidHireDate(String),
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldError::BlankName => write!(f, "user name was blank"),
            FieldError::InvalidName(raw) => write!(f, "{raw}: is not a valid name"),
            FieldError::BlankUserEmail => write!(f, "user email was blank"),
            FieldError::InvalidUserEmail(raw) => write!(f, "{raw}: is not a valid user email"),
            FieldError::InvalidEmail(raw) => write!(f, "{raw}: is not a valid email"),
            FieldError::InvalidManager(raw) => write!(f, "{raw}: is not a valid manager id"),
            FieldError::SelfManaged(email) => write!(f, "{email}: cannot be their own manager"),
            FieldError::InvalidSalary(raw) => write!(f, "{raw}: is not a valid salary"),
            FieldError::InvalidHireDate(raw) => write!(f, "{raw}: is not a valid date"),
        }
    }
}

pub fn validate_name(raw: &str) -> Field<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Field::Invalid(FieldError::BlankName);
    }
    if NAME_RE.is_match(name) {
        Field::Value(name.to_string())
    } else {
        Field::Invalid(FieldError::InvalidName(raw.to_string()))
    }
}

/// Lower-case and trim without checking the shape.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn validate_email(raw: &str) -> Field<String> {
    let email = normalize_email(raw);
    if email.is_empty() {
        return Field::Blank;
    }
    if EMAIL_RE.is_match(&email) {
        Field::Value(email)
    } else {
        Field::Invalid(FieldError::InvalidEmail(raw.to_string()))
    }
}

/// A user's own email is mandatory, so blank is an error here.
pub fn validate_user_email(raw: &str) -> Field<String> {
    match validate_email(raw) {
        Field::Value(email) => Field::Value(email),
        Field::Blank => Field::Invalid(FieldError::BlankUserEmail),
        Field::Invalid(_) => Field::Invalid(FieldError::InvalidUserEmail(raw.to_string())),
    }
}

pub fn process_salary(raw: &str) -> Field<i64> {
    let salary = raw.trim();
    if salary.is_empty() {
        return Field::Blank;
    }
    match salary.parse::<i64>() {
        Ok(value) => Field::Value(value),
        Err(_) => Field::Invalid(FieldError::InvalidSalary(raw.to_string())),
    }
}

pub fn process_hire_date(raw: &str) -> Field<NaiveDate> {
    let date = raw.trim();
    if date.is_empty() {
        return Field::Blank;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| {
            NaiveDate::parse_from_str(date, format)
                .ok()
                // `%Y` also reads "18" as year 18; leave short years to `%y`.
                .filter(|parsed| !format.contains("%Y") || parsed.year() >= 100)
        })
        .map_or_else(
            || Field::Invalid(FieldError::InvalidHireDate(raw.to_string())),
            Field::Value,
        )
}
