//! Conversion between field values and their storage literals.

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::registry::ColumnDescriptor;

use super::{Value, ValueKind};

/// Storage format of dates, always UTC and truncated to the second.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQL flavour used when rendering literals and identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    MySql,
    Sqlite,
}

impl Dialect {
    /// Detect the dialect from a connection URL.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();

        if lower.starts_with("mysql") || lower.starts_with("mariadb") {
            Some(Self::MySql)
        } else if lower.starts_with("sqlite") {
            Some(Self::Sqlite)
        } else {
            None
        }
    }

    /// Quote and escape a string literal.
    #[must_use]
    pub fn quote_str(self, value: &str) -> String {
        match self {
            Self::MySql => format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'")),
            Self::Sqlite => format!("'{}'", value.replace('\'', "''")),
        }
    }

    #[must_use]
    pub fn quote_identifier(self, identifier: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", identifier.replace('`', "``")),
            Self::Sqlite => format!("\"{}\"", identifier.replace('"', "\"\"")),
        }
    }
}

/// A marshalled value, ready to be rendered into a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Literal {
    #[must_use]
    pub fn render(&self, dialect: Dialect) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(e) => e.to_string(),
            Self::Decimal(e) => e.to_string(),
            Self::Boolean(true) => "TRUE".to_string(),
            Self::Boolean(false) => "FALSE".to_string(),
            Self::Text(e) => dialect.quote_str(e),
            Self::Timestamp(e) => format!("'{}'", e.format(DATE_FORMAT)),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(Dialect::default()))
    }
}

/// Marshal a field value according to its column descriptor.
///
/// Related entities have already been substituted by their primary key when the value was read
/// from the entity.
///
/// # Panics
///
/// If the value does not fit the column kind. Booleans accept numbers (zero is `FALSE`), dates
/// accept parseable strings; nothing else is coerced.
#[must_use]
pub fn marshal(value: &Value, column: &ColumnDescriptor) -> Literal {
    if value.is_null() {
        return Literal::Null;
    }

    match (column.kind, value) {
        (ValueKind::Number, Value::Integer(e)) => Literal::Integer(*e),
        (ValueKind::Number, Value::Float(e)) => {
            assert!(
                e.is_finite(),
                "column `{}` cannot store the non-finite number {e}",
                column.physical_name
            );
            Literal::Decimal(*e)
        }
        (ValueKind::Boolean, Value::Boolean(e)) => Literal::Boolean(*e),
        (ValueKind::Boolean, Value::Integer(e)) => Literal::Boolean(*e != 0),
        (ValueKind::Boolean, Value::Float(e)) => Literal::Boolean(*e != 0.0),
        (ValueKind::String, Value::String(e)) => Literal::Text(e.clone()),
        (ValueKind::Date, Value::Date(e)) => Literal::Timestamp(*e),
        (ValueKind::Date, Value::String(e)) => Literal::Timestamp(parse_date(e).unwrap_or_else(
            || {
                panic!(
                    "column `{}` expects a date, got unparseable string {e:?}",
                    column.physical_name
                )
            },
        )),
        (kind, value) => panic!(
            "column `{}` expects a {kind}, got {value:?}",
            column.physical_name
        ),
    }
}

/// Marshal a value without a column descriptor, following its own kind.
#[must_use]
pub fn literal_of(value: &Value) -> Literal {
    match value {
        Value::Null => Literal::Null,
        Value::Integer(e) => Literal::Integer(*e),
        Value::Float(e) => Literal::Decimal(*e),
        Value::Boolean(e) => Literal::Boolean(*e),
        Value::String(e) => Literal::Text(e.clone()),
        Value::Date(e) => Literal::Timestamp(*e),
    }
}

/// Whether `raw` is the storage representation of `true`.
fn is_stored_true(raw: &Value) -> bool {
    match raw {
        Value::Boolean(e) => *e,
        Value::Integer(e) => *e == 1,
        Value::Float(e) => *e == 1.0,
        Value::String(e) => e.trim() == "1",
        Value::Null | Value::Date(_) => false,
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    let raw = raw.trim();

    raw.parse::<i64>()
        .map(Value::Integer)
        .ok()
        .or_else(|| raw.parse::<f64>().ok().map(Value::Float))
}

/// Parse the date representations found in storage and in scraped payloads.
#[must_use]
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    DateTime::parse_from_rfc3339(raw)
        .map(|e| e.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|e| e.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|e| e.and_hms_opt(0, 0, 0))
                .map(|e| e.and_utc())
        })
}

/// Unmarshal a raw storage value according to its column descriptor.
///
/// # Errors
///
/// Returns the reason when the raw value cannot be read as the column kind.
pub fn unmarshal(raw: Value, column: &ColumnDescriptor) -> Result<Value, String> {
    if column.nullable && raw.is_falsy() {
        return Ok(Value::Null);
    }

    if column.kind == ValueKind::Boolean {
        return Ok(Value::Boolean(is_stored_true(&raw)));
    }

    if raw.is_null() {
        return Err("unexpected NULL in a non-nullable column".to_string());
    }

    match column.kind {
        ValueKind::Number => match raw {
            Value::Integer(_) | Value::Float(_) => Ok(raw),
            Value::Boolean(e) => Ok(Value::Integer(i64::from(e))),
            Value::String(e) => parse_number(&e).ok_or_else(|| format!("`{e}` is not a number")),
            Value::Date(e) => Ok(Value::Integer(e.timestamp_millis())),
            Value::Null => unreachable!(),
        },
        ValueKind::String => Ok(match raw {
            Value::String(e) => Value::String(e),
            Value::Integer(e) => Value::String(e.to_string()),
            Value::Float(e) => Value::String(e.to_string()),
            Value::Boolean(e) => Value::String(e.to_string()),
            Value::Date(e) => Value::String(e.format(DATE_FORMAT).to_string()),
            Value::Null => unreachable!(),
        }),
        ValueKind::Date => match raw {
            Value::Date(_) => Ok(raw),
            Value::String(e) => parse_date(&e)
                .map(Value::Date)
                .ok_or_else(|| format!("`{e}` is not a date")),
            Value::Integer(e) => Utc
                .timestamp_millis_opt(e)
                .single()
                .map(Value::Date)
                .ok_or_else(|| format!("{e} is not a valid timestamp")),
            other => Err(format!("{other:?} is not a date")),
        },
        ValueKind::Boolean => unreachable!(),
    }
}
