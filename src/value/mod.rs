pub mod marshal;

use std::fmt::Display;

use chrono::{DateTime, NaiveDateTime, Utc};

/// The storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    Boolean,
    String,
    Date,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Number => "number",
                Self::Boolean => "boolean",
                Self::String => "string",
                Self::Date => "date",
            }
        )
    }
}

/// A dynamically typed value, as read from a row or taken from an entity field.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Date(DateTime<Utc>),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// NULL, zero, `false` and the empty string.
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Integer(e) => *e == 0,
            Self::Float(e) => *e == 0.0 || e.is_nan(),
            Self::Boolean(e) => !e,
            Self::String(e) => e.is_empty(),
            Self::Date(_) => false,
        }
    }

    /// The kind this value naturally belongs to, `None` for NULL.
    pub const fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Integer(_) | Self::Float(_) => Some(ValueKind::Number),
            Self::Boolean(_) => Some(ValueKind::Boolean),
            Self::String(_) => Some(ValueKind::String),
            Self::Date(_) => Some(ValueKind::Date),
        }
    }
}

impl PartialEq for Value {
    #[allow(clippy::cast_precision_loss)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                *a as f64 == *b
            }
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(e) => write!(f, "{e}"),
            Self::Float(e) => write!(f, "{e}"),
            Self::Boolean(e) => write!(f, "{e}"),
            Self::String(e) => write!(f, "{e}"),
            Self::Date(e) => write!(f, "{}", e.format(marshal::DATE_FORMAT)),
        }
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Integer(i64::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Date(value.and_utc())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Self>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod test {
    use super::Value;

    #[test]
    fn test_numbers_compare_across_representations() {
        assert_eq!(Value::Integer(3), Value::Float(3.0));
        assert_ne!(Value::Integer(3), Value::Float(3.5));
        assert_ne!(Value::Integer(1), Value::Boolean(true));
    }

    #[test]
    fn test_falsy() {
        assert!(Value::Null.is_falsy());
        assert!(Value::Integer(0).is_falsy());
        assert!(Value::String(String::new()).is_falsy());
        assert!(Value::Boolean(false).is_falsy());
        assert!(!Value::Integer(2).is_falsy());
        assert!(!Value::from("a").is_falsy());
    }
}
