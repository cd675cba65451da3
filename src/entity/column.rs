use chrono::{DateTime, Utc};

use crate::value::{Value, ValueKind};

/// A Rust type that can be stored in a single column.
///
/// The derive macro uses [`ColumnType::KIND`] and [`ColumnType::NULLABLE`] to build the column
/// descriptor of a field, so the field type alone decides how it is marshalled.
pub trait ColumnType: Sized {
    const KIND: ValueKind;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    /// Convert an unmarshalled value back into the field type.
    ///
    /// # Errors
    ///
    /// If the value does not hold this type.
    fn from_value(value: Value) -> Result<Self, String>;
}

fn mismatch<T>(expected: ValueKind, value: &Value) -> Result<T, String> {
    Err(format!("expected a {expected}, got {value:?}"))
}

macro_rules! impl_integer_column {
    ($($ty:ty),*) => {
        $(
            impl ColumnType for $ty {
                const KIND: ValueKind = ValueKind::Number;

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                #[allow(clippy::cast_possible_truncation)]
                fn from_value(value: Value) -> Result<Self, String> {
                    match value {
                        Value::Integer(e) => {
                            Self::try_from(e).map_err(|_| format!("{e} is out of range"))
                        }
                        Value::Float(e) if e.fract() == 0.0 => {
                            Self::try_from(e as i64).map_err(|_| format!("{e} is out of range"))
                        }
                        other => mismatch(Self::KIND, &other),
                    }
                }
            }
        )*
    };
}

impl_integer_column!(i16, i32, i64, u16, u32);

macro_rules! impl_float_column {
    ($($ty:ty),*) => {
        $(
            impl ColumnType for $ty {
                const KIND: ValueKind = ValueKind::Number;

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
                fn from_value(value: Value) -> Result<Self, String> {
                    match value {
                        Value::Integer(e) => Ok(e as Self),
                        Value::Float(e) => Ok(e as Self),
                        other => mismatch(Self::KIND, &other),
                    }
                }
            }
        )*
    };
}

impl_float_column!(f32, f64);

impl ColumnType for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Boolean(e) => Ok(e),
            Value::Integer(e) => Ok(e != 0),
            other => mismatch(Self::KIND, &other),
        }
    }
}

impl ColumnType for String {
    const KIND: ValueKind = ValueKind::String;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::String(e) => Ok(e),
            other => mismatch(Self::KIND, &other),
        }
    }
}

impl ColumnType for DateTime<Utc> {
    const KIND: ValueKind = ValueKind::Date;

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Date(e) => Ok(e),
            other => mismatch(Self::KIND, &other),
        }
    }
}

impl<T: ColumnType> ColumnType for Option<T> {
    const KIND: ValueKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ColumnType::to_value)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_integer_from_float_without_fraction() {
        assert_eq!(i64::from_value(Value::Float(3.0)), Ok(3));
        assert!(i64::from_value(Value::Float(3.5)).is_err());
        assert!(i16::from_value(Value::Integer(70_000)).is_err());
    }

    #[test]
    fn test_option_is_nullable() {
        assert!(<Option<String> as ColumnType>::NULLABLE);
        assert!(!<String as ColumnType>::NULLABLE);
        assert_eq!(Option::<i64>::from_value(Value::Null), Ok(None));
        assert_eq!(Some(4_i64).to_value(), Value::Integer(4));
    }
}
