use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{Column, Connection, MySqlConnection, Row as _, TypeInfo, ValueRef, mysql::MySqlRow};

use crate::value::{Value, marshal::Dialect};

use super::driver::{Driver, Row};

pub struct MySqlDriver {
    connection: Option<MySqlConnection>,
}

impl MySqlDriver {
    /// sqlx negotiates `CLIENT_FOUND_ROWS`, so affected rows count matched rows.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        Ok(Self {
            connection: Some(MySqlConnection::connect(url).await?),
        })
    }

    fn connection(&mut self) -> Result<&mut MySqlConnection, sqlx::Error> {
        self.connection.as_mut().ok_or_else(|| {
            sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "the connection was closed",
            ))
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn decode_column(row: &MySqlRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = raw.type_info().name().to_uppercase();
    Ok(match type_name.as_str() {
        "DATETIME" | "TIMESTAMP" => {
            Value::from(row.try_get_unchecked::<NaiveDateTime, _>(index)?)
        }
        "DATE" => Value::from(
            row.try_get_unchecked::<NaiveDate, _>(index)?
                .and_time(NaiveTime::MIN),
        ),
        "TIME" => Value::String(row.try_get_unchecked::<NaiveTime, _>(index)?.to_string()),
        "FLOAT" => Value::from(row.try_get_unchecked::<f32, _>(index)?),
        "DOUBLE" | "REAL" => Value::from(row.try_get_unchecked::<f64, _>(index)?),
        "DECIMAL" | "NUMERIC" => {
            let raw = row.try_get_unchecked::<String, _>(index)?;
            raw.parse::<i64>()
                .map(Value::Integer)
                .or_else(|_| raw.parse::<f64>().map(Value::Float))
                .unwrap_or(Value::String(raw))
        }
        e if e.ends_with("UNSIGNED") && e.contains("INT") => {
            let raw = row.try_get_unchecked::<u64, _>(index)?;
            i64::try_from(raw).map_or(Value::Float(raw as f64), Value::Integer)
        }
        e if e.contains("INT") || e == "BOOLEAN" || e == "YEAR" => {
            Value::Integer(row.try_get_unchecked::<i64, _>(index)?)
        }
        e if e.contains("BLOB") || e.contains("BINARY") || e == "BIT" => Value::String(
            String::from_utf8_lossy(&row.try_get_unchecked::<Vec<u8>, _>(index)?).into_owned(),
        ),
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    })
}

fn decode_row(row: &MySqlRow) -> Result<Row, sqlx::Error> {
    row.columns()
        .iter()
        .map(|e| Ok((e.name().to_string(), decode_column(row, e.ordinal())?)))
        .collect()
}

#[async_trait]
impl Driver for MySqlDriver {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn fetch(&mut self, sql: &str) -> Result<Vec<Row>, sqlx::Error> {
        sqlx::query(sql)
            .fetch_all(self.connection()?)
            .await?
            .iter()
            .map(decode_row)
            .collect()
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
        Ok(sqlx::query(sql)
            .execute(self.connection()?)
            .await?
            .rows_affected())
    }

    async fn close(&mut self) -> Result<(), sqlx::Error> {
        match self.connection.take() {
            Some(connection) => connection.close().await,
            None => Ok(()),
        }
    }
}
