use async_trait::async_trait;
use sqlx::{Column, Connection, Row as _, SqliteConnection, TypeInfo, ValueRef, sqlite::SqliteRow};

use crate::value::{Value, marshal::Dialect};

use super::driver::{Driver, Row};

pub struct SqliteDriver {
    connection: Option<SqliteConnection>,
}

impl SqliteDriver {
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        Ok(Self {
            connection: Some(SqliteConnection::connect(url).await?),
        })
    }

    fn connection(&mut self) -> Result<&mut SqliteConnection, sqlx::Error> {
        self.connection.as_mut().ok_or_else(|| {
            sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "the connection was closed",
            ))
        })
    }
}

fn decode_column(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = raw.type_info().name().to_uppercase();
    Ok(match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::Integer(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" | "NUMERIC" => Value::Float(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => Value::String(
            String::from_utf8_lossy(&row.try_get_unchecked::<Vec<u8>, _>(index)?).into_owned(),
        ),
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    })
}

fn decode_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    row.columns()
        .iter()
        .map(|e| Ok((e.name().to_string(), decode_column(row, e.ordinal())?)))
        .collect()
}

#[async_trait]
impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
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
