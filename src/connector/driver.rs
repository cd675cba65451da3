use std::ops::Deref;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::{
    error::{Error, Result},
    value::{Value, marshal::Dialect},
};

/// One raw result row: physical column name to the value the driver decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(IndexMap<String, Value>);

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }
}

impl Deref for Row {
    type Target = IndexMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One open database connection.
#[async_trait]
pub trait Driver: Send {
    fn dialect(&self) -> Dialect;

    /// Run a statement returning rows.
    async fn fetch(&mut self, sql: &str) -> Result<Vec<Row>, sqlx::Error>;

    /// Run a statement, returning the number of rows it affected.
    async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error>;

    async fn close(&mut self) -> Result<(), sqlx::Error>;
}

/// Opens drivers for a [`Connector`](super::Connector).
#[async_trait]
pub trait Connect: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn connect(&self) -> Result<Box<dyn Driver>>;
}

/// Opens a MySQL or SQLite connection depending on the URL scheme.
#[derive(Debug, Clone)]
pub struct UrlConnect {
    url: String,
    dialect: Dialect,
}

impl UrlConnect {
    /// # Errors
    ///
    /// If the URL scheme is neither MySQL nor SQLite.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let dialect = Dialect::from_url(&url).ok_or_else(|| Error::UnsupportedDatabase(url.clone()))?;

        Ok(Self { url, dialect })
    }
}

#[async_trait]
impl Connect for UrlConnect {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn connect(&self) -> Result<Box<dyn Driver>> {
        match self.dialect {
            #[cfg(feature = "mysql")]
            Dialect::MySql => Ok(Box::new(super::mysql::MySqlDriver::connect(&self.url).await?)),
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => Ok(Box::new(
                super::sqlite::SqliteDriver::connect(&self.url).await?,
            )),
            #[allow(unreachable_patterns)]
            _ => Err(Error::UnsupportedDatabase(self.url.clone())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unsupported_scheme() {
        assert!(matches!(
            UrlConnect::new("postgres://localhost/intra"),
            Err(Error::UnsupportedDatabase(_))
        ));
        assert_eq!(
            UrlConnect::new("sqlite::memory:").map(|e| e.dialect()).ok(),
            Some(Dialect::Sqlite)
        );
    }
}
