//! The single managed database connection and the CRUD operations built on it.

pub mod driver;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use driver::{Connect, Driver, Row, UrlConnect};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::ConnectorConfig,
    entity::{Entity, model::StorageRow},
    error::Result,
    query::{
        Expr, PushToQuery,
        filter::Filter,
        format::format_query,
        statement::{Delete, Insert, Select, Update},
    },
    value::{Value, marshal::Dialect},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// An existing row matched by [`Connector::insert_or_update`].
#[derive(Debug, Clone)]
pub struct Diff<T> {
    /// Whether `new` differs from `old` and the update changed the row.
    pub is_diff: bool,
    pub old: T,
    pub new: T,
}

/// Outcome of [`Connector::insert_or_update`].
#[derive(Debug, Clone)]
pub enum Upsert<T> {
    /// No row matched, the entity was inserted.
    Created,
    Existing(Diff<T>),
}

impl<T> Upsert<T> {
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created)
    }

    pub const fn diff(&self) -> Option<&Diff<T>> {
        match self {
            Self::Created => None,
            Self::Existing(e) => Some(e),
        }
    }

    pub fn into_diff(self) -> Option<Diff<T>> {
        match self {
            Self::Created => None,
            Self::Existing(e) => Some(e),
        }
    }
}

/// Owns one database connection, opened on first use.
///
/// Statements are serialized on that connection: each one holds the connection for its whole
/// round trip, so concurrent callers queue up instead of interleaving on the wire. There are no
/// transactions.
pub struct Connector {
    factory: Box<dyn Connect>,
    connection: Mutex<Option<Box<dyn Driver>>>,
    state: parking_lot::Mutex<ConnectionState>,
    log_statements: bool,
}

impl Connector {
    /// # Errors
    ///
    /// If the URL does not point to a supported database.
    pub fn new(config: &ConnectorConfig) -> Result<Self> {
        Ok(Self::with_factory(UrlConnect::new(&config.url)?).log_statements(config.log_statements))
    }

    /// See [`ConnectorConfig::from_env`].
    ///
    /// # Errors
    ///
    /// If the configuration is missing or does not point to a supported database.
    pub fn from_env() -> Result<Self> {
        Self::new(&ConnectorConfig::from_env()?)
    }

    pub fn with_factory(factory: impl Connect + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            connection: Mutex::new(None),
            state: parking_lot::Mutex::new(ConnectionState::Disconnected),
            log_statements: false,
        }
    }

    #[must_use]
    pub const fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.factory.dialect()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// Open the connection unless it is already open. Callers arriving while a connection attempt
    /// is in flight wait for that attempt instead of starting their own.
    ///
    /// # Errors
    ///
    /// If the connection cannot be established.
    pub async fn connect(&self) -> Result<()> {
        let mut slot = self.connection.lock().await;
        self.ensure_connected(&mut slot).await?;
        Ok(())
    }

    async fn ensure_connected<'a>(
        &self,
        slot: &'a mut Option<Box<dyn Driver>>,
    ) -> Result<&'a mut Box<dyn Driver>> {
        let driver = match slot.take() {
            Some(driver) => driver,
            None => {
                self.set_state(ConnectionState::Connecting);
                info!("Connecting to the database");

                match self.factory.connect().await {
                    Ok(driver) => {
                        self.set_state(ConnectionState::Connected);
                        info!("Connected to the database");
                        driver
                    }
                    Err(e) => {
                        self.set_state(ConnectionState::Disconnected);
                        return Err(e);
                    }
                }
            }
        };

        Ok(slot.insert(driver))
    }

    /// Release the connection. The next statement connects again.
    ///
    /// # Errors
    ///
    /// If the driver fails to close the connection cleanly. The connection is dropped either way.
    pub async fn close(&self) -> Result<()> {
        let mut slot = self.connection.lock().await;

        if let Some(mut driver) = slot.take() {
            self.set_state(ConnectionState::Disconnected);
            info!("Closing the database connection");
            driver.close().await?;
        }

        Ok(())
    }

    fn log(&self, sql: &str) {
        if self.log_statements {
            info!("{sql}");
        } else {
            debug!("{sql}");
        }
    }

    /// Drop the connection when the driver reports it unusable.
    fn settle<R>(
        &self,
        slot: &mut Option<Box<dyn Driver>>,
        result: Result<R, sqlx::Error>,
    ) -> Result<R> {
        if let Err(
            e @ (sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_)),
        ) = &result
        {
            warn!("Dropping the database connection: {e}");
            *slot = None;
            self.set_state(ConnectionState::Disconnected);
        }

        Ok(result?)
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<Row>> {
        let mut slot = self.connection.lock().await;
        let driver = self.ensure_connected(&mut slot).await?;

        self.log(sql);
        let result = driver.fetch(sql).await;
        self.settle(&mut slot, result)
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let mut slot = self.connection.lock().await;
        let driver = self.ensure_connected(&mut slot).await?;

        self.log(sql);
        let result = driver.execute(sql).await;
        self.settle(&mut slot, result)
    }

    /// Run a raw statement after substituting its placeholders, see
    /// [`format_query`](crate::query::format::format_query). Statements without a result set
    /// return no rows.
    ///
    /// # Errors
    ///
    /// If the connection cannot be established or the driver rejects the statement.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.fetch(&format_query(sql, params, self.dialect())).await
    }

    /// Same as [`Connector::query`], returning the number of affected rows instead.
    ///
    /// # Errors
    ///
    /// If the connection cannot be established or the driver rejects the statement.
    pub async fn execute_with(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.execute(&format_query(sql, params, self.dialect())).await
    }

    /// Raw rows of `table`, optionally restricted by `condition`.
    ///
    /// # Errors
    ///
    /// If the statement fails.
    pub async fn fetch_table(&self, table: &str, condition: Option<&Expr>) -> Result<Vec<Row>> {
        let sql = Select { table, condition }.to_sql(self.dialect());
        self.fetch(&sql).await
    }

    /// # Errors
    ///
    /// If the statement fails.
    pub async fn insert_row(&self, table: &str, row: &StorageRow) -> Result<()> {
        let sql = Insert { table, row }.to_sql(self.dialect());
        self.execute(&sql).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// If the statement fails.
    pub async fn delete_where(&self, table: &str, condition: &Expr) -> Result<u64> {
        let sql = Delete {
            table,
            condition: Some(condition),
        }
        .to_sql(self.dialect());
        self.execute(&sql).await
    }

    /// Every row matching `filter`. An empty filter reads the whole table.
    ///
    /// # Errors
    ///
    /// If the statement fails, or if a row cannot be decoded into `T`.
    pub async fn get_many<T: Entity>(&self, filter: &Filter<T>) -> Result<Vec<T>> {
        let metadata = T::metadata();
        let sql = Select {
            table: metadata.table_name(),
            condition: filter.condition(),
        }
        .to_sql(self.dialect());

        self.fetch(&sql)
            .await?
            .iter()
            .map(T::from_storage_row)
            .collect()
    }

    /// The first row matching `filter`.
    ///
    /// # Errors
    ///
    /// See [`Connector::get_many`].
    pub async fn get_one<T: Entity>(&self, filter: &Filter<T>) -> Result<Option<T>> {
        Ok(self.get_many(filter).await?.into_iter().next())
    }

    /// Insert `entity` as a new row. Relations are not touched.
    ///
    /// # Errors
    ///
    /// If the statement fails, for instance on a duplicate primary key.
    pub async fn insert<T: Entity>(&self, entity: &T) -> Result<()> {
        let metadata = T::metadata();
        let row = entity.to_storage_row();

        self.insert_row(metadata.table_name(), &row).await
    }

    /// Overwrite the rows matching `filter` with the columns of `entity`.
    ///
    /// Returns `false` without issuing the update when no row matches, otherwise whether the
    /// driver reported affected rows.
    ///
    /// # Errors
    ///
    /// If one of the statements fails.
    pub async fn update<T: Entity>(&self, entity: &T, filter: &Filter<T>) -> Result<bool> {
        if self.get_one(filter).await?.is_none() {
            return Ok(false);
        }

        let metadata = T::metadata();
        let row = entity.to_storage_row();
        let sql = Update {
            table: metadata.table_name(),
            row: &row,
            condition: filter.condition(),
        }
        .to_sql(self.dialect());

        Ok(self.execute(&sql).await? > 0)
    }

    /// Insert `entity` when no row matches `filter`, otherwise update the first match if it
    /// differs from `entity` by [`Entity::equals`]. Equal entities issue no update.
    ///
    /// # Errors
    ///
    /// If one of the statements fails.
    pub async fn insert_or_update<T: Entity>(
        &self,
        entity: &T,
        filter: &Filter<T>,
    ) -> Result<Upsert<T>> {
        let Some(old) = self.get_one(filter).await? else {
            self.insert(entity).await?;
            debug!("Inserted into `{}`", T::metadata().table_name());
            return Ok(Upsert::Created);
        };

        let is_diff = if entity.equals(&old) {
            false
        } else {
            self.update(entity, filter).await?
        };

        debug!(
            "Matched a row of `{}` (changed: {is_diff})",
            T::metadata().table_name()
        );

        Ok(Upsert::Existing(Diff {
            is_diff,
            old,
            new: entity.clone(),
        }))
    }

    /// Delete the rows matching `filter`. An empty filter deletes every row.
    ///
    /// # Errors
    ///
    /// If the statement fails.
    pub async fn delete<T: Entity>(&self, filter: &Filter<T>) -> Result<u64> {
        let metadata = T::metadata();
        let sql = Delete {
            table: metadata.table_name(),
            condition: filter.condition(),
        }
        .to_sql(self.dialect());

        self.execute(&sql).await
    }
}
