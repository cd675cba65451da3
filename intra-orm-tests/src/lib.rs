//! Fixtures shared by the integration tests: an in-memory SQLite [`Connector`] that records
//! every statement it runs, plus the schema of the model tables.

#![allow(clippy::expect_used)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use intra_orm::{
    Connector, Entity, HasMany, HasOne, Reference, Result,
    connector::driver::{Connect, Driver, Row, UrlConnect},
    registry,
    value::marshal::Dialect,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Statements run through a recording connector, in order, and the connections it opened.
#[derive(Debug, Clone, Default)]
pub struct Statements {
    statements: Arc<Mutex<Vec<String>>>,
    connects: Arc<AtomicUsize>,
}

impl Statements {
    fn push(&self, sql: &str) {
        self.statements.lock().push(sql.to_string());
    }

    pub fn all(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    pub fn clear(&self) {
        self.statements.lock().clear();
    }

    /// Number of connections opened so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of recorded statements starting with `keyword`, e.g. `UPDATE`.
    pub fn count(&self, keyword: &str) -> usize {
        self.statements
            .lock()
            .iter()
            .filter(|e| e.trim_start().starts_with(keyword))
            .count()
    }
}

struct RecordingConnect {
    inner: UrlConnect,
    statements: Statements,
}

struct RecordingDriver {
    inner: Box<dyn Driver>,
    statements: Statements,
}

#[async_trait]
impl Connect for RecordingConnect {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    async fn connect(&self) -> Result<Box<dyn Driver>> {
        let inner = self.inner.connect().await?;
        self.statements.connects.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(RecordingDriver {
            inner,
            statements: self.statements.clone(),
        }))
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    async fn fetch(&mut self, sql: &str) -> Result<Vec<Row>, intra_orm::sqlx::Error> {
        self.statements.push(sql);
        self.inner.fetch(sql).await
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, intra_orm::sqlx::Error> {
        self.statements.push(sql);
        self.inner.execute(sql).await
    }

    async fn close(&mut self) -> Result<(), intra_orm::sqlx::Error> {
        self.inner.close().await
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE widgets (id TEXT NOT NULL PRIMARY KEY, count TEXT NOT NULL, active INTEGER NOT NULL)",
    "CREATE TABLE modules (
        id INTEGER NOT NULL PRIMARY KEY,
        name TEXT NOT NULL,
        name_full TEXT NOT NULL,
        code TEXT NOT NULL,
        semester INTEGER NOT NULL,
        year INTEGER NOT NULL,
        city TEXT NOT NULL,
        credits INTEGER NOT NULL,
        is_ongoing BOOLEAN NOT NULL,
        \"start\" DATETIME NOT NULL,
        \"end\" DATETIME NOT NULL,
        is_registration_open BOOLEAN NOT NULL,
        end_registration DATETIME,
        is_roadblock BOOLEAN NOT NULL,
        is_mandatory BOOLEAN NOT NULL,
        promo TEXT NOT NULL,
        url TEXT NOT NULL
    )",
    "CREATE TABLE module_flags (id INTEGER NOT NULL PRIMARY KEY, module_id INTEGER NOT NULL, flag TEXT NOT NULL)",
    "CREATE TABLE locations (
        id TEXT NOT NULL PRIMARY KEY,
        name TEXT NOT NULL,
        disabled BOOLEAN,
        floor INTEGER,
        image_path TEXT
    )",
    "CREATE TABLE locations_types (id INTEGER NOT NULL PRIMARY KEY, seats INTEGER NOT NULL, type TEXT NOT NULL, name TEXT NOT NULL)",
    "CREATE TABLE locations_with_types (locations_id TEXT NOT NULL, locations_types_id INTEGER NOT NULL)",
    "CREATE TABLE activities (
        id TEXT NOT NULL PRIMARY KEY,
        module_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        is_ongoing BOOLEAN NOT NULL,
        \"start\" DATETIME NOT NULL,
        \"end\" DATETIME NOT NULL,
        location TEXT NOT NULL,
        description TEXT NOT NULL,
        is_project BOOLEAN NOT NULL,
        is_graded BOOLEAN NOT NULL,
        has_meeting BOOLEAN NOT NULL,
        url TEXT NOT NULL,
        deadline DATETIME,
        \"begin\" DATETIME NOT NULL,
        end_register DATETIME,
        type TEXT NOT NULL,
        main_type TEXT NOT NULL
    )",
    "CREATE TABLE owners (id INTEGER NOT NULL PRIMARY KEY, name TEXT NOT NULL)",
    "CREATE TABLE profiles (id INTEGER NOT NULL PRIMARY KEY, owner_id INTEGER NOT NULL, bio TEXT)",
    "CREATE TABLE pets (id INTEGER NOT NULL PRIMARY KEY, owner_id INTEGER NOT NULL, name TEXT NOT NULL)",
    "CREATE TABLE events (
        id TEXT NOT NULL PRIMARY KEY,
        activity_id TEXT NOT NULL,
        \"start\" DATETIME NOT NULL,
        \"end\" DATETIME NOT NULL,
        location TEXT NOT NULL,
        session_index INTEGER NOT NULL
    )",
];

/// Stored with a text `count` and an integer `active`, read back through the column kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Entity)]
#[orm(table = "widgets", primary_key = id)]
pub struct Widget {
    pub id: String,
    pub count: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Entity)]
#[orm(table = "owners", primary_key = id)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    #[orm(one_to_one, inverse = "owner_id")]
    pub profile: HasOne<Profile>,
    #[orm(one_to_many, inverse = "owner_id")]
    pub pets: HasMany<Pet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Entity)]
#[orm(table = "profiles", primary_key = id)]
pub struct Profile {
    pub id: i64,
    pub owner_id: i64,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Entity)]
#[orm(table = "pets", primary_key = id)]
pub struct Pet {
    pub id: i64,
    #[orm(many_to_one, column = "owner_id")]
    pub owner: Reference<Owner>,
    pub name: String,
}

/// Register every entity used by the tests.
pub fn register() {
    intra_orm_models::register_all();
    registry::register::<Widget>();
    registry::register::<Owner>();
    registry::register::<Profile>();
    registry::register::<Pet>();
}

/// A connector on a fresh in-memory database, not connected yet, and the statements it runs.
///
/// # Panics
///
/// If the database URL is rejected.
pub fn recording_connector() -> (Connector, Statements) {
    register();

    let statements = Statements::default();
    let connector = Connector::with_factory(RecordingConnect {
        inner: UrlConnect::new("sqlite::memory:").expect("sqlite is a supported scheme"),
        statements: statements.clone(),
    });

    (connector, statements)
}

/// A connector on a fresh in-memory database holding the test schema, and the statements it
/// runs from then on.
///
/// # Panics
///
/// If the database cannot be opened or the schema cannot be created.
pub async fn setup() -> (Connector, Statements) {
    let (connector, statements) = recording_connector();

    for ddl in SCHEMA {
        connector
            .execute_with(ddl, &[])
            .await
            .expect("Failed to create the test schema");
    }

    statements.clear();
    (connector, statements)
}
