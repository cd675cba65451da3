//! A minimal object-relational mapper.
//!
//! Entity types are plain structs deriving [`Entity`] and registered once at startup with
//! [`registry::register`]. A [`Connector`] owns the database connection and maps rows from and
//! to entities, resolves their relations lazily and persists them with diff-aware upserts and
//! cascading saves.

extern crate self as intra_orm;

pub mod config;
pub mod connector;
pub mod entity;
pub mod error;
pub mod query;
pub mod registry;
pub mod value;

pub use config::ConnectorConfig;
pub use connector::{Connector, Diff, Upsert};
pub use entity::{
    Entity,
    model::{JsonEntity, StorageRow},
    persist::Persist,
    relation::{HasMany, HasOne, Reference},
};
pub use error::{Error, Result};
/// Derive macro implementing [`Entity`] from `#[orm(...)]` attributes.
pub use intra_orm_macros::Entity;
pub use query::{Operator, filter::Filter};
pub use value::Value;

pub use sqlx;
