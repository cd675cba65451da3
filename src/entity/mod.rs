pub mod column;
pub mod model;
pub mod persist;
pub mod relation;

use std::{fmt::Debug, sync::Arc};

use column::ColumnType;
use model::StorageRow;
use relation::RelationField;

use crate::{
    connector::driver::Row,
    error::{Error, Result},
    registry::{self, TableBuilder, TableMetadata},
    value::{
        Value,
        marshal::{marshal, unmarshal},
    },
};

/// A value type persisted to one table.
///
/// Implementations are normally generated with `#[derive(Entity)]`, which writes
/// [`Entity::describe`] from the field attributes and the field accessors from the struct
/// definition. The metadata itself lives in the global [`registry`], so every type has to be
/// registered with [`registry::register`] before a connector touches it.
pub trait Entity: Default + Clone + Send + Sync + 'static {
    /// Rust type of the primary key field.
    type Key: ColumnType + Clone + PartialEq + Default + Debug + Send + Sync + 'static;

    /// Declare the table name, columns, relations and primary key of this type.
    fn describe(table: &mut TableBuilder);

    /// Current value of the primary key field.
    fn key(&self) -> Self::Key;

    /// Current value of the field backing a column. Related entities yield their primary key.
    ///
    /// # Panics
    ///
    /// If `field` is not a column of this type.
    fn column_value(&self, field: &str) -> Value;

    /// Assign an unmarshalled value to the field backing a column.
    ///
    /// # Errors
    ///
    /// If the value does not fit the field type.
    ///
    /// # Panics
    ///
    /// If `field` is not a column of this type.
    fn set_column_value(&mut self, field: &str, value: Value) -> Result<(), String>;

    /// Relation fields, in declaration order.
    fn relations(&self) -> Vec<(&'static str, &dyn RelationField)> {
        vec![]
    }

    fn relations_mut(&mut self) -> Vec<(&'static str, &mut dyn RelationField)> {
        vec![]
    }

    /// Registered metadata of this type.
    ///
    /// # Panics
    ///
    /// If the type was never registered.
    fn metadata() -> Arc<TableMetadata> {
        registry::metadata_of::<Self>()
    }

    /// Field-by-field equality over every registered column.
    ///
    /// Dates compare by instant and relations by the primary key they point to, resolved or not.
    fn equals(&self, other: &Self) -> bool {
        Self::metadata()
            .columns()
            .keys()
            .all(|e| self.column_value(e) == other.column_value(e))
    }

    /// Marshal every column of this entity, keyed by physical column name.
    ///
    /// # Panics
    ///
    /// If a field holds a value that does not fit its column kind.
    fn to_storage_row(&self) -> StorageRow {
        Self::metadata()
            .columns()
            .iter()
            .map(|(field, column)| {
                (
                    column.physical_name.clone(),
                    marshal(&self.column_value(field), column),
                )
            })
            .collect()
    }

    /// Rebuild an entity from a result row. Columns absent from the row read as NULL, relation
    /// fields start out unresolved.
    ///
    /// # Errors
    ///
    /// If a raw value cannot be read as the kind of its column.
    fn from_storage_row(row: &Row) -> Result<Self> {
        let metadata = Self::metadata();
        let mut entity = Self::default();

        for (field, column) in metadata.columns() {
            let raw = row.get(&column.physical_name).cloned().unwrap_or_default();
            let value = unmarshal(raw, column)
                .map_err(|e| Error::decode(metadata.table_name(), &column.physical_name, e))?;

            entity
                .set_column_value(field, value)
                .map_err(|e| Error::decode(metadata.table_name(), &column.physical_name, e))?;
        }

        Ok(entity)
    }
}
