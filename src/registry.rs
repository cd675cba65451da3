//! Process-wide metadata registry.
//!
//! Every persisted type registers its table name, column descriptors, relation descriptors and
//! primary key exactly once at startup, before any [`Connector`](crate::connector::Connector)
//! call touches it. Lookups for a type or field that was never registered are programmer errors
//! and panic.

use std::{
    any::{TypeId, type_name},
    collections::HashMap,
    sync::{Arc, LazyLock},
};

use convert_case::{Case, Casing};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{
    entity::{Entity, column::ColumnType},
    value::ValueKind,
};

static REGISTRY: LazyLock<RwLock<HashMap<TypeId, Arc<TableMetadata>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Maps one entity field to one physical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub logical_name: String,
    pub physical_name: String,
    pub kind: ValueKind,
    pub nullable: bool,
}

impl ColumnDescriptor {
    /// A non-nullable column whose physical name is the snake_case form of `logical_name`.
    pub fn new(logical_name: impl Into<String>, kind: ValueKind) -> Self {
        let logical_name = logical_name.into();

        Self {
            physical_name: logical_name.to_case(Case::Snake),
            logical_name,
            kind,
            nullable: false,
        }
    }

    /// A column whose kind and nullability follow the Rust type `T`.
    pub fn of<T: ColumnType>(logical_name: impl Into<String>) -> Self {
        Self::new(logical_name, T::KIND).nullable(T::NULLABLE)
    }

    #[must_use]
    pub fn physical(mut self, physical_name: impl Into<String>) -> Self {
        self.physical_name = physical_name.into();
        self
    }

    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Foreign key on the owning row, referencing the target's primary key.
    ManyToOne,
    /// Foreign key on the target rows, referencing the owner's primary key.
    OneToMany,
    /// Pairs of keys stored in a join table.
    ManyToMany,
    /// Same lookup as [`RelationKind::OneToMany`], resolving to a single row.
    OneToOne,
}

/// Describes how one entity field relates to rows of another entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub kind: RelationKind,
    pub target: TypeId,
    pub target_name: &'static str,
    pub inverse_field: Option<String>,
    pub join_table: Option<String>,
    owner_table: String,
}

impl RelationDescriptor {
    pub fn new<Target: 'static>(kind: RelationKind) -> Self {
        Self {
            kind,
            target: TypeId::of::<Target>(),
            target_name: type_name::<Target>(),
            inverse_field: None,
            join_table: None,
            owner_table: String::new(),
        }
    }

    /// Name of the column on the target table holding the owner's key.
    #[must_use]
    pub fn inverse(mut self, column: impl Into<String>) -> Self {
        self.inverse_field = Some(column.into());
        self
    }

    #[must_use]
    pub fn through(mut self, join_table: impl Into<String>) -> Self {
        self.join_table = Some(join_table.into());
        self
    }

    /// The inverse foreign key column, `<owningTable>_id` unless set explicitly.
    pub fn inverse_column(&self) -> String {
        self.inverse_field
            .clone()
            .unwrap_or_else(|| format!("{}_id", self.owner_table))
    }

    /// The join table, `<owningTable>_<targetTable>` unless set explicitly.
    ///
    /// # Panics
    ///
    /// If no table was given and the target type is not registered.
    pub fn join_table_name(&self) -> String {
        self.join_table.clone().unwrap_or_else(|| {
            format!(
                "{}_{}",
                self.owner_table,
                table_name_by_id(self.target, self.target_name)
            )
        })
    }

    /// Column of the join table referencing the owner, `<owningTable>_id`.
    pub fn join_owner_column(&self) -> String {
        format!("{}_id", self.owner_table)
    }

    /// Column of the join table referencing the target, `<targetTable>_id`.
    ///
    /// # Panics
    ///
    /// If the target type is not registered.
    pub fn join_target_column(&self) -> String {
        format!("{}_id", table_name_by_id(self.target, self.target_name))
    }

    pub fn owner_table(&self) -> &str {
        &self.owner_table
    }
}

/// Everything the registry knows about one entity type.
#[derive(Debug, Clone)]
pub struct TableMetadata {
    pub type_name: &'static str,
    table_name: Option<String>,
    columns: IndexMap<String, ColumnDescriptor>,
    relations: IndexMap<String, RelationDescriptor>,
    primary_key: Option<String>,
}

impl TableMetadata {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            table_name: None,
            columns: IndexMap::new(),
            relations: IndexMap::new(),
            primary_key: None,
        }
    }

    /// # Panics
    ///
    /// If no table name was registered.
    pub fn table_name(&self) -> &str {
        self.table_name
            .as_deref()
            .unwrap_or_else(|| panic!("`{}` has no registered table name", self.type_name))
    }

    pub const fn columns(&self) -> &IndexMap<String, ColumnDescriptor> {
        &self.columns
    }

    pub const fn relations(&self) -> &IndexMap<String, RelationDescriptor> {
        &self.relations
    }

    /// # Panics
    ///
    /// If the field has no column descriptor.
    pub fn column(&self, field: &str) -> &ColumnDescriptor {
        self.columns.get(field).unwrap_or_else(|| {
            panic!(
                "`{}` has no column registered for field `{field}`",
                self.type_name
            )
        })
    }

    /// # Panics
    ///
    /// If the field has no relation descriptor.
    pub fn relation(&self, field: &str) -> &RelationDescriptor {
        self.relations.get(field).unwrap_or_else(|| {
            panic!(
                "`{}` has no relation registered for field `{field}`",
                self.type_name
            )
        })
    }

    /// Find the column stored under `physical_name`.
    pub fn column_by_physical(&self, physical_name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .values()
            .find(|e| e.physical_name.eq(physical_name))
    }

    /// # Panics
    ///
    /// If no primary key was registered, or if the primary key field has no column.
    pub fn primary_key(&self) -> &str {
        let Some(primary_key) = self.primary_key.as_deref() else {
            panic!("`{}` has no registered primary key", self.type_name);
        };

        assert!(
            self.columns.contains_key(primary_key),
            "primary key `{primary_key}` of `{}` has no column descriptor",
            self.type_name
        );

        primary_key
    }

    /// Column descriptor of the primary key field.
    pub fn primary_key_column(&self) -> &ColumnDescriptor {
        self.column(self.primary_key())
    }

    fn fill_relation_defaults(&mut self) {
        if let Some(table) = self.table_name.clone() {
            self.relations
                .values_mut()
                .for_each(|e| e.owner_table.clone_from(&table));
        }
    }
}

/// Collects the metadata of one entity type inside [`Entity::describe`].
pub struct TableBuilder {
    metadata: TableMetadata,
}

impl TableBuilder {
    fn new(type_name: &'static str) -> Self {
        Self {
            metadata: TableMetadata::new(type_name),
        }
    }

    pub fn table(&mut self, name: impl Into<String>) -> &mut Self {
        self.metadata.table_name = Some(name.into());
        self
    }

    pub fn column(&mut self, descriptor: ColumnDescriptor) -> &mut Self {
        self.metadata
            .columns
            .insert(descriptor.logical_name.clone(), descriptor);
        self
    }

    pub fn relation(&mut self, field: impl Into<String>, descriptor: RelationDescriptor) -> &mut Self {
        self.metadata.relations.insert(field.into(), descriptor);
        self
    }

    pub fn primary_key(&mut self, field: impl Into<String>) -> &mut Self {
        self.metadata.primary_key = Some(field.into());
        self
    }

    fn finish(mut self) -> TableMetadata {
        self.metadata.fill_relation_defaults();
        // Validates the presence of both the table name and the primary key column.
        let _ = self.metadata.table_name();
        let _ = self.metadata.primary_key();
        self.metadata
    }
}

/// Register `T` from its [`Entity::describe`] implementation. Registering a type twice replaces
/// the previous metadata.
///
/// # Panics
///
/// If the description lacks a table name or a primary key with a column.
pub fn register<T: Entity>() {
    let mut builder = TableBuilder::new(type_name::<T>());
    T::describe(&mut builder);
    let metadata = builder.finish();

    tracing::debug!(
        "Registered `{}` as table `{}` ({} columns, {} relations)",
        metadata.type_name,
        metadata.table_name(),
        metadata.columns.len(),
        metadata.relations.len()
    );

    REGISTRY
        .write()
        .insert(TypeId::of::<T>(), Arc::new(metadata));
}

fn update<T: 'static>(f: impl FnOnce(&mut TableMetadata)) {
    let mut registry = REGISTRY.write();
    let entry = registry
        .entry(TypeId::of::<T>())
        .or_insert_with(|| Arc::new(TableMetadata::new(type_name::<T>())));
    let metadata = Arc::make_mut(entry);
    f(metadata);
    metadata.fill_relation_defaults();
}

pub fn register_table<T: 'static>(name: impl Into<String>) {
    let name = name.into();
    update::<T>(|e| e.table_name = Some(name));
}

pub fn register_column<T: 'static>(field: impl Into<String>, mut descriptor: ColumnDescriptor) {
    let field = field.into();
    descriptor.logical_name.clone_from(&field);
    update::<T>(|e| {
        e.columns.insert(field, descriptor);
    });
}

pub fn register_relation<T: 'static>(field: impl Into<String>, descriptor: RelationDescriptor) {
    let field = field.into();
    update::<T>(|e| {
        e.relations.insert(field, descriptor);
    });
}

pub fn register_primary_key<T: 'static>(field: impl Into<String>) {
    let field = field.into();
    update::<T>(|e| e.primary_key = Some(field));
}

pub fn is_registered<T: 'static>() -> bool {
    REGISTRY.read().contains_key(&TypeId::of::<T>())
}

/// # Panics
///
/// If `T` was never registered.
pub fn metadata_of<T: 'static>() -> Arc<TableMetadata> {
    metadata_by_id(TypeId::of::<T>(), type_name::<T>())
}

fn metadata_by_id(id: TypeId, name: &str) -> Arc<TableMetadata> {
    REGISTRY.read().get(&id).cloned().unwrap_or_else(|| {
        panic!("`{name}` is not registered, call `intra_orm::registry::register` at startup")
    })
}

fn table_name_by_id(id: TypeId, name: &str) -> String {
    metadata_by_id(id, name).table_name().to_string()
}

/// # Panics
///
/// If `T` was never registered or has no table name.
pub fn table_name_of<T: 'static>() -> String {
    metadata_of::<T>().table_name().to_string()
}

/// # Panics
///
/// If `T` was never registered.
pub fn columns_of<T: 'static>() -> IndexMap<String, ColumnDescriptor> {
    metadata_of::<T>().columns.clone()
}

/// # Panics
///
/// If `T` was never registered.
pub fn relations_of<T: 'static>() -> IndexMap<String, RelationDescriptor> {
    metadata_of::<T>().relations.clone()
}

/// # Panics
///
/// If `T` was never registered, or has no primary key column.
pub fn primary_key_of<T: 'static>() -> String {
    metadata_of::<T>().primary_key().to_string()
}

/// Snapshot of every registered type, in no particular order.
pub fn registered() -> Vec<Arc<TableMetadata>> {
    REGISTRY.read().values().cloned().collect()
}

#[cfg(test)]
mod test {
    use super::*;

    struct Owner;
    struct Target;
    struct Unknown;
    struct NoKey;

    fn register_pair() {
        register_table::<Target>("targets");
        register_column::<Target>("id", ColumnDescriptor::new("id", ValueKind::Number));
        register_primary_key::<Target>("id");

        register_table::<Owner>("owners");
        register_column::<Owner>("id", ColumnDescriptor::new("id", ValueKind::String));
        register_column::<Owner>(
            "nameFull",
            ColumnDescriptor::new("nameFull", ValueKind::String).nullable(true),
        );
        register_relation::<Owner>(
            "children",
            RelationDescriptor::new::<Target>(RelationKind::OneToMany),
        );
        register_relation::<Owner>(
            "tags",
            RelationDescriptor::new::<Target>(RelationKind::ManyToMany),
        );
        register_primary_key::<Owner>("id");
    }

    #[test]
    fn test_physical_name_defaults_to_snake_case() {
        let column = ColumnDescriptor::new("nameFull", ValueKind::String);
        assert_eq!(column.physical_name, "name_full");

        let renamed = ColumnDescriptor::new("oldName", ValueKind::String).physical("name_changed");
        assert_eq!(renamed.physical_name, "name_changed");
    }

    #[test]
    fn test_accessors() {
        register_pair();

        assert_eq!(table_name_of::<Owner>(), "owners");
        assert_eq!(primary_key_of::<Owner>(), "id");
        assert!(columns_of::<Owner>()["nameFull"].nullable);
        assert_eq!(
            relations_of::<Owner>()["children"].kind,
            RelationKind::OneToMany
        );
    }

    #[test]
    fn test_relation_defaults() {
        register_pair();

        let relations = relations_of::<Owner>();
        assert_eq!(relations["children"].inverse_column(), "owners_id");
        assert_eq!(relations["tags"].join_table_name(), "owners_targets");
        assert_eq!(relations["tags"].join_owner_column(), "owners_id");
        assert_eq!(relations["tags"].join_target_column(), "targets_id");
    }

    #[test]
    #[should_panic(expected = "is not registered")]
    fn test_unregistered_type_panics() {
        let _ = table_name_of::<Unknown>();
    }

    #[test]
    #[should_panic(expected = "has no column descriptor")]
    fn test_primary_key_without_column_panics() {
        register_table::<NoKey>("no_key");
        register_primary_key::<NoKey>("id");
        let _ = primary_key_of::<NoKey>();
    }
}
