//! Relation fields.
//!
//! A relation field starts out holding the raw key(s) it points to and is replaced in place by
//! the related entities once resolved, see [`Connector::resolve_relations`]. Saving an entity
//! cascades to whatever is resolved at that time, see [`Connector::save`].

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::{
    connector::Connector,
    entity::{Entity, column::ColumnType, model::StorageRow},
    error::Result,
    query::{Expr, Operator, Predicate, filter::Filter},
    registry::{ColumnDescriptor, RelationDescriptor, RelationKind},
    value::{
        Value, ValueKind,
        marshal::{marshal, unmarshal},
    },
};

/// Types usable as a relation field, naming the entity they relate to.
pub trait Related {
    type Target: Entity;
}

/// What a relation field needs to know about its owner while resolving or cascading.
pub struct RelationContext<'a> {
    pub connector: &'a Connector,
    pub field: &'a str,
    pub descriptor: &'a RelationDescriptor,
    pub owner_key: Value,
    pub owner_key_column: &'a ColumnDescriptor,
}

fn ad_hoc_column(physical_name: &str, kind: ValueKind) -> ColumnDescriptor {
    ColumnDescriptor::new(physical_name, kind).physical(physical_name)
}

impl RelationContext<'_> {
    /// The foreign key column on the target table, as registered on the target when it is a
    /// column there.
    fn inverse_column<T: Entity>(&self) -> ColumnDescriptor {
        let inverse = self.descriptor.inverse_column();

        T::metadata()
            .column_by_physical(&inverse)
            .cloned()
            .unwrap_or_else(|| ad_hoc_column(&inverse, self.owner_key_column.kind))
    }

    /// Target rows whose inverse foreign key holds the owner's key.
    async fn inverse_lookup<T: Entity>(&self) -> Result<Vec<T>> {
        let filter = Filter::<T>::from(Predicate::new(
            self.inverse_column::<T>(),
            Operator::Equal,
            self.owner_key.clone(),
        ));

        self.connector.get_many(&filter).await
    }

    fn join_owner_column(&self) -> ColumnDescriptor {
        ad_hoc_column(
            &self.descriptor.join_owner_column(),
            self.owner_key_column.kind,
        )
    }

    fn join_target_column<T: Entity>(&self) -> ColumnDescriptor {
        ad_hoc_column(
            &self.descriptor.join_target_column(),
            T::metadata().primary_key_column().kind,
        )
    }

    fn join_owner_condition(&self) -> Expr {
        Predicate::new(
            self.join_owner_column(),
            Operator::Equal,
            self.owner_key.clone(),
        )
        .into()
    }

    /// Keys of the targets paired with the owner in the join table.
    async fn join_lookup<T: Entity>(&self) -> Result<Vec<Value>> {
        let target_column = self.join_target_column::<T>();
        let key_column = T::metadata().primary_key_column().clone();

        self.connector
            .fetch_table(
                &self.descriptor.join_table_name(),
                Some(&self.join_owner_condition()),
            )
            .await?
            .into_iter()
            .map(|row| {
                let raw = row
                    .get(&target_column.physical_name)
                    .cloned()
                    .unwrap_or_default();
                unmarshal(raw, &key_column).map_err(|e| {
                    crate::Error::decode(
                        self.descriptor.join_table_name(),
                        &target_column.physical_name,
                        e,
                    )
                })
            })
            .collect()
    }
}

/// A field holding one or more related entities, resolved or not.
#[async_trait]
pub trait RelationField: Send + Sync {
    fn is_resolved(&self) -> bool;

    /// Primary keys of a resolved collection, `None` for anything else.
    fn resolved_keys(&self) -> Option<Vec<Value>>;

    /// Replace the raw key(s) with the related entities. Targets that cannot be found leave the
    /// field as it was.
    async fn resolve(&mut self, cx: &RelationContext<'_>) -> Result<()>;

    /// Resolve the relations of a resolved single entity, one level down.
    async fn resolve_nested(&mut self, connector: &Connector) -> Result<()>;

    /// Persist the resolved part of this relation. `existing` holds the keys the stored owner
    /// was related to before the save, if this is a collection.
    async fn cascade(&self, cx: &RelationContext<'_>, existing: Option<Vec<Value>>) -> Result<()>;
}

/// Many-to-one relation: the owner row stores the target's primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    untagged,
    bound(
        serialize = "T: Serialize, T::Key: Serialize",
        deserialize = "T: Deserialize<'de>, T::Key: Deserialize<'de>"
    )
)]
pub enum Reference<T: Entity> {
    Unresolved(T::Key),
    Resolved(Box<T>),
}

impl<T: Entity> Reference<T> {
    pub const fn new(key: T::Key) -> Self {
        Self::Unresolved(key)
    }

    pub fn resolved(entity: T) -> Self {
        Self::Resolved(Box::new(entity))
    }

    /// Key of the referenced entity, resolved or not.
    pub fn key(&self) -> T::Key {
        match self {
            Self::Unresolved(e) => e.clone(),
            Self::Resolved(e) => e.key(),
        }
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Unresolved(_) => None,
            Self::Resolved(e) => Some(&**e),
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Unresolved(_) => None,
            Self::Resolved(e) => Some(&mut **e),
        }
    }
}

impl<T: Entity> Default for Reference<T> {
    fn default() -> Self {
        Self::Unresolved(T::Key::default())
    }
}

impl<T: Entity> Related for Reference<T> {
    type Target = T;
}

impl<T: Entity> ColumnType for Reference<T> {
    const KIND: ValueKind = T::Key::KIND;
    const NULLABLE: bool = T::Key::NULLABLE;

    fn to_value(&self) -> Value {
        self.key().to_value()
    }

    fn from_value(value: Value) -> Result<Self, String> {
        T::Key::from_value(value).map(Self::Unresolved)
    }
}

/// Upsert a single resolved target on its own, by primary key.
async fn cascade_single<T: Entity>(connector: &Connector, entity: &T) -> Result<()> {
    let upsert = connector
        .insert_or_update(entity, &Filter::by_key(&entity.key()))
        .await?;

    tracing::trace!(
        "Cascaded into `{}` (created: {})",
        T::metadata().table_name(),
        upsert.is_created()
    );
    Ok(())
}

#[async_trait]
impl<T: Entity> RelationField for Reference<T> {
    fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    fn resolved_keys(&self) -> Option<Vec<Value>> {
        None
    }

    async fn resolve(&mut self, cx: &RelationContext<'_>) -> Result<()> {
        let filter = Filter::<T>::by_key(&self.key());

        if let Some(found) = cx.connector.get_one(&filter).await? {
            *self = Self::resolved(found);
        }

        Ok(())
    }

    async fn resolve_nested(&mut self, connector: &Connector) -> Result<()> {
        if let Some(entity) = self.get_mut() {
            connector.resolve_relations(entity).await?;
        }

        Ok(())
    }

    async fn cascade(&self, cx: &RelationContext<'_>, _: Option<Vec<Value>>) -> Result<()> {
        match self.get() {
            Some(entity) => cascade_single(cx.connector, entity).await,
            None => Ok(()),
        }
    }
}

impl<T: Entity> Related for Option<Reference<T>> {
    type Target = T;
}

#[async_trait]
impl<T: Entity> RelationField for Option<Reference<T>> {
    fn is_resolved(&self) -> bool {
        self.as_ref().is_some_and(RelationField::is_resolved)
    }

    fn resolved_keys(&self) -> Option<Vec<Value>> {
        None
    }

    async fn resolve(&mut self, cx: &RelationContext<'_>) -> Result<()> {
        match self {
            Some(reference) => reference.resolve(cx).await,
            None => Ok(()),
        }
    }

    async fn resolve_nested(&mut self, connector: &Connector) -> Result<()> {
        match self {
            Some(reference) => reference.resolve_nested(connector).await,
            None => Ok(()),
        }
    }

    async fn cascade(&self, cx: &RelationContext<'_>, existing: Option<Vec<Value>>) -> Result<()> {
        match self {
            Some(reference) => reference.cascade(cx, existing).await,
            None => Ok(()),
        }
    }
}

/// One-to-one relation: a single target row stores the owner's key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    untagged,
    bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>")
)]
pub enum HasOne<T: Entity> {
    #[default]
    Unresolved,
    Resolved(Box<T>),
}

impl<T: Entity> HasOne<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Unresolved => None,
            Self::Resolved(e) => Some(&**e),
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Unresolved => None,
            Self::Resolved(e) => Some(&mut **e),
        }
    }
}

impl<T: Entity> Related for HasOne<T> {
    type Target = T;
}

#[async_trait]
impl<T: Entity> RelationField for HasOne<T> {
    fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    fn resolved_keys(&self) -> Option<Vec<Value>> {
        None
    }

    async fn resolve(&mut self, cx: &RelationContext<'_>) -> Result<()> {
        if let Some(found) = cx.inverse_lookup::<T>().await?.into_iter().next() {
            *self = Self::Resolved(Box::new(found));
        }

        Ok(())
    }

    async fn resolve_nested(&mut self, connector: &Connector) -> Result<()> {
        if let Some(entity) = self.get_mut() {
            connector.resolve_relations(entity).await?;
        }

        Ok(())
    }

    async fn cascade(&self, cx: &RelationContext<'_>, _: Option<Vec<Value>>) -> Result<()> {
        match self.get() {
            Some(entity) => cascade_single(cx.connector, entity).await,
            None => Ok(()),
        }
    }
}

/// One-to-many or many-to-many relation, depending on the registered
/// [`RelationKind`](crate::registry::RelationKind).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    untagged,
    bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>")
)]
pub enum HasMany<T: Entity> {
    #[default]
    Unresolved,
    Resolved(Vec<T>),
}

impl<T: Entity> HasMany<T> {
    pub const fn resolved(entities: Vec<T>) -> Self {
        Self::Resolved(entities)
    }

    pub fn get(&self) -> Option<&[T]> {
        match self {
            Self::Unresolved => None,
            Self::Resolved(e) => Some(&**e),
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut Vec<T>> {
        match self {
            Self::Unresolved => None,
            Self::Resolved(e) => Some(e),
        }
    }
}

impl<T: Entity> Related for HasMany<T> {
    type Target = T;
}

/// The desired collection split against the keys stored before the save.
struct Partition<'a, T> {
    delete: Vec<Value>,
    insert: Vec<&'a T>,
    keep: Vec<&'a T>,
}

impl<'a, T: Entity> Partition<'a, T> {
    fn new(desired: &'a [T], existing: &[Value]) -> Self {
        let desired_keys = desired.iter().map(|e| e.key().to_value()).collect::<Vec<_>>();
        let (keep, insert) = desired
            .iter()
            .partition(|e| existing.contains(&e.key().to_value()));

        Self {
            delete: existing
                .iter()
                .filter(|e| !desired_keys.contains(e))
                .cloned()
                .collect(),
            insert,
            keep,
        }
    }
}

impl<T: Entity> HasMany<T> {
    /// A copy of `child` whose inverse foreign key holds the owner's key, when that key is a
    /// column of the target.
    fn linked(cx: &RelationContext<'_>, child: &T) -> Result<T> {
        let inverse = cx.inverse_column::<T>();
        let mut child = child.clone();

        if let Some(field) = T::metadata()
            .column_by_physical(&inverse.physical_name)
            .map(|e| e.logical_name.clone())
        {
            child
                .set_column_value(&field, cx.owner_key.clone())
                .map_err(|e| {
                    crate::Error::decode(T::metadata().table_name(), &inverse.physical_name, e)
                })?;
        }

        Ok(child)
    }

    async fn cascade_one_to_many(
        cx: &RelationContext<'_>,
        partition: Partition<'_, T>,
    ) -> Result<()> {
        let connector = cx.connector;

        for key in partition.delete {
            connector.delete(&Filter::<T>::by_key_value(key)).await?;
        }

        for child in partition.insert {
            connector.insert(&Self::linked(cx, child)?).await?;
        }

        let keep = partition
            .keep
            .into_iter()
            .map(|e| Self::linked(cx, e))
            .collect::<Result<Vec<_>>>()?;
        try_join_all(keep.iter().map(|e| connector.save(e))).await?;
        Ok(())
    }

    async fn cascade_many_to_many(
        cx: &RelationContext<'_>,
        partition: Partition<'_, T>,
    ) -> Result<()> {
        let connector = cx.connector;
        let join_table = cx.descriptor.join_table_name();
        let owner_column = cx.join_owner_column();
        let target_column = cx.join_target_column::<T>();

        for key in partition.delete {
            let condition = cx.join_owner_condition().and(Predicate::new(
                target_column.clone(),
                Operator::Equal,
                key,
            ));
            connector.delete_where(&join_table, &condition).await?;
        }

        for child in partition.insert {
            let mut row = StorageRow::new();
            row.insert(
                &owner_column.physical_name,
                marshal(&cx.owner_key, &owner_column),
            );
            row.insert(
                &target_column.physical_name,
                marshal(&child.key().to_value(), &target_column),
            );
            connector.insert_row(&join_table, &row).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl<T: Entity> RelationField for HasMany<T> {
    fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    fn resolved_keys(&self) -> Option<Vec<Value>> {
        self.get()
            .map(|e| e.iter().map(|e| e.key().to_value()).collect())
    }

    async fn resolve(&mut self, cx: &RelationContext<'_>) -> Result<()> {
        let targets = if cx.descriptor.kind == RelationKind::ManyToMany {
            let mut targets = vec![];
            for key in cx.join_lookup::<T>().await? {
                if let Some(found) = cx.connector.get_one(&Filter::by_key_value(key)).await? {
                    targets.push(found);
                }
            }
            targets
        } else {
            cx.inverse_lookup::<T>().await?
        };

        *self = Self::Resolved(targets);
        Ok(())
    }

    async fn resolve_nested(&mut self, _: &Connector) -> Result<()> {
        Ok(())
    }

    async fn cascade(&self, cx: &RelationContext<'_>, existing: Option<Vec<Value>>) -> Result<()> {
        let Some(desired) = self.get() else {
            return Ok(());
        };

        let partition = Partition::new(desired, &existing.unwrap_or_default());

        tracing::debug!(
            "Cascading `{}`: {} to delete, {} to insert, {} to keep",
            cx.field,
            partition.delete.len(),
            partition.insert.len(),
            partition.keep.len()
        );

        if cx.descriptor.kind == RelationKind::ManyToMany {
            Self::cascade_many_to_many(cx, partition).await
        } else {
            Self::cascade_one_to_many(cx, partition).await
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        entity::{Entity, column::ColumnType, relation::Partition},
        registry::TableBuilder,
        value::Value,
    };

    #[derive(Debug, Default, Clone)]
    struct Item(i64);

    impl Entity for Item {
        type Key = i64;

        fn describe(_: &mut TableBuilder) {}

        fn key(&self) -> i64 {
            self.0
        }

        fn column_value(&self, _: &str) -> Value {
            self.0.to_value()
        }

        fn set_column_value(&mut self, _: &str, value: Value) -> Result<(), String> {
            self.0 = i64::from_value(value)?;
            Ok(())
        }
    }

    #[test]
    fn test_partition() {
        let desired = vec![Item(2), Item(3)];
        let existing = vec![Value::Integer(1), Value::Integer(2)];
        let partition = Partition::new(&desired, &existing);

        assert_eq!(partition.delete, vec![Value::Integer(1)]);
        assert_eq!(
            partition.insert.iter().map(|e| e.0).collect::<Vec<_>>(),
            vec![3]
        );
        assert_eq!(
            partition.keep.iter().map(|e| e.0).collect::<Vec<_>>(),
            vec![2]
        );
    }
}
