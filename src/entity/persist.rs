use std::collections::HashMap;

use futures::{
    FutureExt,
    future::{BoxFuture, try_join_all},
};

use crate::{
    connector::Connector,
    entity::{Entity, column::ColumnType, relation::RelationContext},
    error::Result,
    query::filter::Filter,
};

impl Connector {
    /// Resolve every relation field of `entity` in place ("map").
    ///
    /// Many-to-one fields are looked up by the key they hold, one-to-many and one-to-one fields by
    /// the inverse foreign key, many-to-many fields through their join table. Single targets that
    /// cannot be found leave the field unresolved.
    ///
    /// # Errors
    ///
    /// If one of the lookups fails.
    pub async fn resolve_relations<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let metadata = T::metadata();
        let owner_key = entity.key().to_value();
        let owner_key_column = metadata.primary_key_column();

        let resolutions = entity
            .relations_mut()
            .into_iter()
            .map(|(field, relation)| {
                let cx = RelationContext {
                    connector: self,
                    field,
                    descriptor: metadata.relation(field),
                    owner_key: owner_key.clone(),
                    owner_key_column,
                };

                async move { relation.resolve(&cx).await }
            });

        try_join_all(resolutions).await?;
        Ok(())
    }

    /// Resolve the relations of `entity`, then the relations of every resolved single-entity
    /// relation one level further. Collections are not descended into, and nothing goes deeper
    /// than that one hop.
    ///
    /// # Errors
    ///
    /// If one of the lookups fails.
    pub async fn resolve_relations_deep<T: Entity>(&self, entity: &mut T) -> Result<()> {
        self.resolve_relations(entity).await?;

        try_join_all(
            entity
                .relations_mut()
                .into_iter()
                .map(|(_, relation)| relation.resolve_nested(self)),
        )
        .await?;

        Ok(())
    }

    /// Persist `entity` together with its resolved relations, returning whether the row was
    /// newly created.
    ///
    /// The row is inserted when no row holds its primary key, updated otherwise. Resolved single
    /// relations are upserted on their own. Resolved collections are diffed against what the
    /// stored row was related to: one-to-many targets that left the collection are deleted, new
    /// ones inserted and the remaining ones saved recursively; many-to-many relations only
    /// change their join table rows. Relation fields cascade concurrently.
    ///
    /// Nothing runs inside a transaction: a failure midway leaves the statements issued so far
    /// applied.
    ///
    /// # Errors
    ///
    /// If one of the statements fails.
    pub fn save<'a, T: Entity>(&'a self, entity: &'a T) -> BoxFuture<'a, Result<bool>> {
        async move {
            let metadata = T::metadata();
            let filter = Filter::<T>::by_key(&entity.key());

            let (created, existing) = match self.get_one(&filter).await? {
                None => {
                    self.insert(entity).await?;
                    (true, HashMap::new())
                }
                Some(mut old) => {
                    self.update(entity, &filter).await?;
                    self.resolve_relations(&mut old).await?;

                    let existing = old
                        .relations()
                        .into_iter()
                        .filter_map(|(field, relation)| {
                            relation.resolved_keys().map(|keys| (field, keys))
                        })
                        .collect::<HashMap<_, _>>();

                    (false, existing)
                }
            };

            tracing::debug!(
                "Saved `{}` {:?} (created: {created})",
                metadata.table_name(),
                entity.key()
            );

            let owner_key = entity.key().to_value();
            let owner_key_column = metadata.primary_key_column();

            let cascades = entity.relations().into_iter().map(|(field, relation)| {
                let cx = RelationContext {
                    connector: self,
                    field,
                    descriptor: metadata.relation(field),
                    owner_key: owner_key.clone(),
                    owner_key_column,
                };
                let existing = existing.get(field).cloned();

                async move { relation.cascade(&cx, existing).await }
            });

            try_join_all(cascades).await?;
            Ok(created)
        }
        .boxed()
    }
}

/// Entity-level entry points to the relation operations of a [`Connector`].
pub trait Persist: Entity {
    /// See [`Connector::save`].
    fn save<'a>(&'a self, connector: &'a Connector) -> BoxFuture<'a, Result<bool>> {
        connector.save(self)
    }

    /// See [`Connector::resolve_relations`].
    fn resolve_relations<'a>(&'a mut self, connector: &'a Connector) -> BoxFuture<'a, Result<()>> {
        connector.resolve_relations(self).boxed()
    }

    /// See [`Connector::resolve_relations_deep`].
    fn resolve_relations_deep<'a>(
        &'a mut self,
        connector: &'a Connector,
    ) -> BoxFuture<'a, Result<()>> {
        connector.resolve_relations_deep(self).boxed()
    }
}

impl<T: Entity> Persist for T {}
