use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::Result,
    value::marshal::{Dialect, Literal},
};

use super::Entity;

/// The storage form of one entity: physical column name to marshalled literal, in column
/// registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageRow(IndexMap<String, Literal>);

impl StorageRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, literal: Literal) {
        self.0.insert(column.into(), literal);
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Literal> {
        self.0.get(column)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Literal)> {
        self.0.iter()
    }

    /// `a, b, c`
    #[must_use]
    pub fn column_list(&self) -> String {
        self.0.keys().join(", ")
    }

    /// `1, 'x', TRUE`
    #[must_use]
    pub fn value_list(&self, dialect: Dialect) -> String {
        self.0.values().map(|e| e.render(dialect)).join(", ")
    }

    /// `a = 1, b = 'x'`, as used in `SET` clauses.
    #[must_use]
    pub fn assignments(&self, dialect: Dialect) -> String {
        self.0
            .iter()
            .map(|(column, literal)| format!("{column} = {}", literal.render(dialect)))
            .join(", ")
    }
}

impl FromIterator<(String, Literal)> for StorageRow {
    fn from_iter<I: IntoIterator<Item = (String, Literal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for StorageRow {
    type Item = (String, Literal);
    type IntoIter = indexmap::map::IntoIter<String, Literal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// JSON conversion for entities that derive `serde` traits.
///
/// Unresolved references serialize as their raw key and resolved ones as the nested entity, so a
/// resolved graph round-trips through JSON.
pub trait JsonEntity: Entity + Serialize + DeserializeOwned {
    /// # Errors
    ///
    /// If a field fails to serialize.
    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// # Errors
    ///
    /// If the JSON does not describe this entity.
    fn from_json(json: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(json)?)
    }
}

impl<T> JsonEntity for T where T: Entity + Serialize + DeserializeOwned {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_storage_row_renders_in_order() {
        let row: StorageRow = [
            ("id".to_string(), Literal::Text("w1".to_string())),
            ("count".to_string(), Literal::Integer(3)),
            ("active".to_string(), Literal::Boolean(true)),
        ]
        .into_iter()
        .collect();

        assert_eq!(row.column_list(), "id, count, active");
        assert_eq!(row.value_list(Dialect::MySql), "'w1', 3, TRUE");
        assert_eq!(
            row.assignments(Dialect::Sqlite),
            "id = 'w1', count = 3, active = TRUE"
        );
    }
}
