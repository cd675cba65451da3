//! The four statements issued by the connector.
//!
//! Identifiers are written as registered, unquoted: table and column names are plain snake_case.

use crate::entity::model::StorageRow;

use super::{Expr, PushToQuery, SqlWriter};

fn push_where(writer: &mut SqlWriter, condition: Option<&Expr>) {
    writer.push(" WHERE ");
    match condition {
        Some(condition) => condition.push_to(writer),
        None => {
            writer.push("TRUE");
        }
    }
}

/// `SELECT * FROM <table> [WHERE <condition>]`. An empty condition issues no `WHERE` clause.
pub struct Select<'a> {
    pub table: &'a str,
    pub condition: Option<&'a Expr>,
}

impl PushToQuery for Select<'_> {
    fn push_to(&self, writer: &mut SqlWriter) {
        writer.push(format_args!("SELECT * FROM {}", self.table));
        if self.condition.is_some() {
            push_where(writer, self.condition);
        }
    }
}

/// `INSERT INTO <table> (<columns>) VALUES (<literals>)`.
pub struct Insert<'a> {
    pub table: &'a str,
    pub row: &'a StorageRow,
}

impl PushToQuery for Insert<'_> {
    fn push_to(&self, writer: &mut SqlWriter) {
        let values = self.row.value_list(writer.dialect());
        writer.push(format_args!(
            "INSERT INTO {} ({}) VALUES ({values})",
            self.table,
            self.row.column_list()
        ));
    }
}

/// `UPDATE <table> SET <assignments> WHERE <condition>`, with `TRUE` for an empty condition.
pub struct Update<'a> {
    pub table: &'a str,
    pub row: &'a StorageRow,
    pub condition: Option<&'a Expr>,
}

impl PushToQuery for Update<'_> {
    fn push_to(&self, writer: &mut SqlWriter) {
        let assignments = self.row.assignments(writer.dialect());
        writer.push(format_args!("UPDATE {} SET {assignments}", self.table));
        push_where(writer, self.condition);
    }
}

/// `DELETE FROM <table> WHERE <condition>`, with `TRUE` for an empty condition.
pub struct Delete<'a> {
    pub table: &'a str,
    pub condition: Option<&'a Expr>,
}

impl PushToQuery for Delete<'_> {
    fn push_to(&self, writer: &mut SqlWriter) {
        writer.push(format_args!("DELETE FROM {}", self.table));
        push_where(writer, self.condition);
    }
}

#[cfg(test)]
mod test {
    use crate::{
        query::{Expr, Operator, Predicate},
        registry::ColumnDescriptor,
        value::{
            Value, ValueKind,
            marshal::{Dialect, Literal},
        },
    };

    use super::*;

    fn condition() -> Expr {
        Predicate::new(
            ColumnDescriptor::new("id", ValueKind::String),
            Operator::Equal,
            Value::from("w1"),
        )
        .into()
    }

    fn row() -> StorageRow {
        [
            ("id".to_string(), Literal::Text("w1".to_string())),
            ("count".to_string(), Literal::Integer(3)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_select() {
        let condition = condition();

        assert_eq!(
            Select {
                table: "widgets",
                condition: None
            }
            .to_sql(Dialect::MySql),
            "SELECT * FROM widgets"
        );
        assert_eq!(
            Select {
                table: "widgets",
                condition: Some(&condition)
            }
            .to_sql(Dialect::MySql),
            "SELECT * FROM widgets WHERE id = 'w1'"
        );
    }

    #[test]
    fn test_writes() {
        let condition = condition();
        let row = row();

        assert_eq!(
            Insert {
                table: "widgets",
                row: &row
            }
            .to_sql(Dialect::Sqlite),
            "INSERT INTO widgets (id, count) VALUES ('w1', 3)"
        );
        assert_eq!(
            Update {
                table: "widgets",
                row: &row,
                condition: Some(&condition)
            }
            .to_sql(Dialect::Sqlite),
            "UPDATE widgets SET id = 'w1', count = 3 WHERE id = 'w1'"
        );
        assert_eq!(
            Delete {
                table: "widgets",
                condition: None
            }
            .to_sql(Dialect::Sqlite),
            "DELETE FROM widgets WHERE TRUE"
        );
    }
}
