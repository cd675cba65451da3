use sqlparser::{
    ast::Statement,
    dialect::{Dialect, MySqlDialect, SQLiteDialect},
    parser::{Parser, ParserError},
};

use crate::{db::DbType, schema::SqlTable};

fn dialect(db_type: DbType) -> Box<dyn Dialect> {
    match db_type {
        DbType::MySql => Box::new(MySqlDialect {}),
        DbType::Sqlite => Box::new(SQLiteDialect {}),
    }
}

/// Parse every `CREATE TABLE` statement found in `query`. Other statements are ignored.
///
/// # Errors
///
/// If `query` is not valid SQL for the given database.
pub fn parse_tables(query: &str, db_type: DbType) -> Result<Vec<SqlTable>, ParserError> {
    let ast = Parser::parse_sql(dialect(db_type).as_ref(), query)?;

    Ok(ast
        .iter()
        .filter_map(|e| {
            if let Statement::CreateTable(statement) = e {
                Some(SqlTable::from(statement))
            } else {
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod test {
    use crate::{
        db::DbType,
        schema::{SqlSchema, TypeFamily},
    };

    use super::parse_tables;

    #[test]
    fn test_sqlite_table() {
        let query = "CREATE TABLE `widgets`(
          `id` TEXT NOT NULL PRIMARY KEY,
          `count` INTEGER NOT NULL,
          `end_registration` DATETIME
        )";

        let tables = parse_tables(query, DbType::Sqlite).expect("Failed to parse query");
        let parsed = tables.first().expect("No table parsed");

        assert_eq!(parsed.name, "widgets");
        assert_eq!(parsed.primary_key.as_deref(), Some("id"));
        assert!(parsed.find_column("id").is_some_and(|e| !e.nullable));
        assert!(
            parsed
                .find_column("count")
                .is_some_and(|e| !e.nullable && e.family() == TypeFamily::Number)
        );
        assert!(
            parsed
                .find_column("end_registration")
                .is_some_and(|e| e.nullable && e.family() == TypeFamily::Temporal)
        );
    }

    #[test]
    fn test_mysql_show_create_table() {
        let query = "CREATE TABLE `module_flags` (
          `id` bigint NOT NULL,
          `module_id` int NOT NULL,
          `flag` varchar(64) NOT NULL,
          PRIMARY KEY (`id`)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

        let tables = parse_tables(query, DbType::MySql).expect("Failed to parse query");
        let parsed = tables.first().expect("No table parsed");

        assert_eq!(parsed.name, "module_flags");
        assert_eq!(parsed.primary_key.as_deref(), Some("id"));
        assert!(
            parsed
                .find_column("flag")
                .is_some_and(|e| e.family() == TypeFamily::Text)
        );
    }

    #[test]
    fn test_schema_json() {
        let tables = parse_tables(
            "CREATE TABLE `locations_types` (`id` bigint NOT NULL PRIMARY KEY, `name` text)",
            DbType::MySql,
        )
        .expect("Failed to parse query");

        let json = SqlSchema { tables }.to_json().expect("Failed to serialize schema");
        let schema = SqlSchema::from_json(&json).expect("Failed to load schema");
        let table = schema
            .find_table("locations_types")
            .expect("Table went missing");

        assert!(
            table
                .find_column("name")
                .is_some_and(|e| e.nullable && e.family() == TypeFamily::Text)
        );
    }

    #[test]
    fn test_other_statements_are_ignored() {
        let tables = parse_tables("SELECT 1", DbType::Sqlite).expect("Failed to parse query");
        assert!(tables.is_empty());
    }
}
