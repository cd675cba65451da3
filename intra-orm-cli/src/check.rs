use std::fmt::Display;

use clap::Parser;
use eyre::Context;
use intra_orm::{
    Connector,
    registry::{self, RelationKind, TableMetadata},
    value::ValueKind,
};
use intra_orm_schema::schema::{SqlSchema, SqlTable, TypeFamily};
use tracing::{info, warn};

use crate::schema::fetch_schema;

/// Compare the registered entities against the tables of the database
#[derive(Parser, Debug)]
pub struct CheckSchema {
    /// Check against a schema written by `generate-schema` instead of the live database.
    #[arg(short, long, value_name = "SCHEMA_JSON")]
    schema: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    MissingTable(String),
    MissingColumn {
        table: String,
        column: String,
    },
    Nullability {
        table: String,
        column: String,
        nullable: bool,
    },
    Kind {
        table: String,
        column: String,
        kind: ValueKind,
        family: TypeFamily,
    },
    PrimaryKey {
        table: String,
        expected: String,
        found: Option<String>,
    },
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTable(table) => write!(f, "table `{table}` does not exist"),
            Self::MissingColumn { table, column } => {
                write!(f, "column `{table}.{column}` does not exist")
            }
            Self::Nullability {
                table,
                column,
                nullable,
            } => write!(
                f,
                "column `{table}.{column}` is {}nullable in the database",
                if *nullable { "" } else { "not " }
            ),
            Self::Kind {
                table,
                column,
                kind,
                family,
            } => write!(
                f,
                "column `{table}.{column}` holds a {kind} but is of type family {family:?}"
            ),
            Self::PrimaryKey {
                table,
                expected,
                found,
            } => write!(
                f,
                "primary key of `{table}` is {}, expected `{expected}`",
                found
                    .as_ref()
                    .map_or_else(|| "missing".to_string(), |e| format!("`{e}`"))
            ),
        }
    }
}

/// Whether a column of `family` can store values of `kind`.
const fn compatible(kind: ValueKind, family: TypeFamily) -> bool {
    matches!(
        (kind, family),
        (ValueKind::Number, TypeFamily::Number)
            | (ValueKind::Boolean, TypeFamily::Boolean | TypeFamily::Number)
            | (ValueKind::String, TypeFamily::Text | TypeFamily::Other)
            | (ValueKind::Date, TypeFamily::Temporal | TypeFamily::Text)
    )
}

fn check_columns(metadata: &TableMetadata, table: &SqlTable) -> Vec<Mismatch> {
    let mut mismatches = vec![];

    for column in metadata.columns().values() {
        let Some(found) = table.find_column(&column.physical_name) else {
            mismatches.push(Mismatch::MissingColumn {
                table: table.name.clone(),
                column: column.physical_name.clone(),
            });
            continue;
        };

        if found.nullable != column.nullable {
            mismatches.push(Mismatch::Nullability {
                table: table.name.clone(),
                column: column.physical_name.clone(),
                nullable: found.nullable,
            });
        }

        if !compatible(column.kind, found.family()) {
            mismatches.push(Mismatch::Kind {
                table: table.name.clone(),
                column: column.physical_name.clone(),
                kind: column.kind,
                family: found.family(),
            });
        }
    }

    let expected = &metadata.primary_key_column().physical_name;
    if table.primary_key.as_ref() != Some(expected) {
        mismatches.push(Mismatch::PrimaryKey {
            table: table.name.clone(),
            expected: expected.clone(),
            found: table.primary_key.clone(),
        });
    }

    mismatches
}

fn check_join_tables(metadata: &TableMetadata, schema: &SqlSchema) -> Vec<Mismatch> {
    metadata
        .relations()
        .values()
        .filter(|e| e.kind == RelationKind::ManyToMany)
        .flat_map(|relation| {
            let name = relation.join_table_name();
            let Some(table) = schema.find_table(&name) else {
                return vec![Mismatch::MissingTable(name)];
            };

            [relation.join_owner_column(), relation.join_target_column()]
                .into_iter()
                .filter(|e| table.find_column(e).is_none())
                .map(|column| Mismatch::MissingColumn {
                    table: name.clone(),
                    column,
                })
                .collect()
        })
        .collect()
}

/// Every difference between the metadata of one entity and the schema.
pub fn check_entity(metadata: &TableMetadata, schema: &SqlSchema) -> Vec<Mismatch> {
    let mut mismatches = match schema.find_table(metadata.table_name()) {
        Some(table) => check_columns(metadata, table),
        None => vec![Mismatch::MissingTable(metadata.table_name().to_string())],
    };

    mismatches.extend(check_join_tables(metadata, schema));
    mismatches
}

impl CheckSchema {
    pub async fn run(&self, connector: &Connector) -> eyre::Result<()> {
        let schema = match &self.schema {
            Some(path) => {
                let json = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                SqlSchema::from_json(&json).context("Failed to load schema")?
            }
            None => fetch_schema(connector).await?,
        };

        let mut entities = registry::registered();
        entities.sort_by(|a, b| a.table_name().cmp(b.table_name()));

        let mismatches = entities
            .iter()
            .flat_map(|e| check_entity(e, &schema))
            .collect::<Vec<_>>();

        for mismatch in &mismatches {
            warn!("{mismatch}");
        }

        if mismatches.is_empty() {
            info!(
                "All {} entities match the database schema",
                entities.len()
            );
            Ok(())
        } else {
            Err(eyre::eyre!(
                "Found {} schema mismatches",
                mismatches.len()
            ))
        }
    }
}
