use clap::Parser;
use eyre::Context;
use intra_orm::{Connector, Value, value::marshal::Dialect};
use intra_orm_schema::{db::DbType, query::parse_tables, schema::SqlSchema};
use tracing::info;

/// (Re-)Generate the database schema in JSON format
#[derive(Parser, Debug)]
pub struct GenerateSchema {
    /// Where to write the schema.
    #[arg(short, long, default_value = "intra_orm/schema.json")]
    output: std::path::PathBuf,
}

impl GenerateSchema {
    pub async fn run(&self, connector: &Connector) -> eyre::Result<()> {
        let schema = fetch_schema(connector).await?;

        if let Some(dir) = self.output.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .context("Failed to create the schema directory")?;
        }

        tokio::fs::write(
            &self.output,
            schema.to_json().context("Failed to serialize schema")?,
        )
        .await
        .context("Failed to write schema")?;

        info!(
            "Schema of {} tables written to {}",
            schema.tables.len(),
            self.output.display()
        );

        Ok(())
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(e) => Some(e.clone()),
        _ => None,
    }
}

/// Read the `CREATE TABLE` statement of every table in the connected database.
pub async fn fetch_schema(connector: &Connector) -> eyre::Result<SqlSchema> {
    let statements = match connector.dialect() {
        Dialect::Sqlite => connector
            .query("SELECT type, sql FROM sqlite_schema WHERE type = 'table'", &[])
            .await
            .context("Failed to list tables")?
            .iter()
            .filter_map(|e| text(e.get("sql")))
            .collect::<Vec<_>>(),
        Dialect::MySql => {
            let tables = connector
                .query("SHOW TABLES", &[])
                .await
                .context("Failed to list tables")?
                .iter()
                .filter_map(|e| text(e.values().next()))
                .collect::<Vec<_>>();

            let mut statements = Vec::with_capacity(tables.len());
            for table in tables {
                let rows = connector
                    .query("SHOW CREATE TABLE ??", &[Value::from(&table)])
                    .await
                    .with_context(|| format!("Failed to read the definition of `{table}`"))?;

                statements.extend(rows.iter().filter_map(|e| text(e.get("Create Table"))));
            }
            statements
        }
    };

    let db_type = match connector.dialect() {
        Dialect::MySql => DbType::MySql,
        Dialect::Sqlite => DbType::Sqlite,
    };

    let tables = statements
        .iter()
        .map(|e| {
            parse_tables(e, db_type).map_err(|err| eyre::eyre!("Failed to parse table SQL: {err}"))
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();

    Ok(SqlSchema { tables })
}
