use serde::{Deserialize, Serialize};
use sqlparser::ast::{ColumnDef, ColumnOption, CreateTable, DataType, TableConstraint};

/// Coarse grouping of SQL column types, enough to tell whether a column can hold a value kind.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Number,
    Boolean,
    Text,
    Temporal,
    Other,
}

impl TypeFamily {
    #[must_use]
    pub fn of(data_type: &DataType) -> Self {
        let name = data_type.to_string().to_uppercase();

        if name.starts_with("BOOL") {
            Self::Boolean
        } else if ["DATE", "TIME", "YEAR"].iter().any(|e| name.starts_with(e)) {
            Self::Temporal
        } else if ["CHAR", "TEXT", "VARCHAR", "STRING", "ENUM", "SET", "JSON"]
            .iter()
            .any(|e| name.contains(e))
        {
            Self::Text
        } else if [
            "INT", "DEC", "NUMERIC", "REAL", "FLOAT", "DOUBLE", "BIT", "SERIAL",
        ]
        .iter()
        .any(|e| name.contains(e))
        {
            Self::Number
        } else {
            Self::Other
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SqlColumn {
    pub name: String,
    pub column_type: DataType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl SqlColumn {
    #[must_use]
    pub fn family(&self) -> TypeFamily {
        TypeFamily::of(&self.column_type)
    }
}

impl From<&ColumnDef> for SqlColumn {
    fn from(value: &ColumnDef) -> Self {
        let primary_key = value.options.iter().any(|e| {
            matches!(
                e.option,
                ColumnOption::Unique {
                    is_primary: true,
                    ..
                }
            )
        });

        Self {
            name: value.name.value.clone(),
            column_type: value.data_type.clone(),
            nullable: !primary_key
                && value
                    .options
                    .iter()
                    .find_map(|e| match e.option {
                        ColumnOption::Null => Some(true),
                        ColumnOption::NotNull => Some(false),
                        _ => None,
                    })
                    .unwrap_or(true),
            primary_key,
        }
    }
}

fn unquote(identifier: &str) -> String {
    identifier.trim_matches(['`', '"']).to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SqlTable {
    pub name: String,
    pub columns: Vec<SqlColumn>,
    pub primary_key: Option<String>,
}

impl SqlTable {
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&SqlColumn> {
        self.columns.iter().find(|e| e.name.eq(name))
    }
}

impl From<&CreateTable> for SqlTable {
    fn from(create_table: &CreateTable) -> Self {
        let mut columns: Vec<SqlColumn> =
            create_table.columns.iter().map(SqlColumn::from).collect();

        // `PRIMARY KEY (id)` declared as a table constraint, as MySQL prints it.
        let constraint_key = create_table.constraints.iter().find_map(|e| match e {
            TableConstraint::PrimaryKey { columns, .. } if columns.len() == 1 => {
                columns.first().map(|e| unquote(&e.to_string()))
            }
            _ => None,
        });

        if let Some(key) = &constraint_key {
            columns.iter_mut().filter(|e| e.name.eq(key)).for_each(|e| {
                e.primary_key = true;
                e.nullable = false;
            });
        }

        Self {
            name: create_table
                .name
                .0
                .last()
                .map(|e| unquote(&e.to_string()))
                .unwrap_or_default(),
            primary_key: columns
                .iter()
                .find(|e| e.primary_key)
                .map(|e| e.name.clone()),
            columns,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SqlSchema {
    pub tables: Vec<SqlTable>,
}

impl SqlSchema {
    #[must_use]
    pub fn find_table(&self, name: &str) -> Option<&SqlTable> {
        self.tables.iter().find(|e| e.name.eq(name))
    }

    /// # Errors
    ///
    /// If a column type fails to serialize.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Load a schema previously written by [`SqlSchema::to_json`].
    ///
    /// # Errors
    ///
    /// If `json` does not describe a schema.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
