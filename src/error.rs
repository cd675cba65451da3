use thiserror::Error;

/// Errors surfaced by the connector and by row decoding.
///
/// Metadata lookups for unregistered types and marshalling contract violations are programmer
/// errors and panic instead of returning one of these.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported database URL `{0}`, expected a `mysql:` or `sqlite:` scheme")]
    UnsupportedDatabase(String),

    #[error("failed to decode column `{column}` of table `{table}`: {reason}")]
    Decode {
        table: String,
        column: String,
        reason: String,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn decode(
        table: impl Into<String>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Decode {
            table: table.into(),
            column: column.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
