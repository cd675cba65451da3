use crate::error::{Error, Result};

/// Where and how a [`Connector`](crate::connector::Connector) connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    pub url: String,
    /// Log every statement at `info` instead of `debug`.
    pub log_statements: bool,
}

impl ConnectorConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            log_statements: false,
        }
    }

    /// Read the configuration from the environment, or from a corresponding `.env` file.
    ///
    /// `DATABASE_URL` is used as is when set. Otherwise a MySQL URL is assembled from `DB_HOST`,
    /// `DB_PORT` (3306 when unset), `DB_USER`, `DB_PASSWORD` and `DB_NAME`.
    /// `SHOW_SQL_QUERIES=true` enables statement logging.
    ///
    /// # Errors
    ///
    /// If neither `DATABASE_URL` nor the required `DB_*` variables are set.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`ConnectorConfig::from_env`], reading variables through `var`.
    ///
    /// # Errors
    ///
    /// If neither `DATABASE_URL` nor the required `DB_*` variables are set.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_statements = var("SHOW_SQL_QUERIES").is_some_and(|e| e.eq("true"));

        if let Some(url) = var("DATABASE_URL") {
            return Ok(Self {
                url,
                log_statements,
            });
        }

        let required = |name: &str| {
            var(name).ok_or_else(|| {
                Error::Config(format!(
                    "missing `{name}`, set either `DATABASE_URL` or the `DB_*` variables"
                ))
            })
        };

        let host = required("DB_HOST")?;
        let user = required("DB_USER")?;
        let name = required("DB_NAME")?;
        let password = var("DB_PASSWORD").unwrap_or_default();
        let port = match var("DB_PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("invalid `DB_PORT` `{port}`: {e}")))?,
            None => 3306,
        };

        let credentials = if password.is_empty() {
            user
        } else {
            format!("{user}:{password}")
        };

        Ok(Self {
            url: format!("mysql://{credentials}@{host}:{port}/{name}"),
            log_statements,
        })
    }
}
