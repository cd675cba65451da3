#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    MySql,
    Sqlite,
}

impl DbType {
    #[must_use]
    pub fn from_connection_string(input: &str) -> Option<Self> {
        let lower = input.to_lowercase();

        if lower.starts_with("sqlite") {
            Some(Self::Sqlite)
        } else if lower.starts_with("mysql") || lower.starts_with("mariadb") {
            Some(Self::MySql)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::DbType;

    #[test]
    fn test_from_connection_string() {
        assert_eq!(
            DbType::from_connection_string("mysql://bot@localhost:3306/intra"),
            Some(DbType::MySql)
        );
        assert_eq!(
            DbType::from_connection_string("sqlite::memory:"),
            Some(DbType::Sqlite)
        );
        assert_eq!(DbType::from_connection_string("postgres://localhost"), None);
    }
}
