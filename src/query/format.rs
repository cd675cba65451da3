use crate::value::{
    Value,
    marshal::{Dialect, literal_of},
};

/// Substitute placeholders in a raw statement: `?` takes the literal rendering of the next
/// parameter, `??` the next parameter as a quoted identifier. Placeholders inside quoted strings
/// or identifiers are left alone, and so are placeholders left over once the parameters run out.
#[must_use]
pub fn format_query(sql: &str, params: &[Value], dialect: Dialect) -> String {
    let mut params = params.iter();
    let mut formatted = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(open) = quote {
            formatted.push(c);
            if c == '\\' && open != '`' {
                if let Some(escaped) = chars.next() {
                    formatted.push(escaped);
                }
            } else if c == open {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                formatted.push(c);
            }
            '?' => {
                let identifier = chars.next_if_eq(&'?').is_some();

                match params.next() {
                    Some(param) if identifier => {
                        formatted.push_str(&dialect.quote_identifier(&param.to_string()));
                    }
                    Some(param) => formatted.push_str(&literal_of(param).render(dialect)),
                    None => formatted.push_str(if identifier { "??" } else { "?" }),
                }
            }
            _ => formatted.push(c),
        }
    }

    formatted
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parameters() {
        assert_eq!(
            format_query(
                "SELECT * FROM ?? WHERE id = ? AND name = ?",
                &[Value::from("users"), Value::from(1), Value::from("O'Neil")],
                Dialect::MySql
            ),
            r"SELECT * FROM `users` WHERE id = 1 AND name = 'O\'Neil'"
        );
    }

    #[test]
    fn test_quoted_placeholders_are_kept() {
        assert_eq!(
            format_query(
                "SELECT '?', \"a?\" FROM t WHERE x = ?",
                &[Value::Null],
                Dialect::Sqlite
            ),
            "SELECT '?', \"a?\" FROM t WHERE x = NULL"
        );
        assert_eq!(
            format_query(r"SELECT 'it\'s ?' WHERE y = ?", &[Value::from(true)], Dialect::MySql),
            r"SELECT 'it\'s ?' WHERE y = TRUE"
        );
    }

    #[test]
    fn test_missing_parameters_are_kept() {
        assert_eq!(
            format_query("a = ? AND b = ?", &[Value::from(2)], Dialect::MySql),
            "a = 2 AND b = ?"
        );
    }
}
