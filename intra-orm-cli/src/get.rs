use std::io::Write;

use clap::Parser;
use eyre::Context;
use intra_orm::{
    Connector, Entity, Filter, JsonEntity, Persist, Value,
    value::{ValueKind, marshal::parse_date},
};
use intra_orm_models::{Activity, Event, Location, LocationType, Module, ModuleFlag};

/// Print the rows of a table as JSON
#[derive(Parser, Debug)]
pub struct Get {
    /// The table to read, e.g. `modules`.
    table: String,

    /// Only keep rows where a field holds a value, e.g. `--filter isOngoing=true`. Repeated
    /// filters must all match.
    #[arg(short, long, value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    filter: Vec<(String, String)>,

    /// Resolve relations, one level further than the rows themselves.
    #[arg(long)]
    deep: bool,
}

fn parse_assignment(input: &str) -> Result<(String, String), String> {
    input
        .split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{input}`"))
}

/// Read `raw` as a value of `kind`.
fn parse_value(raw: &str, kind: ValueKind) -> Option<Value> {
    match kind {
        ValueKind::Number => raw
            .parse::<i64>()
            .map(Value::Integer)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().map(Value::Float)),
        ValueKind::Boolean => match raw {
            "true" | "1" => Some(Value::Boolean(true)),
            "false" | "0" => Some(Value::Boolean(false)),
            _ => None,
        },
        ValueKind::String => Some(Value::from(raw)),
        ValueKind::Date => parse_date(raw).map(Value::Date),
    }
}

fn build_filter<T: Entity>(assignments: &[(String, String)]) -> eyre::Result<Filter<T>> {
    let metadata = T::metadata();

    let entries = assignments
        .iter()
        .map(|(field, raw)| {
            let column = metadata.columns().get(field).ok_or_else(|| {
                eyre::eyre!(
                    "`{}` has no field `{field}`, expected one of: {}",
                    metadata.table_name(),
                    metadata
                        .columns()
                        .keys()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })?;

            let value = parse_value(raw, column.kind)
                .ok_or_else(|| eyre::eyre!("`{raw}` is not a valid {} for `{field}`", column.kind))?;

            Ok((field, value))
        })
        .collect::<eyre::Result<Vec<_>>>()?;

    Ok(Filter::from_map(entries))
}

async fn fetch<T: JsonEntity>(
    connector: &Connector,
    assignments: &[(String, String)],
    deep: bool,
) -> eyre::Result<serde_json::Value> {
    let filter = build_filter::<T>(assignments)?;
    let mut rows = connector
        .get_many(&filter)
        .await
        .with_context(|| format!("Failed to read `{}`", T::metadata().table_name()))?;

    if deep {
        for row in &mut rows {
            row.resolve_relations_deep(connector)
                .await
                .context("Failed to resolve relations")?;
        }
    }

    Ok(serde_json::Value::Array(
        rows.iter()
            .map(JsonEntity::to_json)
            .collect::<intra_orm::Result<_>>()?,
    ))
}

impl Get {
    pub async fn run(&self, connector: &Connector) -> eyre::Result<()> {
        let (filter, deep) = (self.filter.as_slice(), self.deep);

        let json = match self.table.as_str() {
            "modules" => fetch::<Module>(connector, filter, deep).await,
            "module_flags" => fetch::<ModuleFlag>(connector, filter, deep).await,
            "locations" => fetch::<Location>(connector, filter, deep).await,
            "locations_types" => fetch::<LocationType>(connector, filter, deep).await,
            "activities" => fetch::<Activity>(connector, filter, deep).await,
            "events" => fetch::<Event>(connector, filter, deep).await,
            other => Err(eyre::eyre!(
                "Unknown table `{other}`, expected one of: {}",
                intra_orm_models::TABLES.join(", ")
            )),
        }?;

        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialize rows")?
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use intra_orm::{Value, value::ValueKind};
    use intra_orm_models::Module;

    use super::{build_filter, parse_assignment, parse_value};

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("name=B1 - Unix=Shell"),
            Ok(("name".to_string(), "B1 - Unix=Shell".to_string()))
        );
        assert!(parse_assignment("name").is_err());
    }

    #[test]
    fn test_parse_value() {
        assert!(matches!(parse_value("12", ValueKind::Number), Some(Value::Integer(12))));
        assert!(matches!(parse_value("1.5", ValueKind::Number), Some(Value::Float(_))));
        assert!(matches!(parse_value("true", ValueKind::Boolean), Some(Value::Boolean(true))));
        assert!(parse_value("yes", ValueKind::Boolean).is_none());
        assert!(matches!(parse_value("2024-09-02", ValueKind::Date), Some(Value::Date(_))));
    }

    #[test]
    fn test_build_filter() {
        intra_orm_models::register_all();

        let filter = build_filter::<Module>(&[
            ("credits".to_string(), "4".to_string()),
            ("isOngoing".to_string(), "true".to_string()),
            ("promo".to_string(), "TEK 1".to_string()),
        ])
        .expect("Failed to build filter");

        assert_eq!(
            filter.compile(),
            "(credits = 4 AND is_ongoing = TRUE) AND (promo = 'TEK 1' AND TRUE)"
        );
        assert!(build_filter::<Module>(&[("unknown".to_string(), "1".to_string())]).is_err());
        assert!(build_filter::<Module>(&[("credits".to_string(), "four".to_string())]).is_err());
    }
}
