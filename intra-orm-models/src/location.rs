use intra_orm::{Entity, HasMany};
use serde::{Deserialize, Serialize};

use crate::hash::hash_string;

#[derive(Debug, Clone, Serialize, Deserialize, Entity)]
#[serde(rename_all = "camelCase")]
#[orm(table = "locations", primary_key = id)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub disabled: Option<bool>,
    pub floor: Option<i64>,
    pub image_path: Option<String>,
    #[serde(default)]
    #[orm(many_to_many, join_table = "locations_with_types")]
    pub types: HasMany<LocationType>,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            id: "DEV/XXX".to_string(),
            name: "Dev".to_string(),
            disabled: None,
            floor: None,
            image_path: None,
            types: HasMany::Unresolved,
        }
    }
}

/// A kind of room a location can be booked as.
#[derive(Debug, Clone, Serialize, Deserialize, Entity)]
#[serde(rename_all = "camelCase")]
#[orm(table = "locations_types", primary_key = id)]
pub struct LocationType {
    pub id: i64,
    pub seats: i64,
    pub r#type: String,
    pub name: String,
}

impl Default for LocationType {
    fn default() -> Self {
        Self::new("Dev", "Dev", 0)
    }
}

impl LocationType {
    #[must_use]
    pub fn new(name: &str, r#type: &str, seats: i64) -> Self {
        Self {
            id: Self::compute_id(name, r#type, seats),
            seats,
            r#type: r#type.to_string(),
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn compute_id(name: &str, r#type: &str, seats: i64) -> i64 {
        let hash = hash_string(name);
        let hash = hash * 31 + hash_string(r#type);
        (hash * 31 + seats).abs()
    }
}

#[cfg(test)]
mod test {
    use intra_orm::{Entity, registry};

    use super::{Location, LocationType};

    #[test]
    fn test_compute_id() {
        assert_eq!(
            LocationType::compute_id("Salle 1", "Salle de cours", 40),
            1_365_168_815_484
        );
        assert_eq!(LocationType::default().id, 563_860_693_344);
    }

    #[test]
    fn test_raw_identifier_field() {
        registry::register::<LocationType>();

        let metadata = LocationType::metadata();
        assert_eq!(metadata.column("type").physical_name, "type");
        assert_eq!(
            serde_json::to_value(LocationType::new("Dev", "Dev", 0)).expect("Failed to serialize")
                ["type"],
            "Dev"
        );
    }

    #[test]
    fn test_join_table_columns() {
        registry::register::<Location>();
        registry::register::<LocationType>();

        let relation = Location::metadata().relation("types").clone();
        assert_eq!(relation.join_table_name(), "locations_with_types");
        assert_eq!(relation.join_owner_column(), "locations_id");
        assert_eq!(relation.join_target_column(), "locations_types_id");
    }
}
