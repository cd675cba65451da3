use chrono::{DateTime, Utc};
use intra_orm::{Entity, HasMany};
use serde::{Deserialize, Serialize};

use crate::hash::hash_string;

crate::string_column! {
    /// Promotion a module is taught to.
    pub enum Promo {
        Tek1 => "TEK 1",
        Tek2 => "TEK 2",
        Tek3 => "TEK 3",
        Tek4 => "TEK 4",
        Tek5 => "TEK 5",
        PreMsc1 => "PRE-MSC 1",
        PreMsc2 => "PRE-MSC 2",
        Msc1 => "MSC 1",
        Msc2 => "MSC 2",
        Teks => "TEKS",
    }
}

impl Default for Promo {
    fn default() -> Self {
        Self::Tek1
    }
}

crate::string_column! {
    pub enum ModuleFlags {
        Required => "Required Registration",
        MultipleRegistration => "Multiple Registration",
        None => "None",
        Progressive => "Progressive",
        Roadblock => "Roadblock",
        Optional => "Optional",
        Hidden1 => "Hidden 1",
        Hidden2 => "Hidden 2",
        AcquiredOrNot => "Acquired or not",
    }
}

impl Default for ModuleFlags {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Entity)]
#[serde(rename_all = "camelCase")]
#[orm(table = "modules", primary_key = id)]
pub struct Module {
    pub id: i64,
    pub name: String,
    pub name_full: String,
    pub code: String,
    pub semester: i64,
    pub year: i64,
    pub city: String,
    pub credits: i64,
    pub is_ongoing: bool,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_registration_open: bool,
    pub end_registration: Option<DateTime<Utc>>,
    pub is_roadblock: bool,
    pub is_mandatory: bool,
    pub promo: Promo,
    pub url: String,
    #[serde(default)]
    #[orm(one_to_many, inverse = "module_id")]
    pub flags: HasMany<ModuleFlag>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Entity)]
#[serde(rename_all = "camelCase")]
#[orm(table = "module_flags", primary_key = id)]
pub struct ModuleFlag {
    pub id: i64,
    pub module_id: i64,
    pub flag: ModuleFlags,
}

impl ModuleFlag {
    #[must_use]
    pub fn new(module_id: i64, flag: ModuleFlags) -> Self {
        Self {
            id: Self::compute_id(module_id, flag),
            module_id,
            flag,
        }
    }

    /// Stable id of the `flag` of a module.
    #[must_use]
    pub fn compute_id(module_id: i64, flag: ModuleFlags) -> i64 {
        (module_id * 31 + hash_string(flag.as_str())).abs()
    }
}

#[cfg(test)]
mod test {
    use intra_orm::{
        Entity, HasMany, Value,
        entity::column::ColumnType,
        registry::{self, RelationKind},
    };

    use super::{Module, ModuleFlag, ModuleFlags, Promo};

    #[test]
    fn test_compute_id() {
        assert_eq!(ModuleFlag::compute_id(12, ModuleFlags::Roadblock), 4_380_062_783);
        assert_eq!(ModuleFlag::new(12, ModuleFlags::Roadblock).id, 4_380_062_783);
    }

    #[test]
    fn test_enum_columns() {
        assert!(matches!(Promo::PreMsc1.to_value(), Value::String(e) if e == "PRE-MSC 1"));
        assert_eq!(
            ModuleFlags::from_value(Value::from("Acquired or not")),
            Ok(ModuleFlags::AcquiredOrNot)
        );
        assert!(ModuleFlags::from_value(Value::from("Mandatory")).is_err());
        assert!(Promo::from_value(Value::Integer(1)).is_err());
    }

    #[test]
    fn test_module_metadata() {
        registry::register::<Module>();
        registry::register::<ModuleFlag>();

        let metadata = Module::metadata();
        assert_eq!(metadata.table_name(), "modules");
        assert_eq!(metadata.primary_key(), "id");
        assert_eq!(
            metadata.column("endRegistration").physical_name,
            "end_registration"
        );
        assert!(metadata.column("endRegistration").nullable);
        assert!(!metadata.columns().contains_key("flags"));
        assert_eq!(metadata.relation("flags").kind, RelationKind::OneToMany);
        assert_eq!(
            metadata.relation("flags").inverse_field.as_deref(),
            Some("module_id")
        );

        assert_eq!(
            ModuleFlag::metadata().column("moduleId").physical_name,
            "module_id"
        );
    }

    #[test]
    fn test_module_json() {
        let json = serde_json::json!({
            "id": 4,
            "name": "Unix",
            "nameFull": "B1 - Unix",
            "code": "B-PSU-100",
            "semester": 1,
            "year": 2024,
            "city": "FR/PAR",
            "credits": 4,
            "isOngoing": true,
            "start": "2024-09-01T00:00:00Z",
            "end": "2025-01-10T00:00:00Z",
            "isRegistrationOpen": false,
            "endRegistration": null,
            "isRoadblock": true,
            "isMandatory": true,
            "promo": "TEK 1",
            "url": "/module/2024/B-PSU-100/PAR-1-1/",
        });

        let module: Module = serde_json::from_value(json).expect("Failed to parse module");
        assert_eq!(module.promo, Promo::Tek1);
        assert!(module.end_registration.is_none());
        assert!(matches!(module.flags, HasMany::Unresolved));
    }
}
