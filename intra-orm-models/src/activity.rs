use chrono::{DateTime, Utc};
use intra_orm::{Entity, Reference};
use serde::{Deserialize, Serialize};

use crate::{Location, Module};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Entity)]
#[serde(rename_all = "camelCase")]
#[orm(table = "activities", primary_key = id)]
pub struct Activity {
    pub id: String,
    #[orm(many_to_one, column = "module_id")]
    pub module: Reference<Module>,
    pub name: String,
    pub is_ongoing: bool,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[orm(many_to_one, column = "location")]
    pub location: Reference<Location>,
    pub description: String,
    pub is_project: bool,
    pub is_graded: bool,
    pub has_meeting: bool,
    pub url: String,
    pub deadline: Option<DateTime<Utc>>,
    pub begin: DateTime<Utc>,
    pub end_register: Option<DateTime<Utc>>,
    pub r#type: String,
    pub main_type: String,
}
