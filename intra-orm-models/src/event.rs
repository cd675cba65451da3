use chrono::{DateTime, Utc};
use intra_orm::{Entity, Reference};
use serde::{Deserialize, Serialize};

use crate::{Activity, Location};

/// One session of an [`Activity`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, Entity)]
#[serde(rename_all = "camelCase")]
#[orm(table = "events", primary_key = id)]
pub struct Event {
    pub id: String,
    #[orm(many_to_one, column = "activity_id")]
    pub activity: Reference<Activity>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[orm(many_to_one, column = "location")]
    pub location: Reference<Location>,
    pub session_index: i64,
}

impl Event {
    /// Id of the `index`-th session of an activity: `acti-42` becomes `event-42-<index>`.
    #[must_use]
    pub fn compute_id(activity_id: &str, index: i64) -> String {
        format!("{activity_id}-{index}").replacen("acti-", "event-", 1)
    }
}

#[cfg(test)]
mod test {
    use super::Event;

    #[test]
    fn test_compute_id() {
        assert_eq!(Event::compute_id("acti-123", 4), "event-123-4");
        assert_eq!(Event::compute_id("other", 0), "other-0");
    }
}
