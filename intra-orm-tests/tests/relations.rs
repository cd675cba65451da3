use chrono::{TimeZone, Utc};
use intra_orm::{Connector, Filter, HasMany, Persist, Reference};
use intra_orm_models::{Activity, Event, Location, LocationType, Module, ModuleFlag, ModuleFlags};
use intra_orm_tests::setup;

fn module(id: i64) -> Module {
    Module {
        id,
        name: "Unix".to_string(),
        code: "B-PSU-100".to_string(),
        start: Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2025, 1, 12, 23, 42, 0).unwrap(),
        ..Module::default()
    }
}

fn location() -> Location {
    Location {
        id: "FR/PAR/Epitech/Amphi".to_string(),
        name: "Amphitheatre".to_string(),
        floor: Some(2),
        ..Location::default()
    }
}

fn activity(module_id: i64, location_id: &str) -> Activity {
    Activity {
        id: "acti-42".to_string(),
        module: Reference::new(module_id),
        location: Reference::new(location_id.to_string()),
        name: "Kick-off".to_string(),
        start: Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 9, 2, 11, 0, 0).unwrap(),
        begin: Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap(),
        r#type: "Kick-off".to_string(),
        main_type: "other".to_string(),
        ..Activity::default()
    }
}

async fn stored_flags(connector: &Connector, module_id: i64) -> Vec<ModuleFlags> {
    let mut flags = connector
        .get_many(&Filter::<ModuleFlag>::eq("moduleId", module_id))
        .await
        .expect("Failed to read flags")
        .into_iter()
        .map(|e| e.flag)
        .collect::<Vec<_>>();
    flags.sort_by_key(|e| e.as_str());
    flags
}

#[tokio::test]
async fn test_many_to_one_resolution() {
    let (connector, _) = setup().await;

    connector.insert(&module(1)).await.expect("Failed to insert module");
    connector.insert(&location()).await.expect("Failed to insert location");

    let mut activity = activity(1, "FR/PAR/Epitech/Amphi");
    connector.insert(&activity).await.expect("Failed to insert activity");

    activity
        .resolve_relations(&connector)
        .await
        .expect("Failed to resolve relations");

    assert_eq!(activity.module.get().map(|e| e.name.as_str()), Some("Unix"));
    assert_eq!(activity.location.get().and_then(|e| e.floor), Some(2));
    assert_eq!(activity.module.key(), 1);
}

#[tokio::test]
async fn test_missing_target_stays_unresolved() {
    let (connector, _) = setup().await;

    let mut activity = activity(404, "Nowhere");
    activity
        .resolve_relations(&connector)
        .await
        .expect("Failed to resolve relations");

    assert!(matches!(activity.module, Reference::Unresolved(404)));
    assert!(activity.location.get().is_none());
}

#[tokio::test]
async fn test_one_to_many_resolution() {
    let (connector, _) = setup().await;

    connector.insert(&module(1)).await.expect("Failed to insert module");
    connector.insert(&module(2)).await.expect("Failed to insert module");
    for flag in [
        ModuleFlag::new(1, ModuleFlags::Roadblock),
        ModuleFlag::new(1, ModuleFlags::Hidden1),
        ModuleFlag::new(2, ModuleFlags::Optional),
    ] {
        connector.insert(&flag).await.expect("Failed to insert flag");
    }

    let mut first = module(1);
    first
        .resolve_relations(&connector)
        .await
        .expect("Failed to resolve relations");
    assert_eq!(first.flags.get().map(<[ModuleFlag]>::len), Some(2));

    let mut empty = module(3);
    empty
        .resolve_relations(&connector)
        .await
        .expect("Failed to resolve relations");
    assert_eq!(empty.flags.get().map(<[ModuleFlag]>::len), Some(0));
}

#[tokio::test]
async fn test_one_to_many_cascade() {
    let (connector, _) = setup().await;

    let mut module = module(7);
    module.flags = HasMany::Resolved(vec![
        ModuleFlag::new(7, ModuleFlags::Roadblock),
        ModuleFlag::new(7, ModuleFlags::Progressive),
    ]);

    let created = module.save(&connector).await.expect("Failed to save module");
    assert!(created);
    assert_eq!(
        stored_flags(&connector, 7).await,
        vec![ModuleFlags::Progressive, ModuleFlags::Roadblock]
    );

    module.name = "Unix 2".to_string();
    module.flags = HasMany::Resolved(vec![
        ModuleFlag::new(7, ModuleFlags::Progressive),
        ModuleFlag::new(7, ModuleFlags::Optional),
    ]);

    let created = module.save(&connector).await.expect("Failed to save module");
    assert!(!created);
    assert_eq!(
        stored_flags(&connector, 7).await,
        vec![ModuleFlags::Optional, ModuleFlags::Progressive]
    );

    let stored = connector
        .get_one(&Filter::<Module>::by_key(&7))
        .await
        .expect("Failed to read module")
        .expect("Module was not stored");
    assert_eq!(stored.name, "Unix 2");
}

#[tokio::test]
async fn test_unresolved_collections_are_left_alone() {
    let (connector, statements) = setup().await;

    connector
        .insert(&ModuleFlag::new(9, ModuleFlags::Roadblock))
        .await
        .expect("Failed to insert flag");
    statements.clear();

    module(9).save(&connector).await.expect("Failed to save module");

    assert_eq!(statements.count("DELETE"), 0);
    assert_eq!(stored_flags(&connector, 9).await, vec![ModuleFlags::Roadblock]);
}

#[tokio::test]
async fn test_many_to_many_cascade_and_resolution() {
    let (connector, _) = setup().await;

    let amphi = LocationType::new("Amphi", "Amphitheatre", 300);
    let room = LocationType::new("Salle 1", "Salle de cours", 40);
    let lab = LocationType::new("Lab", "Salle de TP", 24);
    for e in [&amphi, &room, &lab] {
        connector.insert(e).await.expect("Failed to insert type");
    }

    let mut location = location();
    location.types = HasMany::Resolved(vec![amphi.clone(), room.clone()]);
    location.save(&connector).await.expect("Failed to save location");

    let mut stored = location.clone();
    stored.types = HasMany::Unresolved;
    stored
        .resolve_relations(&connector)
        .await
        .expect("Failed to resolve relations");

    let mut ids = stored
        .types
        .get()
        .expect("Types were not resolved")
        .iter()
        .map(|e| e.id)
        .collect::<Vec<_>>();
    ids.sort_unstable();
    let mut expected = vec![amphi.id, room.id];
    expected.sort_unstable();
    assert_eq!(ids, expected);

    location.types = HasMany::Resolved(vec![room.clone(), lab.clone()]);
    location.save(&connector).await.expect("Failed to save location");

    let rows = connector
        .fetch_table("locations_with_types", None)
        .await
        .expect("Failed to read join table");
    assert_eq!(rows.len(), 2);

    let remaining = connector
        .get_many(&Filter::<LocationType>::all())
        .await
        .expect("Failed to read types");
    assert_eq!(remaining.len(), 3);
}

#[tokio::test]
async fn test_deep_resolution() {
    let (connector, _) = setup().await;

    let salle = LocationType::new("Salle 1", "Salle de cours", 40);
    connector.insert(&salle).await.expect("Failed to insert type");

    let mut location = location();
    location.types = HasMany::Resolved(vec![salle]);
    location.save(&connector).await.expect("Failed to save location");

    connector.insert(&module(1)).await.expect("Failed to insert module");
    connector
        .insert(&ModuleFlag::new(1, ModuleFlags::Roadblock))
        .await
        .expect("Failed to insert flag");
    connector
        .insert(&activity(1, "FR/PAR/Epitech/Amphi"))
        .await
        .expect("Failed to insert activity");

    let mut event = Event {
        id: Event::compute_id("acti-42", 0),
        activity: Reference::new("acti-42".to_string()),
        location: Reference::new("FR/PAR/Epitech/Amphi".to_string()),
        ..Event::default()
    };
    event
        .resolve_relations_deep(&connector)
        .await
        .expect("Failed to resolve relations");

    let activity = event.activity.get().expect("Activity was not resolved");
    assert!(activity.module.get().is_some());
    assert!(activity.location.get().is_some());
    // One hop only: the module's own collections stay unresolved.
    assert!(matches!(
        activity.module.get().map(|e| &e.flags),
        Some(HasMany::Unresolved)
    ));

    let location = event.location.get().expect("Location was not resolved");
    assert_eq!(location.types.get().map(<[LocationType]>::len), Some(1));
}
