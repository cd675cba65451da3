use intra_orm::{Filter, Upsert};
use intra_orm_tests::{Widget, setup};

fn widget(count: i64) -> Widget {
    Widget {
        id: "w1".to_string(),
        count,
        active: true,
    }
}

#[tokio::test]
async fn test_upsert_creates_missing_row() {
    let (connector, _) = setup().await;
    let filter = Filter::<Widget>::by_key(&"w1".to_string());

    let upsert = connector
        .insert_or_update(&widget(1), &filter)
        .await
        .expect("Failed to upsert widget");
    assert!(upsert.is_created());

    let stored = connector
        .get_one(&filter)
        .await
        .expect("Failed to read widget")
        .expect("Widget was not stored");
    assert_eq!(stored, widget(1));
}

#[tokio::test]
async fn test_upsert_skips_equal_rows() {
    let (connector, statements) = setup().await;
    let filter = Filter::<Widget>::by_key(&"w1".to_string());

    connector
        .insert(&widget(1))
        .await
        .expect("Failed to insert widget");
    statements.clear();

    let upsert = connector
        .insert_or_update(&widget(1), &filter)
        .await
        .expect("Failed to upsert widget");

    let Upsert::Existing(diff) = upsert else {
        panic!("Expected an existing row");
    };
    assert!(!diff.is_diff);
    assert_eq!(diff.old, diff.new);
    assert_eq!(statements.count("UPDATE"), 0);
    assert_eq!(statements.count("INSERT"), 0);
}

#[tokio::test]
async fn test_upsert_updates_changed_rows() {
    let (connector, statements) = setup().await;
    let filter = Filter::<Widget>::by_key(&"w1".to_string());

    connector
        .insert(&widget(1))
        .await
        .expect("Failed to insert widget");
    statements.clear();

    let diff = connector
        .insert_or_update(&widget(2), &filter)
        .await
        .expect("Failed to upsert widget")
        .into_diff()
        .expect("Expected an existing row");

    assert!(diff.is_diff);
    assert_eq!(diff.old, widget(1));
    assert_eq!(diff.new, widget(2));
    assert_eq!(statements.count("UPDATE"), 1);

    let stored = connector
        .get_one(&filter)
        .await
        .expect("Failed to read widget");
    assert_eq!(stored, Some(widget(2)));
}
