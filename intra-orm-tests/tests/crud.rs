use intra_orm::{Filter, Operator, Value};
use intra_orm_tests::{Widget, setup};

fn widget(id: &str, count: i64, active: bool) -> Widget {
    Widget {
        id: id.to_string(),
        count,
        active,
    }
}

#[tokio::test]
async fn test_read_converts_stored_values() {
    let (connector, _) = setup().await;

    connector
        .execute_with(
            "INSERT INTO widgets (id, count, active) VALUES (?, ?, ?)",
            &[Value::from("w1"), Value::from("3"), Value::Integer(1)],
        )
        .await
        .expect("Failed to insert widget");

    let found = connector
        .get_one(&Filter::<Widget>::eq("id", "w1"))
        .await
        .expect("Failed to read widget");

    assert_eq!(found, Some(widget("w1", 3, true)));
}

#[tokio::test]
async fn test_empty_filter_reads_everything() {
    let (connector, statements) = setup().await;

    for e in [widget("a", 1, true), widget("b", 2, false)] {
        connector.insert(&e).await.expect("Failed to insert widget");
    }

    let all = connector
        .get_many(&Filter::<Widget>::all())
        .await
        .expect("Failed to read widgets");

    assert_eq!(all, vec![widget("a", 1, true), widget("b", 2, false)]);
    assert!(statements.all().contains(&"SELECT * FROM widgets".to_string()));
}

#[tokio::test]
async fn test_get_one_without_match() {
    let (connector, _) = setup().await;

    let found = connector
        .get_one(&Filter::<Widget>::eq("id", "missing"))
        .await
        .expect("Failed to read widget");

    assert!(found.is_none());
}

#[tokio::test]
async fn test_filter_operators() {
    let (connector, _) = setup().await;

    for e in [
        widget("a", 1, true),
        widget("b", 5, true),
        widget("c", 9, false),
    ] {
        connector.insert(&e).await.expect("Failed to insert widget");
    }

    let filter = Filter::<Widget>::predicate("count", Operator::GreaterOrEqual, 5)
        .and(Filter::eq("active", true));
    let found = connector
        .get_many(&filter)
        .await
        .expect("Failed to read widgets");

    assert_eq!(found, vec![widget("b", 5, true)]);

    let negated = connector
        .get_many(&Filter::<Widget>::eq("active", true).not())
        .await
        .expect("Failed to read widgets");

    assert_eq!(negated, vec![widget("c", 9, false)]);
}

#[tokio::test]
async fn test_update_requires_a_match() {
    let (connector, statements) = setup().await;

    let missing = connector
        .update(&widget("w1", 1, true), &Filter::eq("id", "w1"))
        .await
        .expect("Failed to update widget");

    assert!(!missing);
    assert_eq!(statements.count("UPDATE"), 0);

    connector
        .insert(&widget("w1", 1, true))
        .await
        .expect("Failed to insert widget");

    let updated = connector
        .update(&widget("w1", 7, true), &Filter::eq("id", "w1"))
        .await
        .expect("Failed to update widget");

    assert!(updated);
    assert_eq!(statements.count("UPDATE"), 1);
}

#[tokio::test]
async fn test_delete() {
    let (connector, _) = setup().await;

    for e in [widget("a", 1, true), widget("b", 2, false)] {
        connector.insert(&e).await.expect("Failed to insert widget");
    }

    let deleted = connector
        .delete(&Filter::<Widget>::eq("active", false))
        .await
        .expect("Failed to delete widgets");
    assert_eq!(deleted, 1);

    let deleted = connector
        .delete(&Filter::<Widget>::all())
        .await
        .expect("Failed to delete widgets");
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn test_raw_query_placeholders() {
    let (connector, _) = setup().await;

    connector
        .insert(&widget("it's", 4, true))
        .await
        .expect("Failed to insert widget");

    let rows = connector
        .query("SELECT ?? FROM widgets WHERE id = ?", &[
            Value::from("count"),
            Value::from("it's"),
        ])
        .await
        .expect("Failed to run query");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("count"), Some(&Value::from("4")));
}
