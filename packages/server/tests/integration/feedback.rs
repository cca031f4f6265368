use common::Role;
use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn members_submit_and_committee_reads_feedback() {
    let app = TestApp::spawn().await;
    let committee = app
        .create_user_with_role("Cora", "cora@example.com", Role::Committee)
        .await;
    let mia = app.create_member("Mia", "mia@example.com").await;
    let zed = app.create_member("Zed", "zed@example.com").await;
    let id = app.create_event(&committee, "Talk", -48).await;

    let first = app
        .post_with_token(
            &routes::feedback(id),
            &json!({"rating": 5, "comment": "Loved it"}),
            &mia,
        )
        .await;
    assert_eq!(first.status, 201, "{}", first.text);
    assert_eq!(first.body["author"], "Mia Tester");

    let second = app
        .post_with_token(&routes::feedback(id), &json!({"rating": 2}), &zed)
        .await;
    assert_eq!(second.status, 201);
    assert_eq!(second.body["comment"], "");

    let res = app.get_with_token(&routes::feedback(id), &committee).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["average_rating"], 3.5);
    let items = res.body["feedback"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["rating"], 2, "newest first");
}

#[tokio::test]
async fn rating_outside_one_to_five_is_rejected() {
    let app = TestApp::spawn().await;
    let committee = app
        .create_user_with_role("Cora", "cora@example.com", Role::Committee)
        .await;
    let member = app.create_member("Mia", "mia@example.com").await;
    let id = app.create_event(&committee, "Talk", 24).await;

    for rating in [0, 6] {
        let res = app
            .post_with_token(&routes::feedback(id), &json!({"rating": rating}), &member)
            .await;
        assert_eq!(res.status, 400, "rating {rating} should be rejected");
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn feedback_list_without_entries_has_no_average() {
    let app = TestApp::spawn().await;
    let committee = app
        .create_user_with_role("Cora", "cora@example.com", Role::Committee)
        .await;
    let id = app.create_event(&committee, "Talk", 24).await;

    let res = app.get_with_token(&routes::feedback(id), &committee).await;

    assert_eq!(res.status, 200);
    assert!(res.body["average_rating"].is_null());
    assert!(res.body["feedback"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn feedback_for_unknown_event_is_not_found() {
    let app = TestApp::spawn().await;
    let member = app.create_member("Mia", "mia@example.com").await;

    let res = app
        .post_with_token(&routes::feedback(77), &json!({"rating": 4}), &member)
        .await;

    assert_eq!(res.status, 404);
}
