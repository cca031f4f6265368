use common::Role;
use serde_json::json;

use crate::common::{TestApp, TestResponse, routes};

async fn setup(app: &TestApp) -> (String, String, i32) {
    let committee = app
        .create_user_with_role("Cora", "cora@example.com", Role::Committee)
        .await;
    let member = app.create_member("Mia", "mia@example.com").await;
    let id = app.create_event(&committee, "Board games", 24).await;
    (committee, member, id)
}

#[tokio::test]
async fn member_can_rsvp_and_see_it_in_their_list() {
    let app = TestApp::spawn().await;
    let (_, member, id) = setup(&app).await;

    let res = app.rsvp(id, true, &member).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "going");
    assert_eq!(res.body["event_id"], id);

    let mine = app.get_with_token(routes::MY_RSVPS, &member).await;
    let rsvps = mine.body["rsvps"].as_array().unwrap();
    assert_eq!(rsvps.len(), 1);
    assert_eq!(rsvps[0]["title"], "Board games");
}

#[tokio::test]
async fn last_write_wins_and_only_one_row_exists() {
    let app = TestApp::spawn().await;
    let (committee, member, id) = setup(&app).await;

    app.rsvp(id, true, &member).await;
    let res = app.rsvp(id, false, &member).await;
    assert_eq!(res.body["status"], "cancelled");

    let detail = app.get_with_token(&routes::event(id), &member).await;
    assert_eq!(detail.body["my_rsvp"], "cancelled");
    assert_eq!(detail.body["going_count"], 0);

    let mine = app.get_with_token(routes::MY_RSVPS, &member).await;
    assert!(mine.body["rsvps"].as_array().unwrap().is_empty());

    let attendees = app.get_with_token(&routes::attendees(id), &committee).await;
    assert_eq!(attendees.body["total"], 0);
}

#[tokio::test]
async fn missing_going_field_counts_as_not_going() {
    let app = TestApp::spawn().await;
    let (_, member, id) = setup(&app).await;

    let res = app
        .post_with_token(&routes::rsvp(id), &json!({}), &member)
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "cancelled");
}

#[tokio::test]
async fn rsvp_without_a_json_body_counts_as_not_going() {
    let app = TestApp::spawn().await;
    let (_, member, id) = setup(&app).await;
    app.rsvp(id, true, &member).await;

    let empty = app
        .client
        .post(app.url(&routes::rsvp(id)))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    let empty = TestResponse::from_response(empty).await;
    assert_eq!(empty.status, 200);
    assert_eq!(empty.body["status"], "cancelled");

    let form = app
        .client
        .post(app.url(&routes::rsvp(id)))
        .bearer_auth(&member)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("going=true")
        .send()
        .await
        .unwrap();
    let form = TestResponse::from_response(form).await;
    assert_eq!(form.status, 200);
    assert_eq!(form.body["status"], "cancelled");

    let truthy = app
        .post_with_token(&routes::rsvp(id), &json!({"going": 1}), &member)
        .await;
    assert_eq!(truthy.body["status"], "going");
}

#[tokio::test]
async fn rsvp_to_unknown_event_is_not_found() {
    let app = TestApp::spawn().await;
    let (_, member, _) = setup(&app).await;

    let res = app.rsvp(4242, true, &member).await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn removing_an_rsvp_deletes_it() {
    let app = TestApp::spawn().await;
    let (_, member, id) = setup(&app).await;
    app.rsvp(id, true, &member).await;

    let first = app.delete_with_token(&routes::rsvp(id), &member).await;
    assert_eq!(first.status, 204);

    let second = app.delete_with_token(&routes::rsvp(id), &member).await;
    assert_eq!(second.status, 404);

    let detail = app.get_with_token(&routes::event(id), &member).await;
    assert!(detail.body["my_rsvp"].is_null());
}

#[tokio::test]
async fn committee_sees_attendees_sorted_by_name() {
    let app = TestApp::spawn().await;
    let (committee, member, id) = setup(&app).await;
    let zed = app.create_member("Zed", "zed@example.com").await;
    let amy = app.create_member("Amy", "amy@example.com").await;
    let ned = app.create_member("Ned", "ned@example.com").await;
    for token in [&member, &zed, &amy] {
        app.rsvp(id, true, token).await;
    }
    app.rsvp(id, false, &ned).await;

    let res = app.get_with_token(&routes::attendees(id), &committee).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["total"], 3);
    let names: Vec<&str> = res.body["attendees"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["first_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Amy", "Mia", "Zed"]);
}

#[tokio::test]
async fn rsvp_changes_update_event_stats_and_activity_log() {
    let app = TestApp::spawn().await;
    let (committee, member, id) = setup(&app).await;

    app.rsvp(id, true, &member).await;
    app.rsvp(id, true, &committee).await;
    app.wait_for_going_count(id, 2).await;

    app.rsvp(id, false, &member).await;
    let stats = app.wait_for_going_count(id, 1).await;
    assert_eq!(stats.data["event_id"], id);

    let entry = app
        .wait_for_document(common::document::collections::ACTIVITY_LOGS, |doc| {
            doc.data["action"] == "RSVP_UPDATED" && doc.data["new_status"] == "cancelled"
        })
        .await;
    assert_eq!(entry.data["previous_status"], "going");
    assert_eq!(entry.data["user"], "mia@example.com");
}
