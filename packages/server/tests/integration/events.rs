use common::Role;
use serde_json::json;

use crate::common::{MAX_IMAGE_SIZE, TestApp, routes};

async fn committee(app: &TestApp) -> String {
    app.create_user_with_role("Cora", "cora@example.com", Role::Committee)
        .await
}

mod management {
    use super::*;

    #[tokio::test]
    async fn committee_can_create_an_event() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;

        let res = app
            .post_with_token(
                routes::EVENTS,
                &json!({
                    "title": "  Spring picnic ",
                    "description": "Sandwiches provided.",
                    "location": "Park",
                    "start_time": "2031-04-01T11:00:00Z",
                    "end_time": "2031-04-01T15:00:00Z",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["title"], "Spring picnic");
        assert_eq!(res.body["going_count"], 0);
        assert!(res.body["image_url"].is_null());
    }

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;

        let res = app
            .post_with_token(
                routes::EVENTS,
                &json!({
                    "title": "Backwards",
                    "start_time": "2031-04-01T15:00:00Z",
                    "end_time": "2031-04-01T11:00:00Z",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn empty_title_is_rejected() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;

        let res = app
            .post_with_token(
                routes::EVENTS,
                &json!({
                    "title": "   ",
                    "start_time": "2031-04-01T11:00:00Z",
                    "end_time": "2031-04-01T15:00:00Z",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;
        let id = app.create_event(&token, "Quiz night", 48).await;

        let res = app
            .patch_with_token(&routes::event(id), &json!({"location": "Library"}), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Quiz night");
        assert_eq!(res.body["location"], "Library");
    }

    #[tokio::test]
    async fn update_that_breaks_time_order_is_rejected() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;
        let id = app.create_event(&token, "Quiz night", 48).await;

        let res = app
            .patch_with_token(
                &routes::event(id),
                &json!({"end_time": "2000-01-01T00:00:00Z"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn deleting_an_event_removes_it_with_rsvps_feedback_and_documents() {
        use common::document::collections;
        use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
        use server::entity::{feedback, rsvp};

        let app = TestApp::spawn().await;
        let token = committee(&app).await;
        let member = app.create_member("Mia", "mia@example.com").await;
        let id = app.create_event(&token, "Quiz night", 48).await;
        assert_eq!(app.rsvp(id, true, &member).await.status, 200);
        let fb = app
            .post_with_token(
                &routes::feedback(id),
                &json!({"rating": 4, "comment": "Fun"}),
                &member,
            )
            .await;
        assert_eq!(fb.status, 201);
        app.wait_for_going_count(id, 1).await;
        app.wait_for_document(collections::EVENTS_MIRROR, |doc| doc.id == id.to_string())
            .await;

        let res = app.delete_with_token(&routes::event(id), &token).await;
        assert_eq!(res.status, 204);

        let get = app.get_without_token(&routes::event(id)).await;
        assert_eq!(get.status, 404);
        assert_eq!(get.body["code"], "NOT_FOUND");

        let mine = app.get_with_token(routes::MY_RSVPS, &member).await;
        assert!(mine.body["rsvps"].as_array().unwrap().is_empty());

        let rsvps = rsvp::Entity::find()
            .filter(rsvp::Column::EventId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        let feedback_rows = feedback::Entity::find()
            .filter(feedback::Column::EventId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(rsvps, 0);
        assert_eq!(feedback_rows, 0);

        app.wait_for_document(collections::ACTIVITY_LOGS, |doc| {
            doc.data["action"] == "EVENT_DELETED"
        })
        .await;
        let key = id.to_string();
        assert!(app.documents.get(collections::EVENT_STATS, &key).await.unwrap().is_none());
        assert!(app.documents.get(collections::EVENTS_MIRROR, &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;

        let res = app
            .patch_with_token(&routes::event(999), &json!({"title": "x"}), &token)
            .await;
        assert_eq!(res.status, 404);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn events_are_ordered_by_start_time_with_going_counts() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;
        let member = app.create_member("Mia", "mia@example.com").await;
        let later = app.create_event(&token, "Later", 72).await;
        let sooner = app.create_event(&token, "Sooner", 24).await;
        app.rsvp(later, true, &member).await;
        app.rsvp(later, true, &token).await;

        let res = app.get_without_token(routes::EVENTS).await;

        let events = res.body["events"].as_array().unwrap();
        assert_eq!(events[0]["id"], sooner);
        assert_eq!(events[1]["id"], later);
        assert_eq!(events[1]["going_count"], 2);
        assert_eq!(events[0]["going_count"], 0);
    }

    #[tokio::test]
    async fn detail_reports_the_callers_rsvp() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;
        let member = app.create_member("Mia", "mia@example.com").await;
        let id = app.create_event(&token, "Quiz night", 48).await;
        app.rsvp(id, true, &member).await;

        let mine = app.get_with_token(&routes::event(id), &member).await;
        let theirs = app.get_with_token(&routes::event(id), &token).await;

        assert_eq!(mine.body["my_rsvp"], "going");
        assert!(theirs.body["my_rsvp"].is_null());
        assert_eq!(theirs.body["going_count"], 1);
    }
}

mod images {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3, 4];

    #[tokio::test]
    async fn uploaded_image_is_served_with_its_content_type() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;
        let id = app.create_event(&token, "Gallery", 24).await;

        let upload = app.upload_image(id, "poster.PNG", PNG.to_vec(), &token).await;
        assert_eq!(upload.status, 200, "{}", upload.text);
        assert_eq!(upload.body["image_url"], routes::event_image(id));

        let res = app
            .client
            .get(app.url(&routes::event_image(id)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.headers()["content-type"], "image/png");
        assert_eq!(res.bytes().await.unwrap().as_ref(), PNG);
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;
        let id = app.create_event(&token, "Gallery", 24).await;

        let res = app.upload_image(id, "poster.gif", PNG.to_vec(), &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn oversized_image_is_rejected() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;
        let id = app.create_event(&token, "Gallery", 24).await;

        let big = vec![7u8; MAX_IMAGE_SIZE as usize + 1];
        let res = app.upload_image(id, "poster.jpg", big, &token).await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn event_without_image_returns_not_found() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;
        let id = app.create_event(&token, "Gallery", 24).await;

        let res = app.get_without_token(&routes::event_image(id)).await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn member_cannot_upload_images() {
        let app = TestApp::spawn().await;
        let token = committee(&app).await;
        let member = app.create_member("Mia", "mia@example.com").await;
        let id = app.create_event(&token, "Gallery", 24).await;

        let res = app.upload_image(id, "poster.png", PNG.to_vec(), &member).await;

        assert_eq!(res.status, 403);
    }
}
