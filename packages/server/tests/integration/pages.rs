use common::Role;
use reqwest::Client;

use crate::common::{PASSWORD, TestApp, routes};

async fn sign_in(app: &TestApp, browser: &Client, email: &str) {
    let res = browser
        .post(app.url("/login"))
        .form(&[("email", email), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(res.headers()["location"], "/events");
}

async fn get(app: &TestApp, browser: &Client, path: &str) -> (u16, String) {
    let res = browser.get(app.url(path)).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}

#[tokio::test]
async fn anonymous_visitor_sees_events_and_is_sent_to_login_for_the_rest() {
    let app = TestApp::spawn().await;
    let committee = app
        .create_user_with_role("Cora", "cora@example.com", Role::Committee)
        .await;
    app.create_event(&committee, "Harvest supper", 24).await;
    let browser = app.browser();

    let (status, home) = get(&app, &browser, "/").await;
    assert_eq!(status, 200);
    assert!(home.contains("Harvest supper"));

    let (status, list) = get(&app, &browser, "/events").await;
    assert_eq!(status, 200);
    assert!(list.contains("Harvest supper"));

    let res = browser.get(app.url("/my-rsvps")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(res.headers()["location"], "/login");
}

#[tokio::test]
async fn registration_form_creates_an_account() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let res = browser
        .post(app.url("/register"))
        .form(&[
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("email", "ada@example.com"),
            ("password", PASSWORD),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(res.headers()["location"], "/login");

    sign_in(&app, &browser, "ada@example.com").await;
    let (status, page) = get(&app, &browser, "/my-rsvps").await;
    assert_eq!(status, 200);
    assert!(page.contains("Ada"));
}

#[tokio::test]
async fn invalid_registration_re_renders_the_form() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let res = browser
        .post(app.url("/register"))
        .form(&[
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("email", "ada@example.com"),
            ("password", "short"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let body = res.text().await.unwrap();
    assert!(body.contains("ada@example.com"));
}

#[tokio::test]
async fn wrong_password_shows_the_login_form_again() {
    let app = TestApp::spawn().await;
    app.register("Ada", "ada@example.com").await;
    let browser = app.browser();

    let res = browser
        .post(app.url("/login"))
        .form(&[("email", "ada@example.com"), ("password", "nope-nope")])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 401);
    assert!(res.text().await.unwrap().contains("Invalid email or password"));
}

#[tokio::test]
async fn member_rsvps_through_the_event_page() {
    let app = TestApp::spawn().await;
    let committee = app
        .create_user_with_role("Cora", "cora@example.com", Role::Committee)
        .await;
    let id = app.create_event(&committee, "Harvest supper", 24).await;
    app.register("Mia", "mia@example.com").await;
    let browser = app.browser();
    sign_in(&app, &browser, "mia@example.com").await;

    let res = browser
        .post(app.url(&format!("/events/{id}/rsvp")))
        .form(&[("action", "going")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(res.headers()["location"], format!("/events/{id}"));

    let (_, page) = get(&app, &browser, &format!("/events/{id}")).await;
    assert!(page.contains("You are going."));

    let (_, mine) = get(&app, &browser, "/my-rsvps").await;
    assert!(mine.contains("Harvest supper"));

    let api = app.get_without_token(&routes::event(id)).await;
    assert_eq!(api.body["going_count"], 1);

    let (status, _) = get(&app, &browser, &format!("/events/{id}/rsvps")).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn member_is_forbidden_from_admin_pages() {
    let app = TestApp::spawn().await;
    app.register("Mia", "mia@example.com").await;
    let browser = app.browser();
    sign_in(&app, &browser, "mia@example.com").await;

    for path in ["/admin/users", "/admin/logs", "/admin/events/new"] {
        let (status, _) = get(&app, &browser, path).await;
        assert_eq!(status, 403, "{path} should be forbidden");
    }
}

#[tokio::test]
async fn unknown_event_renders_a_not_found_page() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (status, page) = get(&app, &browser, "/events/9999").await;

    assert_eq!(status, 404);
    assert!(page.contains("Error 404"));
}

#[tokio::test]
async fn committee_creates_an_event_with_the_form() {
    let app = TestApp::spawn().await;
    app.register("Cora", "cora@example.com").await;
    app.set_role("cora@example.com", Role::Committee).await;
    let browser = app.browser();
    sign_in(&app, &browser, "cora@example.com").await;

    let form = reqwest::multipart::Form::new()
        .text("title", "Film night")
        .text("description", "Popcorn")
        .text("location", "Room 4")
        .text("start_time", "2031-05-01T19:00")
        .text("end_time", "2031-05-01T22:00")
        .part(
            "image",
            reqwest::multipart::Part::bytes(Vec::new()).file_name(""),
        );
    let res = browser
        .post(app.url("/admin/events/new"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 303, "{:?}", res.text().await);

    let list = app.get_without_token(routes::EVENTS).await;
    let event = &list.body["events"][0];
    assert_eq!(event["title"], "Film night");
    assert_eq!(event["start_time"], "2031-05-01T19:00:00Z");
    assert!(event["image_url"].is_null());
}

#[tokio::test]
async fn image_failure_after_create_shows_the_edit_form() {
    let app = TestApp::spawn().await;
    app.register("Cora", "cora@example.com").await;
    app.set_role("cora@example.com", Role::Committee).await;
    let browser = app.browser();
    sign_in(&app, &browser, "cora@example.com").await;
    app.break_image_storage();

    let form = reqwest::multipart::Form::new()
        .text("title", "Film night")
        .text("location", "Room 4")
        .text("start_time", "2031-05-01T19:00")
        .text("end_time", "2031-05-01T22:00")
        .part(
            "image",
            reqwest::multipart::Part::bytes(b"\x89PNG\r\n".to_vec()).file_name("poster.png"),
        );
    let res = browser
        .post(app.url("/admin/events/new"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 500);
    let page = res.text().await.unwrap();

    let list = app.get_without_token(routes::EVENTS).await;
    let events = list.body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0]["image_url"].is_null());
    assert!(page.contains("Edit event"));
    assert!(page.contains("Event created, but the image was not saved"));
}

#[tokio::test]
async fn event_form_with_bad_times_is_shown_again() {
    let app = TestApp::spawn().await;
    app.register("Cora", "cora@example.com").await;
    app.set_role("cora@example.com", Role::Committee).await;
    let browser = app.browser();
    sign_in(&app, &browser, "cora@example.com").await;

    let form = reqwest::multipart::Form::new()
        .text("title", "Film night")
        .text("start_time", "2031-05-01T22:00")
        .text("end_time", "2031-05-01T19:00");
    let res = browser
        .post(app.url("/admin/events/new"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    assert!(res.text().await.unwrap().contains("Film night"));
    let list = app.get_without_token(routes::EVENTS).await;
    assert!(list.body["events"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn logout_ends_the_browser_session() {
    let app = TestApp::spawn().await;
    app.register("Mia", "mia@example.com").await;
    let browser = app.browser();
    sign_in(&app, &browser, "mia@example.com").await;

    let res = browser.post(app.url("/logout")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 303);

    let after = browser.get(app.url("/my-rsvps")).send().await.unwrap();
    assert_eq!(after.status().as_u16(), 303);
}
