use serde_json::json;

use crate::common::{BOOTSTRAP_ADMIN, PASSWORD, TestApp, TestResponse, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_with_valid_details() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": "  Ada@Example.com ",
                    "password": PASSWORD,
                }),
            )
            .await;

        assert_eq!(res.status, 201);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn cannot_register_with_an_already_taken_email() {
        let app = TestApp::spawn().await;
        app.register("Ada", "ada@example.com").await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "first_name": "Other",
                    "last_name": "Person",
                    "email": "ADA@example.com",
                    "password": PASSWORD,
                }),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn cannot_register_with_a_short_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": "ada@example.com",
                    "password": "short",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn cannot_register_with_an_invalid_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": "not-an-email",
                    "password": PASSWORD,
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_fields_return_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::REGISTER, &json!({"email": "ada@example.com"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn bootstrap_email_registers_as_admin() {
        let app = TestApp::spawn().await;
        app.register("Root", BOOTSTRAP_ADMIN).await;

        let token = app.login(BOOTSTRAP_ADMIN).await;
        let me = app.get_with_token(routes::ME, &token).await;

        assert_eq!(me.status, 200);
        assert_eq!(me.body["role"], "admin");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn registered_member_receives_token_and_member_permissions() {
        let app = TestApp::spawn().await;
        app.register("Ada", "ada@example.com").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "ada@example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["role"], "member");
        let permissions = res.body["permissions"].as_array().unwrap();
        assert!(permissions.contains(&json!("rsvp:own")));
        assert!(!permissions.contains(&json!("event:create")));
        let cookie = res.header("set-cookie").unwrap();
        assert!(cookie.starts_with("rollcall_session="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let app = TestApp::spawn().await;
        app.register("Ada", "ada@example.com").await;

        let wrong = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "ada@example.com", "password": "wrong-password"}),
            )
            .await;
        let unknown = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "nobody@example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(wrong.status, 401);
        assert_eq!(wrong.body["code"], "INVALID_CREDENTIALS");
        assert_eq!(unknown.status, 401);
        assert_eq!(unknown.body["message"], wrong.body["message"]);
    }

    #[tokio::test]
    async fn login_is_recorded_in_the_activity_log() {
        let app = TestApp::spawn().await;
        app.create_member("Ada", "ada@example.com").await;

        let entry = app
            .wait_for_document(common::document::collections::ACTIVITY_LOGS, |doc| {
                doc.data["action"] == "LOGIN"
            })
            .await;

        assert_eq!(entry.data["user"], "ada@example.com");
    }

    #[tokio::test]
    async fn logout_clears_the_session_cookie() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(app.url(routes::LOGOUT))
            .header("Cookie", "rollcall_session=stale")
            .send()
            .await
            .unwrap();
        let res = TestResponse::from_response(res).await;

        assert_eq!(res.status, 204);
        let cookie = res.header("set-cookie").unwrap();
        assert!(cookie.starts_with("rollcall_session="));
        assert!(cookie.contains("Max-Age=0"));
    }
}

mod authenticated_access {
    use super::*;

    #[tokio::test]
    async fn user_can_read_their_profile() {
        let app = TestApp::spawn().await;
        let token = app.create_member("Ada", "ada@example.com").await;

        let res = app.get_with_token(routes::ME, &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["first_name"], "Ada");
        assert_eq!(res.body["email"], "ada@example.com");
        assert!(res.body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn request_without_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn request_with_garbage_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not.a.jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .get(app.url(routes::ME))
            .header("Authorization", "Basic YWRhOnB3")
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn token_of_a_deleted_user_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_member("Root", BOOTSTRAP_ADMIN).await;
        let victim_id = app.register("Ada", "ada@example.com").await;
        let victim = app.login("ada@example.com").await;

        let del = app.delete_with_token(&routes::user(victim_id), &admin).await;
        assert_eq!(del.status, 204, "delete failed: {}", del.text);

        let res = app.get_with_token(routes::ME, &victim).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}
