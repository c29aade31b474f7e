use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;

use catalog_server::entity::product_comment;

use crate::common::{Caller, TestApp, routes};

const CLIENT: &str = "203.0.113.7";

async fn app_with_product() -> (TestApp, i64) {
    let app = TestApp::spawn().await;
    let token = app.create_staff_user("admin", "adminpass").await;
    let id = app.create_product(&token, &[("title", "Concha")], None).await;
    (app, id)
}

mod posting {
    use super::*;

    #[tokio::test]
    async fn comment_is_created_trimmed() {
        let (app, id) = app_with_product().await;

        let res = app
            .post_json(&routes::comments(id), &json!({"text": "  Muy rica  "}), Caller::Forwarded(CLIENT))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["text"], "Muy rica");
        assert_eq!(res.body["can_delete"], true);
    }

    #[tokio::test]
    async fn empty_or_long_comments_are_rejected() {
        let (app, id) = app_with_product().await;

        for text in ["   ".to_string(), "a".repeat(201)] {
            let res = app
                .post_json(&routes::comments(id), &json!({"text": text}), Caller::Forwarded(CLIENT))
                .await;
            assert_eq!(res.status, 400);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn second_comment_on_the_same_day_is_rate_limited() {
        let (app, id) = app_with_product().await;
        let caller = Caller::Forwarded(CLIENT);

        let first = app.post_json(&routes::comments(id), &json!({"text": "uno"}), caller).await;
        assert_eq!(first.status, 201);

        let res = app.post_json(&routes::comments(id), &json!({"text": "dos"}), caller).await;

        assert_eq!(res.status, 429);
        assert_eq!(res.body["code"], "RATE_LIMITED");
        assert!(res.body["message"].as_str().unwrap().contains("tomorrow"));
        let retry_after: i64 = res.headers["retry-after"].to_str().unwrap().parse().unwrap();
        assert!((1..=86_400).contains(&retry_after));
    }

    #[tokio::test]
    async fn comment_from_yesterday_does_not_block_today() {
        let (app, id) = app_with_product().await;
        product_comment::ActiveModel {
            product_id: Set(id),
            client_id: Set(format!("ip:{CLIENT}")),
            text: Set("ayer".into()),
            created_at: Set(Utc::now() - Duration::days(1)),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .unwrap();

        let res = app
            .post_json(&routes::comments(id), &json!({"text": "hoy"}), Caller::Forwarded(CLIENT))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn limit_is_per_product_and_per_client() {
        let (app, id) = app_with_product().await;
        let token = app.create_staff_user("admin2", "adminpass").await;
        let other = app.create_product(&token, &[("title", "Bolillo")], None).await;

        let a = app
            .post_json(&routes::comments(id), &json!({"text": "uno"}), Caller::Forwarded(CLIENT))
            .await;
        let b = app
            .post_json(&routes::comments(other), &json!({"text": "dos"}), Caller::Forwarded(CLIENT))
            .await;
        let c = app
            .post_json(&routes::comments(id), &json!({"text": "tres"}), Caller::Forwarded("198.51.100.2"))
            .await;

        assert_eq!((a.status, b.status, c.status), (201, 201, 201));
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn newest_comments_come_first() {
        let (app, id) = app_with_product().await;
        for (client, text) in [("198.51.100.1", "primero"), ("198.51.100.2", "segundo")] {
            let res = app
                .post_json(&routes::comments(id), &json!({"text": text}), Caller::Forwarded(client))
                .await;
            assert_eq!(res.status, 201);
        }

        let res = app.get(&routes::comments(id), Caller::Forwarded("198.51.100.1")).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"], 2);
        assert_eq!(res.body["data"][0]["text"], "segundo");
        assert_eq!(res.body["data"][0]["can_delete"], false);
        assert_eq!(res.body["data"][1]["text"], "primero");
        assert_eq!(res.body["data"][1]["can_delete"], true);
    }
}

mod deleting {
    use super::*;

    #[tokio::test]
    async fn author_can_delete_their_comment() {
        let (app, id) = app_with_product().await;
        let created = app
            .post_json(&routes::comments(id), &json!({"text": "borrar"}), Caller::Forwarded(CLIENT))
            .await;

        let res = app
            .delete(&routes::comment(id, created.id()), Caller::Forwarded(CLIENT))
            .await;

        assert_eq!(res.status, 204);
    }

    #[tokio::test]
    async fn other_clients_cannot_delete() {
        let (app, id) = app_with_product().await;
        let created = app
            .post_json(&routes::comments(id), &json!({"text": "mío"}), Caller::Forwarded(CLIENT))
            .await;
        let user = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .delete(&routes::comment(id, created.id()), Caller::Forwarded("198.51.100.2"))
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");

        let res = app.delete(&routes::comment(id, created.id()), Caller::Token(&user)).await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn staff_can_delete_any_comment() {
        let (app, id) = app_with_product().await;
        let created = app
            .post_json(&routes::comments(id), &json!({"text": "spam"}), Caller::Forwarded(CLIENT))
            .await;
        let staff = app.create_staff_user("moderator", "modpass123").await;

        let res = app.delete(&routes::comment(id, created.id()), Caller::Token(&staff)).await;

        assert_eq!(res.status, 204);
    }

    #[tokio::test]
    async fn missing_comment_is_not_found() {
        let (app, id) = app_with_product().await;

        let res = app.delete(&routes::comment(id, 12345), Caller::Forwarded(CLIENT)).await;

        assert_eq!(res.status, 404);
    }
}
