use chrono::Utc;
use reqwest::Method;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait, Set, Statement,
};
use serde_json::json;

use catalog_server::entity::{product_comment, product_vote};

use crate::common::{Caller, TestApp, routes, solid_png};

const MAX_STORED_BYTES: u64 = 3 * 1024 * 1024;

mod access {
    use super::*;

    #[tokio::test]
    async fn regular_users_cannot_manage_products() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .send_product_form(Method::POST, routes::ADMIN_PRODUCTS, &[("title", "X")], None, &token)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");

        let res = app.get_with_token(routes::ADMIN_PRODUCTS, &token).await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn anonymous_requests_need_a_token() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ADMIN_PRODUCTS).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn staff_listing_includes_inactive_products() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        app.create_product(&token, &[("title", "Visible")], None).await;
        app.create_product(&token, &[("title", "Oculto"), ("active", "off")], None)
            .await;

        let res = app.get_with_token(routes::ADMIN_PRODUCTS, &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"], 2);
    }
}

mod create {
    use super::*;

    #[tokio::test]
    async fn large_upload_is_normalized_under_the_ceiling() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;

        let res = app
            .send_product_form(
                Method::POST,
                routes::ADMIN_PRODUCTS,
                &[("title", "Figura Gundam Azul"), ("price", "10.00")],
                Some(solid_png(5000, 5000)),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["price"], "10.00");
        let path = res.body["image_path"].as_str().unwrap();
        assert_eq!(path, "productos/figura-gundam-azul_imagen.jpg");
        assert_eq!(
            res.body["image_url"],
            "/media/productos/figura-gundam-azul_imagen.jpg"
        );

        let size = app.blob_size(path).await.expect("image should be stored");
        assert!(size <= MAX_STORED_BYTES, "stored {size} bytes");
    }

    #[tokio::test]
    async fn same_title_gets_a_distinct_image_path() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        let fields = [("title", "Pan de muerto")];

        let first = app
            .send_product_form(Method::POST, routes::ADMIN_PRODUCTS, &fields, Some(solid_png(40, 40)), &token)
            .await;
        let second = app
            .send_product_form(Method::POST, routes::ADMIN_PRODUCTS, &fields, Some(solid_png(40, 40)), &token)
            .await;

        let first = first.body["image_path"].as_str().unwrap().to_string();
        let second = second.body["image_path"].as_str().unwrap().to_string();
        assert_eq!(first, "productos/pan-de-muerto_imagen.jpg");
        assert_ne!(first, second);
        assert!(second.starts_with("productos/pan-de-muerto-"), "{second}");
        assert!(second.ends_with("_imagen.jpg"), "{second}");
        assert_eq!(second.len(), "productos/pan-de-muerto-xxxxxx_imagen.jpg".len());
        assert!(app.blob_exists(&first).await);
        assert!(app.blob_exists(&second).await);
    }

    #[tokio::test]
    async fn form_limit_follows_the_configured_upload_limit() {
        let app = TestApp::spawn_with(|config| {
            config.catalog.image.max_upload_bytes = 16 * 1024 * 1024;
        })
        .await;
        let token = app.create_staff_user("admin", "adminpass").await;

        // A valid PNG followed by padding, larger than the default 10 MiB limit.
        let mut upload = solid_png(64, 64);
        upload.resize(upload.len() + 13 * 1024 * 1024, 0);

        let res = app
            .send_product_form(
                Method::POST,
                routes::ADMIN_PRODUCTS,
                &[("title", "Pastel grande")],
                Some(upload),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["image_path"], "productos/pastel-grande_imagen.jpg");
    }

    #[tokio::test]
    async fn non_image_upload_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;

        let res = app
            .send_product_form(
                Method::POST,
                routes::ADMIN_PRODUCTS,
                &[("title", "Roto")],
                Some(b"definitely not an image".to_vec()),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let listed = app.get_with_token(routes::ADMIN_PRODUCTS, &token).await;
        assert_eq!(listed.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;

        for fields in [
            vec![("price", "5")],
            vec![("title", "   ")],
            vec![("title", "Caro"), ("price", "-1")],
            vec![("title", "Caro"), ("price", "1.999")],
            vec![("title", "Caro"), ("display_order", "primero")],
        ] {
            let res = app
                .send_product_form(Method::POST, routes::ADMIN_PRODUCTS, &fields, None, &token)
                .await;
            assert_eq!(res.status, 400, "{fields:?}: {}", res.text);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn fields_not_sent_are_kept() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        let id = app
            .create_product(&token, &[("title", "Bolillo"), ("price", "3.50")], None)
            .await;

        let res = app
            .send_product_form(
                Method::PATCH,
                &routes::admin_product(id),
                &[("description", "Recién horneado")],
                None,
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Bolillo");
        assert_eq!(res.body["price"], "3.50");
        assert_eq!(res.body["description"], "Recién horneado");
    }

    #[tokio::test]
    async fn empty_price_clears_it() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        let id = app
            .create_product(&token, &[("title", "Bolillo"), ("price", "3.50")], None)
            .await;

        let res = app
            .send_product_form(Method::PATCH, &routes::admin_product(id), &[("price", "")], None, &token)
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["price"].is_null());
    }

    #[tokio::test]
    async fn replacing_the_image_deletes_the_previous_blob() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        let created = app
            .send_product_form(
                Method::POST,
                routes::ADMIN_PRODUCTS,
                &[("title", "Oreja")],
                Some(solid_png(64, 64)),
                &token,
            )
            .await;
        let id = created.id();
        let old_path = created.body["image_path"].as_str().unwrap().to_string();

        let res = app
            .send_product_form(
                Method::PATCH,
                &routes::admin_product(id),
                &[],
                Some(solid_png(80, 80)),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let new_path = res.body["image_path"].as_str().unwrap().to_string();
        assert_ne!(new_path, old_path);
        assert!(app.blob_exists(&new_path).await);
        assert!(!app.blob_exists(&old_path).await);
    }

    #[tokio::test]
    async fn remove_image_clears_reference_and_blob() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        let created = app
            .send_product_form(
                Method::POST,
                routes::ADMIN_PRODUCTS,
                &[("title", "Oreja")],
                Some(solid_png(64, 64)),
                &token,
            )
            .await;
        let path = created.body["image_path"].as_str().unwrap().to_string();

        let res = app
            .send_product_form(
                Method::PATCH,
                &routes::admin_product(created.id()),
                &[("remove_image", "true")],
                None,
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["image_path"].is_null());
        assert!(!app.blob_exists(&path).await);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;

        let res = app
            .send_product_form(Method::PATCH, &routes::admin_product(42), &[("title", "X")], None, &token)
            .await;

        assert_eq!(res.status, 404);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deleting_a_product_removes_its_image() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        let created = app
            .send_product_form(
                Method::POST,
                routes::ADMIN_PRODUCTS,
                &[("title", "Cuernito")],
                Some(solid_png(64, 64)),
                &token,
            )
            .await;
        let path = created.body["image_path"].as_str().unwrap().to_string();
        assert!(app.blob_exists(&path).await);

        let res = app.delete_with_token(&routes::admin_product(created.id()), &token).await;

        assert_eq!(res.status, 204);
        assert!(!app.blob_exists(&path).await);
        let res = app.get_without_token(&routes::product(created.id())).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn deleting_a_product_without_image_succeeds() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        let id = app.create_product(&token, &[("title", "Sin foto")], None).await;

        let res = app.delete_with_token(&routes::admin_product(id), &token).await;

        assert_eq!(res.status, 204);
    }

    #[tokio::test]
    async fn deleting_a_product_removes_its_votes_and_comments() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        let id = app.create_product(&token, &[("title", "Dona")], None).await;

        let caller = Caller::Forwarded("203.0.113.7");
        let vote = app.post_json(&routes::votes(id), &json!({"kind": "like"}), caller).await;
        assert_eq!(vote.status, 200);
        product_comment::ActiveModel {
            product_id: Set(id),
            client_id: Set("ip:203.0.113.7".into()),
            text: Set("rica".into()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .unwrap();

        let res = app.delete_with_token(&routes::admin_product(id), &token).await;
        assert_eq!(res.status, 204);

        assert_eq!(product_vote::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(product_comment::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_feedback_cleanup_still_deletes_the_product() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        let id = app.create_product(&token, &[("title", "Concha")], None).await;
        let caller = Caller::Forwarded("203.0.113.7");
        let vote = app.post_json(&routes::votes(id), &json!({"kind": "like"}), caller).await;
        assert_eq!(vote.status, 200);

        app.db
            .execute_raw(Statement::from_string(
                DbBackend::Sqlite,
                "DROP TABLE product_comment".to_string(),
            ))
            .await
            .unwrap();

        let res = app.delete_with_token(&routes::admin_product(id), &token).await;

        assert_eq!(res.status, 204);
        assert_eq!(app.get_without_token(&routes::product(id)).await.status, 404);
        // Votes and comments are removed together, so the vote survives.
        assert_eq!(product_vote::Entity::find().count(&app.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_staff_user("admin", "adminpass").await;
        let id = app.create_product(&token, &[("title", "Dona")], None).await;

        assert_eq!(app.delete_with_token(&routes::admin_product(id), &token).await.status, 204);
        assert_eq!(app.delete_with_token(&routes::admin_product(id), &token).await.status, 404);
    }
}
