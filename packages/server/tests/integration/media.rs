use reqwest::Method;

use crate::common::{TestApp, routes, solid_png};

#[tokio::test]
async fn stored_image_is_served_as_jpeg() {
    let app = TestApp::spawn().await;
    let token = app.create_staff_user("admin", "adminpass").await;
    let created = app
        .send_product_form(
            Method::POST,
            routes::ADMIN_PRODUCTS,
            &[("title", "Rosca de Reyes")],
            Some(solid_png(120, 90)),
            &token,
        )
        .await;
    let path = created.body["image_path"].as_str().unwrap().to_string();

    let res = app
        .client
        .get(format!("http://{}{}", app.addr, routes::media(&path)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "image/jpeg");
    let bytes = res.bytes().await.unwrap();
    assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
}

#[tokio::test]
async fn missing_media_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(&routes::media("productos/nada_imagen.jpg")).await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn traversal_paths_are_rejected() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token("/media/productos/.secret").await;

    assert_eq!(res.status, 400);
}

mod allowed_hosts {
    use super::*;

    #[tokio::test]
    async fn unknown_host_is_rejected() {
        let app = TestApp::spawn_with(|config| {
            config.server.allowed_hosts = vec!["tienda.example.com".into()];
        })
        .await;

        let res = app.get_without_token(routes::PRODUCTS).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn listed_host_is_served() {
        let app = TestApp::spawn_with(|config| {
            config.server.allowed_hosts = vec!["127.0.0.1".into()];
        })
        .await;

        let res = app.get_without_token(routes::PRODUCTS).await;

        assert_eq!(res.status, 200);
    }
}
