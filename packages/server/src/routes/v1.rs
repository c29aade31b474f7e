use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest(
            "/admin/products",
            admin_routes(config.catalog.image.max_upload_bytes),
        )
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn product_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::product::list_products))
        .routes(routes!(handlers::product::get_product))
        .routes(routes!(
            handlers::vote::get_votes,
            handlers::vote::cast_vote
        ))
        .routes(routes!(
            handlers::comment::list_comments,
            handlers::comment::create_comment
        ))
        .routes(routes!(handlers::comment::delete_comment))
}

fn admin_routes(max_upload_bytes: u64) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::admin::list_all_products,
            handlers::admin::create_product
        ))
        .routes(routes!(
            handlers::admin::update_product,
            handlers::admin::delete_product
        ))
        .layer(handlers::admin::product_form_body_limit(max_upload_bytes))
}
