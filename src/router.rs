use crate::config::CorsSettings;
use crate::handlers::{
    auth::{login, login_page, logout, register, register_page},
    author::{
        author_home, create_article, delete_article, edit_article_page, new_article_page,
        publish_article, settings_page, update_article, update_settings,
    },
    categories::category,
    favourites::{add_favourite, remove_favourite},
    health::health_check,
    home::home,
    offers::{complete_offer, make_offer, offer_in_progress},
    products::{
        create_product, delete_product, edit_product_page, new_product_page, show_product,
        submit_review, update_product,
    },
    profile::{own_profile, update_course, update_description, update_image, update_name, user_profile},
    reader::{add_comment, delete_comment, like_article, read_article, reader_home},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Credentialed CORS for the configured origins. No origins, no CORS headers.
fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.settings.body_limit();
    let cors = cors_layer(&state.settings.cors);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Accounts and sessions
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        // Listings
        .route("/", get(home))
        .route("/category/:category", get(category))
        .route("/product/new", get(new_product_page).post(create_product))
        .route("/product/make-offer", post(make_offer))
        .route("/product/offer-in-progress", post(offer_in_progress))
        .route("/product/complete-offer", post(complete_offer))
        .route("/product/favourites/add", post(add_favourite))
        .route("/product/favourites/remove", post(remove_favourite))
        .route("/product/edit/:id", get(edit_product_page).post(update_product))
        .route("/product/delete/:id", post(delete_product))
        .route("/product/:id", get(show_product).post(submit_review))
        // Profiles
        .route("/profile", get(own_profile))
        .route("/profile/update-name", post(update_name))
        .route("/profile/update-course", post(update_course))
        .route("/profile/update-description", post(update_description))
        .route("/profile/update-image", post(update_image))
        .route("/profile/:id", get(user_profile))
        // Blog author area
        .route("/author", get(author_home))
        .route("/author/settings", get(settings_page).post(update_settings))
        .route("/author/edit", get(new_article_page).post(create_article))
        .route("/author/edit/:id", get(edit_article_page).post(update_article))
        .route("/author/delete-article/:id", delete(delete_article))
        .route("/author/publish-article/:id", post(publish_article))
        // Blog reader area
        .route("/reader", get(reader_home))
        .route("/reader/article/:id", get(read_article))
        .route("/reader/article/:id/like", post(like_article))
        .route("/reader/article/:id/comment", post(add_comment))
        .route(
            "/reader/article/:id/comment/:comment_id/delete",
            post(delete_comment),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(cors),
        )
        .with_state(state)
}
