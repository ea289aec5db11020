use base64::engine::{general_purpose, Engine};
use chrono::NaiveDateTime;
use model::entities::{product, product_image, user};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use store::Store;
use utoipa::{OpenApi, ToSchema};

use crate::config::Settings;
use crate::handlers::{
    auth::{LoginForm, LoginPage, RegisterForm, RegisterPage},
    author::{ArticleEditPage, ArticleForm, ArticleView, AuthorHome, SettingsForm, SettingsPage},
    categories::CategoryPage,
    home::{HomePage, HomeQuery},
    products::{ImageRef, ListingUpload, ProductFormPage, ProductPage, ReviewForm},
    profile::{
        CourseForm, DescriptionForm, FavouriteSummary, ImageUpload, NameForm, ProfilePage, ReviewView,
    },
    reader::{CommentForm, CommentView, ReaderArticlePage, ReaderHome},
};
use crate::session::Principal;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Data access layer
    pub store: Store,
    /// Signed-in users by session token
    pub sessions: crate::session::SessionStore,
    pub settings: Arc<Settings>,
}

/// Result of an action endpoint (offers, favourites, article publishing)
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }
}

/// Body of the offer and favourite endpoints
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ProductActionRequest {
    #[serde(rename = "productId", alias = "product_id")]
    pub product_id: Option<i32>,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// A listing as shown on pages
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub category: String,
    pub transaction_type: String,
    pub condition: String,
    pub availability: bool,
    /// One of "not made", "made", "in progress", "completed"
    pub offer_status: String,
    pub offer_made_by: Option<i32>,
    pub created_at: NaiveDateTime,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            description: model.description,
            price: model.price,
            category: model.category,
            transaction_type: model.transaction_type,
            condition: model.condition,
            availability: model.availability,
            offer_status: model.offer_status.as_str().to_string(),
            offer_made_by: model.offer_made_by,
            created_at: model.created_at,
        }
    }
}

/// A stored image, base64-encoded for inline display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageResponse {
    pub id: i32,
    pub product_id: i32,
    pub image_type: String,
    /// Base64 of the raw bytes
    pub data: String,
    /// `data:` URI ready for an `img` tag
    pub src: String,
}

impl From<product_image::Model> for ImageResponse {
    fn from(model: product_image::Model) -> Self {
        let data = general_purpose::STANDARD.encode(&model.image);
        Self {
            id: model.id,
            product_id: model.product_id,
            src: format!("data:{};base64,{}", model.image_type, data),
            image_type: model.image_type,
            data,
        }
    }
}

/// Product id to its images. Every listed product has an entry.
pub type ImageMap = HashMap<i32, Vec<ImageResponse>>;

pub fn image_map(grouped: HashMap<i32, Vec<product_image::Model>>) -> ImageMap {
    grouped
        .into_iter()
        .map(|(id, images)| (id, images.into_iter().map(ImageResponse::from).collect()))
        .collect()
}

/// `data:` URI for raw bytes
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

/// Public view of a user. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub course: String,
    pub description: String,
    pub rating: i32,
    /// Profile picture as a `data:` URI
    pub image: Option<String>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        let image = match (&model.image, &model.image_type) {
            (Some(bytes), Some(mime)) => Some(data_uri(mime, bytes)),
            (Some(bytes), None) => Some(data_uri("application/octet-stream", bytes)),
            _ => None,
        };
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            course: model.course,
            description: model.description,
            rating: model.rating,
            image,
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register_page,
        crate::handlers::auth::register,
        crate::handlers::auth::login_page,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::home::home,
        crate::handlers::categories::category,
        crate::handlers::products::new_product_page,
        crate::handlers::products::create_product,
        crate::handlers::products::show_product,
        crate::handlers::products::submit_review,
        crate::handlers::products::edit_product_page,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::offers::make_offer,
        crate::handlers::offers::offer_in_progress,
        crate::handlers::offers::complete_offer,
        crate::handlers::favourites::add_favourite,
        crate::handlers::favourites::remove_favourite,
        crate::handlers::profile::own_profile,
        crate::handlers::profile::user_profile,
        crate::handlers::profile::update_name,
        crate::handlers::profile::update_course,
        crate::handlers::profile::update_description,
        crate::handlers::profile::update_image,
        crate::handlers::author::author_home,
        crate::handlers::author::settings_page,
        crate::handlers::author::update_settings,
        crate::handlers::author::new_article_page,
        crate::handlers::author::create_article,
        crate::handlers::author::edit_article_page,
        crate::handlers::author::update_article,
        crate::handlers::author::delete_article,
        crate::handlers::author::publish_article,
        crate::handlers::reader::reader_home,
        crate::handlers::reader::read_article,
        crate::handlers::reader::like_article,
        crate::handlers::reader::add_comment,
        crate::handlers::reader::delete_comment,
    ),
    components(
        schemas(
            ActionResponse,
            ProductActionRequest,
            ErrorResponse,
            HealthResponse,
            ProductResponse,
            ImageResponse,
            UserResponse,
            Principal,
            RegisterForm,
            RegisterPage,
            LoginForm,
            LoginPage,
            HomePage,
            HomeQuery,
            CategoryPage,
            ProductPage,
            ProductFormPage,
            ImageRef,
            ListingUpload,
            ImageUpload,
            ReviewForm,
            ProfilePage,
            NameForm,
            CourseForm,
            DescriptionForm,
            ReviewView,
            FavouriteSummary,
            AuthorHome,
            SettingsPage,
            SettingsForm,
            ArticleEditPage,
            ArticleForm,
            ArticleView,
            CommentView,
            CommentForm,
            ReaderHome,
            ReaderArticlePage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and logout"),
        (name = "products", description = "Listings, reviews, offers and favourites"),
        (name = "profile", description = "User profiles"),
        (name = "author", description = "Blog author area"),
        (name = "reader", description = "Blog reader area"),
    ),
    info(
        title = "CampusMart API",
        description = "Campus marketplace for listing, browsing and trading items between students",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
