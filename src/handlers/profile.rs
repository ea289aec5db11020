use axum::{
    extract::{Multipart, Path, State},
    response::{Json, Redirect},
    Form,
};
use chrono::NaiveDateTime;
use model::entities::{product, user};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::StoreError;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::handlers::products::images_for;
use crate::schemas::{AppState, ImageMap, ProductResponse, UserResponse};
use crate::session::{CurrentUser, Principal};
use crate::uploads;

pub const USER_NOT_FOUND: &str = "User not found";

/// Everything the profile page shows
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfilePage {
    pub user: UserResponse,
    pub session_user_id: i32,
    pub courses: Vec<String>,
    /// Open listings of the profile owner
    pub listings: Vec<ProductResponse>,
    #[schema(value_type = Object)]
    pub listing_images: ImageMap,
    pub reviews: Vec<ReviewView>,
    /// Listings the profile owner sold or made an offer on, past `not made`
    pub transactions: Vec<ProductResponse>,
    #[schema(value_type = Object)]
    pub transaction_images: ImageMap,
    pub favourites: Vec<FavouriteSummary>,
    #[schema(value_type = Object)]
    pub favourite_images: ImageMap,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewView {
    pub id: i32,
    pub reviewer_id: i32,
    /// Absent if the reviewer's account is gone
    pub reviewer_name: Option<String>,
    pub content: String,
    pub stars_given: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavouriteSummary {
    pub id: i32,
    pub name: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub category: String,
    pub availability: bool,
    pub offer_status: String,
}

impl From<product::Model> for FavouriteSummary {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            category: model.category,
            availability: model.availability,
            offer_status: model.offer_status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct NameForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CourseForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub course: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DescriptionForm {
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
}

/// Multipart body of the picture upload
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ImageUpload {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// The signed-in user's current row, looked up by session email.
///
/// A session whose account disappeared is treated as signed out.
pub(crate) async fn session_user(state: &AppState, principal: &Principal) -> Result<user::Model, AppError> {
    store::users::find_by_email(state.store.conn(), &principal.email)
        .await?
        .ok_or_else(|| {
            warn!(user_id = principal.id, "Session refers to a missing account");
            AppError::Unauthenticated
        })
}

async fn profile_page(state: &AppState, user: user::Model, session_user_id: i32) -> Result<ProfilePage, AppError> {
    let db = state.store.conn();
    let courses = store::courses::all(db).await?;

    let listings = store::products::listings_for_user(db, user.id).await?;
    let listing_images = images_for(state, &listings).await?;

    let reviews = store::reviews::for_user(db, user.id).await?;
    let reviewers = store::reviews::reviewers_for(db, &reviews).await?;
    let reviews = reviews
        .into_iter()
        .map(|r| ReviewView {
            reviewer_name: reviewers.get(&r.id).map(|u| u.name.clone()),
            id: r.id,
            reviewer_id: r.reviewer_id,
            content: r.content,
            stars_given: r.stars_given,
            created_at: r.created_at,
        })
        .collect();

    let transactions = store::products::transactions_for_user(db, user.id).await?;
    let transaction_images = images_for(state, &transactions).await?;

    let favourites = store::favourites::for_user(db, user.id).await?;
    let favourite_images = images_for(state, &favourites).await?;

    debug!(
        user_id = user.id,
        listings = listings.len(),
        transactions = transactions.len(),
        favourites = favourites.len(),
        "Profile assembled"
    );

    Ok(ProfilePage {
        user: user.into(),
        session_user_id,
        courses: courses.into_iter().map(|c| c.course_name).collect(),
        listings: listings.into_iter().map(ProductResponse::from).collect(),
        listing_images,
        reviews,
        transactions: transactions.into_iter().map(ProductResponse::from).collect(),
        transaction_images,
        favourites: favourites.into_iter().map(FavouriteSummary::from).collect(),
        favourite_images,
    })
}

/// The signed-in user's profile
#[utoipa::path(
    get,
    path = "/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Own profile", body = ProfilePage),
        (status = 303, description = "Not signed in, redirect to /login")
    )
)]
#[instrument(skip(state, principal))]
pub async fn own_profile(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<ProfilePage>, AppError> {
    let user = session_user(&state, &principal).await?;
    Ok(Json(profile_page(&state, user, principal.id).await?))
}

/// Another user's profile
#[utoipa::path(
    get,
    path = "/profile/{id}",
    tag = "profile",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = ProfilePage),
        (status = 404, description = "User not found")
    )
)]
#[instrument(skip(state, principal))]
pub async fn user_profile(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ProfilePage>, AppError> {
    let user = store::users::find_by_id(state.store.conn(), id)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;
    Ok(Json(profile_page(&state, user, principal.id).await?))
}

/// Change display name
#[utoipa::path(
    post,
    path = "/profile/update-name",
    tag = "profile",
    request_body(content = NameForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Updated, redirect to /profile"))
)]
#[instrument(skip(state, principal, form))]
pub async fn update_name(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Form(form): Form<NameForm>,
) -> Result<Redirect, AppError> {
    let form = NameForm {
        name: form.name.trim().to_string(),
    };
    form.validate()
        .map_err(|_| AppError::bad_request("Name must be 1 to 100 characters."))?;
    store::users::update_name(state.store.conn(), principal.id, &form.name).await?;
    info!(user_id = principal.id, "Name updated");
    Ok(Redirect::to("/profile"))
}

/// Change course
#[utoipa::path(
    post,
    path = "/profile/update-course",
    tag = "profile",
    request_body(content = CourseForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Updated, redirect to /profile"))
)]
#[instrument(skip(state, principal, form))]
pub async fn update_course(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Form(form): Form<CourseForm>,
) -> Result<Redirect, AppError> {
    form.validate()
        .map_err(|_| AppError::bad_request("Course is required."))?;
    store::users::update_course(state.store.conn(), principal.id, &form.course).await?;
    info!(user_id = principal.id, "Course updated");
    Ok(Redirect::to("/profile"))
}

/// Change profile description
#[utoipa::path(
    post,
    path = "/profile/update-description",
    tag = "profile",
    request_body(content = DescriptionForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Updated, redirect to /profile"))
)]
#[instrument(skip(state, principal, form))]
pub async fn update_description(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Form(form): Form<DescriptionForm>,
) -> Result<Redirect, AppError> {
    form.validate()
        .map_err(|_| AppError::bad_request("Description is too long."))?;
    store::users::update_description(state.store.conn(), principal.id, &form.description).await?;
    info!(user_id = principal.id, "Description updated");
    Ok(Redirect::to("/profile"))
}

/// Replace the profile picture with the uploaded `image` file
#[utoipa::path(
    post,
    path = "/profile/update-image",
    tag = "profile",
    request_body(content = ImageUpload, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Updated, redirect to /profile"),
        (status = 400, description = "No file uploaded", body = crate::schemas::ActionResponse),
        (status = 404, description = "User not found")
    )
)]
#[instrument(skip(state, principal, multipart))]
pub async fn update_image(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut form = uploads::receive(multipart, &state.settings.uploads).await?;
    let mut files = form.take_files("image").into_iter();
    let first = files.next();
    // One picture per profile
    uploads::discard_files(files.collect()).await;
    form.cleanup().await;

    let Some(file) = first else {
        return Err(AppError::bad_request("No file uploaded."));
    };
    let image = file.into_image().await?;

    match store::users::update_image(state.store.conn(), principal.id, image.bytes, &image.mime).await {
        Ok(()) => {
            info!(user_id = principal.id, "Profile picture updated");
            Ok(Redirect::to("/profile"))
        }
        Err(StoreError::NotFound(_)) => Err(AppError::not_found("User not found.")),
        Err(e) => Err(e.into()),
    }
}
