use axum::{
    extract::{Multipart, Path, State},
    response::{Json, Redirect},
    Form,
};
use model::{entities::product, rating::valid_stars};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use store::{products::ProductDetails, reviews::NewReview};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::schemas::{image_map, AppState, ImageMap, ImageResponse, ProductResponse, UserResponse};
use crate::session::{CurrentUser, Principal};
use crate::uploads::{self, read_images, MultipartForm};

pub const PRODUCT_NOT_FOUND: &str = "Product not found";
pub const SELLER_ONLY: &str = "Only the seller can change this listing.";

/// Create/edit form view-model
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductFormPage {
    /// Absent on the create form
    pub product: Option<ProductResponse>,
    pub images: Vec<ImageRef>,
}

/// An existing image as offered for removal on the edit form
#[derive(Debug, Serialize, ToSchema)]
pub struct ImageRef {
    pub id: i32,
    pub src: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPage {
    pub product: ProductResponse,
    pub images: Vec<ImageResponse>,
    pub owner: Option<UserResponse>,
    pub is_favourite: bool,
    pub session_user_id: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ReviewForm {
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub review: String,
    /// Stars from 1 to 5
    #[serde(default)]
    pub rating: i32,
}

/// Multipart body of the create and edit forms
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct ListingUpload {
    pub name: String,
    pub description: String,
    /// Decimal; empty means free
    pub price: Option<String>,
    pub category: String,
    /// Repeated for a multi-select, stored as "Sell, Trade"
    pub transaction_type: Vec<String>,
    pub condition: String,
    /// Edit only: ids of images to drop, repeated
    #[serde(rename = "removeImages")]
    pub remove_images: Vec<i32>,
    /// Up to four files
    #[schema(value_type = Vec<String>)]
    pub images: Vec<Vec<u8>>,
}

/// Listing fields as typed into the create/edit form.
#[derive(Debug, Validate)]
struct ProductInput {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(length(max = 5000))]
    description: String,
    price: Decimal,
    #[validate(length(max = 100))]
    category: String,
    #[validate(length(max = 100))]
    transaction_type: String,
    #[validate(length(max = 50))]
    condition: String,
}

impl ReviewForm {
    fn check(&self) -> Result<(), AppError> {
        if !valid_stars(self.rating) {
            return Err(AppError::bad_request("Rating must be between 1 and 5 stars."));
        }
        self.validate()
            .map_err(|_| AppError::bad_request("Review is too long."))
    }
}

impl ProductInput {
    fn from_form(form: &MultipartForm) -> Result<Self, AppError> {
        let text = |name: &str| form.text(name).unwrap_or_default().trim().to_string();
        let input = ProductInput {
            name: text("name"),
            description: text("description"),
            price: parse_price(form.text("price"))?,
            category: text("category"),
            transaction_type: join_transaction_types(form.all("transaction_type")),
            condition: text("condition"),
        };
        input
            .validate()
            .map_err(|e| AppError::bad_request(format!("Invalid product details: {}", e)))?;
        Ok(input)
    }

    fn into_details(self) -> ProductDetails {
        ProductDetails {
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            transaction_type: self.transaction_type,
            condition: self.condition,
        }
    }
}

/// Empty or missing price means free.
fn parse_price(raw: Option<&str>) -> Result<Decimal, AppError> {
    let raw = raw.unwrap_or_default().trim();
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    match Decimal::from_str(raw) {
        Ok(price) if price >= Decimal::ZERO => Ok(price.round_dp(2)),
        _ => Err(AppError::bad_request("Price must be a non-negative number.")),
    }
}

/// Multi-select values are stored comma-joined, e.g. "Sell, Trade".
fn join_transaction_types(values: &[String]) -> String {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_image_ids(values: &[String]) -> Result<Vec<i32>, AppError> {
    values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            v.trim()
                .parse::<i32>()
                .map_err(|_| AppError::bad_request(format!("Invalid image id: {}", v)))
        })
        .collect()
}

/// Reads the listing fields and the `images` files, discarding every
/// transient file if the fields are rejected.
async fn listing_submission(
    state: &AppState,
    multipart: Multipart,
) -> Result<(MultipartForm, ProductDetails, Vec<store::images::NewImage>), AppError> {
    let mut form = uploads::receive(multipart, &state.settings.uploads).await?;
    let input = match ProductInput::from_form(&form) {
        Ok(input) => input,
        Err(e) => {
            form.cleanup().await;
            return Err(e);
        }
    };
    let files = form.take_files("images");
    match read_images(files).await {
        Ok(images) => Ok((form, input.into_details(), images)),
        Err(e) => {
            form.cleanup().await;
            Err(e)
        }
    }
}

/// Images of every listed product, keyed by product id.
pub(crate) async fn images_for(state: &AppState, products: &[product::Model]) -> Result<ImageMap, AppError> {
    let ids: Vec<i32> = products.iter().map(|p| p.id).collect();
    let grouped = store::images::for_products(state.store.conn(), &ids).await?;
    Ok(image_map(grouped))
}

pub(crate) async fn existing_product(state: &AppState, id: i32) -> Result<product::Model, AppError> {
    store::products::find_by_id(state.store.conn(), id)
        .await?
        .ok_or_else(|| {
            warn!(product_id = id, "Product not found");
            AppError::not_found(PRODUCT_NOT_FOUND)
        })
}

async fn owned_product(state: &AppState, id: i32, principal: &Principal) -> Result<product::Model, AppError> {
    let product = existing_product(state, id).await?;
    if product.user_id != principal.id {
        warn!(product_id = id, user_id = principal.id, "Listing change by non-owner denied");
        return Err(AppError::forbidden(SELLER_ONLY));
    }
    Ok(product)
}

/// Empty listing form
#[utoipa::path(
    get,
    path = "/product/new",
    tag = "products",
    responses((status = 200, description = "Create form", body = ProductFormPage))
)]
pub async fn new_product_page(CurrentUser(_principal): CurrentUser) -> Json<ProductFormPage> {
    Json(ProductFormPage {
        product: None,
        images: Vec::new(),
    })
}

/// Create a listing with up to the configured number of images
#[utoipa::path(
    post,
    path = "/product/new",
    tag = "products",
    request_body(content = ListingUpload, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Created, redirect to the product page"),
        (status = 400, description = "Invalid fields or uploads", body = crate::schemas::ActionResponse)
    )
)]
#[instrument(skip(state, principal, multipart))]
pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    trace!("Creating product");
    let owner = store::users::find_by_email(state.store.conn(), &principal.email)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    let (form, details, images) = listing_submission(&state, multipart).await?;
    form.cleanup().await;
    debug!(name = %details.name, images = images.len(), "Listing submitted");

    let created = store::products::create_with_images(state.store.conn(), owner.id, details, images).await?;
    info!(product_id = created.id, "Listing created");
    Ok(Redirect::to(&format!("/product/{}", created.id)))
}

/// Product page
#[utoipa::path(
    get,
    path = "/product/{id}",
    tag = "products",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product details", body = ProductPage),
        (status = 404, description = "Product not found")
    )
)]
#[instrument(skip(state, principal))]
pub async fn show_product(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ProductPage>, AppError> {
    let db = state.store.conn();
    let product = existing_product(&state, id).await?;
    let images = store::images::for_product(db, id).await?;
    let owner = store::users::find_by_id(db, product.user_id).await?;
    let is_favourite = store::favourites::find(db, principal.id, id).await?.is_some();

    Ok(Json(ProductPage {
        product: product.into(),
        images: images.into_iter().map(ImageResponse::from).collect(),
        owner: owner.map(UserResponse::from),
        is_favourite,
        session_user_id: principal.id,
    }))
}

/// Review the seller of a product
///
/// The seller's rating becomes the floor of the mean of every star count they received.
#[utoipa::path(
    post,
    path = "/product/{id}",
    tag = "products",
    params(("id" = i32, Path, description = "Product ID")),
    request_body(content = ReviewForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Review stored, redirect to /"),
        (status = 400, description = "Rating outside 1-5", body = crate::schemas::ActionResponse),
        (status = 404, description = "Product not found")
    )
)]
#[instrument(skip(state, principal, form))]
pub async fn submit_review(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect, AppError> {
    form.check()?;
    let product = existing_product(&state, id).await?;
    if product.user_id == principal.id {
        return Err(AppError::bad_request("You cannot review your own listing."));
    }

    let rating = store::reviews::submit(
        state.store.conn(),
        NewReview {
            user_id: product.user_id,
            reviewer_id: principal.id,
            content: form.review.trim().to_string(),
            stars_given: form.rating,
        },
    )
    .await?;
    info!(seller_id = product.user_id, rating, "Review submitted");
    Ok(Redirect::to("/"))
}

/// Edit form with the listing's current images
#[utoipa::path(
    get,
    path = "/product/edit/{id}",
    tag = "products",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Edit form", body = ProductFormPage),
        (status = 403, description = "Not the seller"),
        (status = 404, description = "Product not found")
    )
)]
#[instrument(skip(state, principal))]
pub async fn edit_product_page(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ProductFormPage>, AppError> {
    let product = owned_product(&state, id, &principal).await?;
    let images = store::images::for_product(state.store.conn(), id)
        .await?
        .into_iter()
        .map(|image| {
            let view = ImageResponse::from(image);
            ImageRef {
                id: view.id,
                src: view.src,
            }
        })
        .collect();

    Ok(Json(ProductFormPage {
        product: Some(product.into()),
        images,
    }))
}

/// Update a listing, dropping the images named in `removeImages` and appending new uploads
#[utoipa::path(
    post,
    path = "/product/edit/{id}",
    tag = "products",
    params(("id" = i32, Path, description = "Product ID")),
    request_body(content = ListingUpload, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Updated, redirect to the product page"),
        (status = 400, description = "Invalid fields or uploads", body = crate::schemas::ActionResponse),
        (status = 403, description = "Not the seller"),
        (status = 404, description = "Product not found")
    )
)]
#[instrument(skip(state, principal, multipart))]
pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    owned_product(&state, id, &principal).await?;

    let (form, details, images) = listing_submission(&state, multipart).await?;
    let removed = parse_image_ids(form.all("removeImages"));
    form.cleanup().await;
    let removed = removed?;
    debug!(removed = removed.len(), added = images.len(), "Listing edit submitted");

    store::products::update_with_images(state.store.conn(), id, details, &removed, images).await?;
    info!(product_id = id, "Listing updated");
    Ok(Redirect::to(&format!("/product/{}", id)))
}

/// Delete a listing and its images
#[utoipa::path(
    post,
    path = "/product/delete/{id}",
    tag = "products",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 303, description = "Deleted, redirect to /"),
        (status = 403, description = "Not the seller"),
        (status = 404, description = "Product not found")
    )
)]
#[instrument(skip(state, principal))]
pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    owned_product(&state, id, &principal).await?;
    store::products::delete(state.store.conn(), id).await?;
    info!(product_id = id, "Listing deleted");
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_defaults_to_zero() {
        assert_eq!(parse_price(None).unwrap(), Decimal::ZERO);
        assert_eq!(parse_price(Some("  ")).unwrap(), Decimal::ZERO);
        assert_eq!(parse_price(Some("12.345")).unwrap(), Decimal::from_str("12.34").unwrap());
        assert!(parse_price(Some("-1")).is_err());
        assert!(parse_price(Some("cheap")).is_err());
    }

    #[test]
    fn transaction_types_are_comma_joined() {
        let values = vec!["Sell".to_string(), " Trade ".to_string(), String::new()];
        assert_eq!(join_transaction_types(&values), "Sell, Trade");
        assert_eq!(join_transaction_types(&[]), "");
    }

    #[test]
    fn image_ids_must_be_numbers() {
        assert_eq!(parse_image_ids(&["3".into(), " 4 ".into(), "".into()]).unwrap(), vec![3, 4]);
        assert!(parse_image_ids(&["x".into()]).is_err());
    }

    #[test]
    fn review_rating_range() {
        let ok = ReviewForm { review: "Great".into(), rating: 5 };
        assert!(ok.check().is_ok());
        let low = ReviewForm { review: String::new(), rating: 0 };
        assert!(low.check().is_err());
        let high = ReviewForm { review: String::new(), rating: 6 };
        assert!(high.check().is_err());
        let long = ReviewForm { review: "a".repeat(2001), rating: 3 };
        assert!(long.check().is_err());
    }
}
