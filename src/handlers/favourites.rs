use axum::{extract::State, response::Json};
use store::StoreError;
use tracing::{debug, info, instrument};

use crate::error::AppError;
use crate::handlers::offers::required_product_id;
use crate::schemas::{ActionResponse, AppState, ProductActionRequest};
use crate::session::CurrentUser;

pub const ALREADY_FAVOURITE: &str = "Product is already in favourites.";

/// Add a product to the signed-in user's favourites
#[utoipa::path(
    post,
    path = "/product/favourites/add",
    tag = "products",
    request_body = ProductActionRequest,
    responses(
        (status = 200, description = "Favourite added", body = ActionResponse),
        (status = 400, description = "Missing product id or already a favourite", body = ActionResponse),
        (status = 404, description = "Product not found")
    )
)]
#[instrument(skip(state, principal))]
pub async fn add_favourite(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<ProductActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let product_id = required_product_id(&request)?;
    match store::favourites::add(state.store.conn(), principal.id, product_id).await {
        Ok(()) => {
            info!(product_id, user_id = principal.id, "Favourite added");
            Ok(Json(ActionResponse::ok()))
        }
        Err(StoreError::Duplicate(_)) => {
            debug!(product_id, "Already a favourite");
            Err(AppError::bad_request(ALREADY_FAVOURITE))
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a product from favourites; removing an absent favourite succeeds
#[utoipa::path(
    post,
    path = "/product/favourites/remove",
    tag = "products",
    request_body = ProductActionRequest,
    responses(
        (status = 200, description = "Favourite removed", body = ActionResponse),
        (status = 400, description = "Missing product id", body = ActionResponse)
    )
)]
#[instrument(skip(state, principal))]
pub async fn remove_favourite(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<ProductActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let product_id = required_product_id(&request)?;
    let removed = store::favourites::remove(state.store.conn(), principal.id, product_id).await?;
    debug!(product_id, removed, "Favourite removal");
    Ok(Json(ActionResponse::ok()))
}
