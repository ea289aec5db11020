use axum::{extract::State, response::Json};
use model::entities::product::OfferStatus;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::handlers::products::existing_product;
use crate::schemas::{ActionResponse, AppState, ProductActionRequest};
use crate::session::CurrentUser;

pub const PRODUCT_ID_REQUIRED: &str = "Product ID is required.";

pub(crate) fn required_product_id(request: &ProductActionRequest) -> Result<i32, AppError> {
    request
        .product_id
        .ok_or_else(|| AppError::bad_request(PRODUCT_ID_REQUIRED))
}

/// Make an offer on a listing nobody has made an offer on yet
#[utoipa::path(
    post,
    path = "/product/make-offer",
    tag = "products",
    request_body = ProductActionRequest,
    responses(
        (status = 200, description = "Offer recorded", body = ActionResponse),
        (status = 400, description = "Missing product id or own listing", body = ActionResponse),
        (status = 404, description = "Product not found"),
        (status = 409, description = "An offer was already made", body = ActionResponse)
    )
)]
#[instrument(skip(state, principal))]
pub async fn make_offer(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<ProductActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let product_id = required_product_id(&request)?;
    let product = existing_product(&state, product_id).await?;
    if product.user_id == principal.id {
        warn!(product_id, "Seller tried to make an offer on own listing");
        return Err(AppError::bad_request("You cannot make an offer on your own listing."));
    }

    store::products::make_offer(state.store.conn(), product_id, principal.id).await?;
    info!(product_id, buyer_id = principal.id, "Offer made");
    Ok(Json(ActionResponse::ok()))
}

/// Seller accepts the offer and starts the exchange
#[utoipa::path(
    post,
    path = "/product/offer-in-progress",
    tag = "products",
    request_body = ProductActionRequest,
    responses(
        (status = 200, description = "Offer in progress", body = ActionResponse),
        (status = 403, description = "Not the seller"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Offer is not in the made state", body = ActionResponse)
    )
)]
#[instrument(skip(state, principal))]
pub async fn offer_in_progress(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<ProductActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let product_id = required_product_id(&request)?;
    let product = existing_product(&state, product_id).await?;
    if product.user_id != principal.id {
        return Err(AppError::forbidden("Only the seller can accept an offer."));
    }

    store::products::advance_offer(state.store.conn(), product_id, OfferStatus::InProgress).await?;
    info!(product_id, "Offer in progress");
    Ok(Json(ActionResponse::ok()))
}

/// Complete the exchange; the listing becomes unavailable
#[utoipa::path(
    post,
    path = "/product/complete-offer",
    tag = "products",
    request_body = ProductActionRequest,
    responses(
        (status = 200, description = "Offer completed", body = ActionResponse),
        (status = 403, description = "Neither seller nor buyer"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Offer is not in progress", body = ActionResponse)
    )
)]
#[instrument(skip(state, principal))]
pub async fn complete_offer(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<ProductActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let product_id = required_product_id(&request)?;
    let product = existing_product(&state, product_id).await?;
    let party = product.user_id == principal.id || product.offer_made_by == Some(principal.id);
    if !party {
        return Err(AppError::forbidden("Only the seller or the buyer can complete an offer."));
    }

    store::products::advance_offer(state.store.conn(), product_id, OfferStatus::Completed).await?;
    info!(product_id, "Offer completed");
    Ok(Json(ActionResponse::ok()))
}
