use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::handlers::products::images_for;
use crate::schemas::{AppState, ImageMap, ProductResponse};
use crate::session::CurrentUser;

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryPage {
    pub category: String,
    pub products: Vec<ProductResponse>,
    #[schema(value_type = Object)]
    pub images: ImageMap,
}

/// Open listings in one category, matched case-insensitively
#[utoipa::path(
    get,
    path = "/category/{category}",
    tag = "products",
    params(("category" = String, Path, description = "Category name")),
    responses((status = 200, description = "Listings in the category", body = CategoryPage))
)]
#[instrument(skip(state, _principal))]
pub async fn category(
    State(state): State<AppState>,
    CurrentUser(_principal): CurrentUser,
    Path(category): Path<String>,
) -> Result<Json<CategoryPage>, AppError> {
    let products = store::products::by_category(state.store.conn(), &category).await?;
    let images = images_for(&state, &products).await?;
    debug!(category = %category, "Category lists {} products", products.len());

    Ok(Json(CategoryPage {
        category,
        products: products.into_iter().map(ProductResponse::from).collect(),
        images,
    }))
}
