use axum::{
    extract::{Query, State},
    response::Json,
};
use axum_valid::Valid;
use serde::{Deserialize, Serialize};
use store::products::ProductFilter;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;
use crate::handlers::products::images_for;
use crate::handlers::profile::session_user;
use crate::schemas::{AppState, ImageMap, ProductResponse, UserResponse};
use crate::session::CurrentUser;

/// Filters for the home listing. Blank values are ignored.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, IntoParams, Validate)]
pub struct HomeQuery {
    /// Substring of the product name
    #[validate(length(max = 100))]
    pub name: Option<String>,
    /// Exact transaction type, e.g. "Sell" or "Sell, Trade"
    #[validate(length(max = 50))]
    pub transaction_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HomePage {
    pub user: UserResponse,
    pub products: Vec<ProductResponse>,
    /// Product id to its images
    #[schema(value_type = Object)]
    pub images: ImageMap,
    pub name: Option<String>,
    pub transaction_type: Option<String>,
}

/// Listings still open to offers, oldest first
#[utoipa::path(
    get,
    path = "/",
    tag = "products",
    params(HomeQuery),
    responses(
        (status = 200, description = "Home listing", body = HomePage),
        (status = 303, description = "Not signed in, redirect to /login")
    )
)]
#[instrument(skip(state, principal))]
pub async fn home(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Valid(Query(query)): Valid<Query<HomeQuery>>,
) -> Result<Json<HomePage>, AppError> {
    let user = session_user(&state, &principal).await?;

    let filter = ProductFilter {
        name: query.name.clone(),
        transaction_type: query.transaction_type.clone(),
    };
    let products = store::products::browse(state.store.conn(), &filter).await?;
    let images = images_for(&state, &products).await?;
    debug!("Home lists {} products", products.len());

    Ok(Json(HomePage {
        user: user.into(),
        products: products.into_iter().map(ProductResponse::from).collect(),
        images,
        name: query.name,
        transaction_type: query.transaction_type,
    }))
}
