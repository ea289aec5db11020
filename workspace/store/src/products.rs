use chrono::Utc;
use model::entities::product::{self, OfferStatus};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{Result, StoreError};
use crate::images::{self, NewImage};

/// Optional narrowing of the home listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Substring of the product name.
    pub name: Option<String>,
    /// Exact transaction type string.
    pub transaction_type: Option<String>,
}

/// Listing fields supplied by the seller on create and edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDetails {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub transaction_type: String,
    pub condition: String,
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<product::Model>> {
    Ok(product::Entity::find_by_id(id).one(db).await?)
}

/// Products still open to offers, oldest first, narrowed by `filter`.
#[instrument(skip(db))]
pub async fn browse<C: ConnectionTrait>(db: &C, filter: &ProductFilter) -> Result<Vec<product::Model>> {
    let mut query = product::Entity::find()
        .filter(product::Column::OfferStatus.eq(OfferStatus::NotMade));

    if let Some(name) = filter.name.as_deref().filter(|n| !n.is_empty()) {
        query = query.filter(product::Column::Name.contains(name));
    }
    if let Some(kind) = filter.transaction_type.as_deref().filter(|t| !t.is_empty()) {
        query = query.filter(product::Column::TransactionType.eq(kind));
    }

    let products = query
        .order_by_asc(product::Column::CreatedAt)
        .order_by_asc(product::Column::Id)
        .all(db)
        .await?;
    debug!("Browse returned {} products", products.len());
    Ok(products)
}

/// The user's own listings that nobody has made an offer on yet.
pub async fn listings_for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<product::Model>> {
    Ok(product::Entity::find()
        .filter(product::Column::UserId.eq(user_id))
        .filter(product::Column::OfferStatus.eq(OfferStatus::NotMade))
        .order_by_asc(product::Column::CreatedAt)
        .order_by_asc(product::Column::Id)
        .all(db)
        .await?)
}

/// Open listings whose category equals `category`, ignoring case.
#[instrument(skip(db))]
pub async fn by_category<C: ConnectionTrait>(db: &C, category: &str) -> Result<Vec<product::Model>> {
    Ok(product::Entity::find()
        .filter(
            Expr::expr(Func::lower(Expr::col((product::Entity, product::Column::Category))))
                .eq(category.to_lowercase()),
        )
        .filter(product::Column::OfferStatus.eq(OfferStatus::NotMade))
        .order_by_asc(product::Column::CreatedAt)
        .order_by_asc(product::Column::Id)
        .all(db)
        .await?)
}

/// Products the user sells or has made an offer on, once an offer exists.
pub async fn transactions_for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<product::Model>> {
    Ok(product::Entity::find()
        .filter(
            Condition::any()
                .add(product::Column::UserId.eq(user_id))
                .add(product::Column::OfferMadeBy.eq(user_id)),
        )
        .filter(product::Column::OfferStatus.ne(OfferStatus::NotMade))
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(db)
        .await?)
}

/// Inserts a listing and its images atomically.
#[instrument(skip(db, details, new_images), fields(name = %details.name, images = new_images.len()))]
pub async fn create_with_images<C: TransactionTrait>(
    db: &C,
    owner_id: i32,
    details: ProductDetails,
    new_images: Vec<NewImage>,
) -> Result<product::Model> {
    let txn = db.begin().await?;

    let created = product::ActiveModel {
        user_id: Set(owner_id),
        name: Set(details.name),
        description: Set(details.description),
        price: Set(details.price),
        category: Set(details.category),
        transaction_type: Set(details.transaction_type),
        condition: Set(details.condition),
        availability: Set(true),
        offer_status: Set(OfferStatus::NotMade),
        offer_made_by: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| StoreError::from_constraint(e, "owner"))?;

    for image in new_images {
        images::insert(&txn, created.id, image).await?;
    }

    txn.commit().await?;
    info!(product_id = created.id, "Product created");
    Ok(created)
}

/// Rewrites the listing fields, drops `remove_image_ids` and appends `new_images`
/// in one transaction.
#[instrument(skip(db, details, remove_image_ids, new_images))]
pub async fn update_with_images<C: TransactionTrait>(
    db: &C,
    product_id: i32,
    details: ProductDetails,
    remove_image_ids: &[i32],
    new_images: Vec<NewImage>,
) -> Result<product::Model> {
    let txn = db.begin().await?;

    let existing = product::Entity::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("product {}", product_id)))?;

    let mut active: product::ActiveModel = existing.into();
    active.name = Set(details.name);
    active.description = Set(details.description);
    active.price = Set(details.price);
    active.category = Set(details.category);
    active.transaction_type = Set(details.transaction_type);
    active.condition = Set(details.condition);
    let updated = active.update(&txn).await?;

    let removed = images::delete_from_product(&txn, product_id, remove_image_ids).await?;
    trace!(removed, "Removed product images");
    for image in new_images {
        images::insert(&txn, product_id, image).await?;
    }

    txn.commit().await?;
    info!(product_id, "Product updated");
    Ok(updated)
}

/// Deletes the listing's images, then the listing.
#[instrument(skip(db))]
pub async fn delete<C: TransactionTrait>(db: &C, product_id: i32) -> Result<()> {
    let txn = db.begin().await?;

    images::delete_for_product(&txn, product_id).await?;
    let result = product::Entity::delete_by_id(product_id).exec(&txn).await?;
    if result.rows_affected == 0 {
        warn!(product_id, "Delete targeted a missing product");
        return Err(StoreError::NotFound(format!("product {}", product_id)));
    }

    txn.commit().await?;
    info!(product_id, "Product deleted");
    Ok(())
}

/// Records `buyer_id` as the offer maker if no offer exists yet.
///
/// The status check and both column writes happen in one conditional statement,
/// so two racing buyers cannot both succeed.
#[instrument(skip(db))]
pub async fn make_offer<C: ConnectionTrait>(db: &C, product_id: i32, buyer_id: i32) -> Result<()> {
    let result = product::Entity::update_many()
        .col_expr(product::Column::OfferStatus, Expr::value(OfferStatus::Made))
        .col_expr(product::Column::OfferMadeBy, Expr::value(buyer_id))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::OfferStatus.eq(OfferStatus::NotMade))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(conflict(db, product_id, OfferStatus::Made).await);
    }
    info!(product_id, buyer_id, "Offer made");
    Ok(())
}

/// Moves the offer to `target` (`in progress` or `completed`) if it is currently
/// in the preceding state. Completion also marks the listing unavailable.
#[instrument(skip(db))]
pub async fn advance_offer<C: ConnectionTrait>(db: &C, product_id: i32, target: OfferStatus) -> Result<()> {
    let expected = match target {
        OfferStatus::InProgress | OfferStatus::Completed => target.previous(),
        _ => None,
    }
    .ok_or_else(|| StoreError::Conflict(format!("cannot advance offer to {}", target)))?;

    let mut update = product::Entity::update_many()
        .col_expr(product::Column::OfferStatus, Expr::value(target));
    if target == OfferStatus::Completed {
        update = update.col_expr(product::Column::Availability, Expr::value(false));
    }

    let result = update
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::OfferStatus.eq(expected))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(conflict(db, product_id, target).await);
    }
    info!(product_id, status = %target, "Offer advanced");
    Ok(())
}

/// Explains why a conditional offer update matched nothing.
async fn conflict<C: ConnectionTrait>(db: &C, product_id: i32, target: OfferStatus) -> StoreError {
    match find_by_id(db, product_id).await {
        Ok(Some(current)) => {
            warn!(product_id, current = %current.offer_status, target = %target, "Rejected offer transition");
            StoreError::Conflict(format!(
                "offer is {}, cannot move to {}",
                current.offer_status, target
            ))
        }
        Ok(None) => StoreError::NotFound(format!("product {}", product_id)),
        Err(e) => e,
    }
}
