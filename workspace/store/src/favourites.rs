use model::entities::{favourite, product};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use tracing::{debug, info, instrument};

use crate::error::{Result, StoreError};

pub async fn find<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    product_id: i32,
) -> Result<Option<favourite::Model>> {
    Ok(favourite::Entity::find_by_id((user_id, product_id)).one(db).await?)
}

/// Adds the pair once. An existing pair yields [`StoreError::Duplicate`], an unknown
/// product yields [`StoreError::NotFound`].
#[instrument(skip(db))]
pub async fn add<C: ConnectionTrait>(db: &C, user_id: i32, product_id: i32) -> Result<()> {
    if product::Entity::find_by_id(product_id).one(db).await?.is_none() {
        return Err(StoreError::NotFound(format!("product {}", product_id)));
    }
    if find(db, user_id, product_id).await?.is_some() {
        debug!("Favourite already present");
        return Err(StoreError::Duplicate("favourite".to_string()));
    }

    // The composite key still rejects a concurrent insert that slipped past the check
    favourite::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product_id),
    }
    .insert(db)
    .await
    .map_err(|e| StoreError::from_constraint(e, "favourite"))?;

    info!("Favourite added");
    Ok(())
}

/// Removes the pair if present. Removing an absent pair succeeds.
#[instrument(skip(db))]
pub async fn remove<C: ConnectionTrait>(db: &C, user_id: i32, product_id: i32) -> Result<u64> {
    let result = favourite::Entity::delete_many()
        .filter(favourite::Column::UserId.eq(user_id))
        .filter(favourite::Column::ProductId.eq(product_id))
        .exec(db)
        .await?;
    debug!(removed = result.rows_affected, "Favourite removed");
    Ok(result.rows_affected)
}

/// Products the user has favourited.
pub async fn for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<product::Model>> {
    Ok(product::Entity::find()
        .join(JoinType::InnerJoin, product::Relation::Favourite.def())
        .filter(favourite::Column::UserId.eq(user_id))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await?)
}
