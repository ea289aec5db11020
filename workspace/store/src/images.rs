use std::collections::HashMap;

use model::entities::product_image;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, instrument};

use crate::error::Result;

/// Bytes and MIME type of an uploaded image, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

pub async fn for_product<C: ConnectionTrait>(db: &C, product_id: i32) -> Result<Vec<product_image::Model>> {
    Ok(product_image::Entity::find()
        .filter(product_image::Column::ProductId.eq(product_id))
        .order_by_asc(product_image::Column::Id)
        .all(db)
        .await?)
}

/// Images for several products in one query.
///
/// Every requested product id appears in the result, with an empty list when it
/// has no images. Row order from the database does not matter.
#[instrument(skip(db, product_ids), fields(count = product_ids.len()))]
pub async fn for_products<C: ConnectionTrait>(
    db: &C,
    product_ids: &[i32],
) -> Result<HashMap<i32, Vec<product_image::Model>>> {
    let mut grouped: HashMap<i32, Vec<product_image::Model>> =
        product_ids.iter().map(|id| (*id, Vec::new())).collect();
    if product_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = product_image::Entity::find()
        .filter(product_image::Column::ProductId.is_in(product_ids.iter().copied()))
        .order_by_asc(product_image::Column::Id)
        .all(db)
        .await?;
    debug!("Fetched {} images", rows.len());

    for row in rows {
        grouped.entry(row.product_id).or_default().push(row);
    }
    Ok(grouped)
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    image: NewImage,
) -> Result<product_image::Model> {
    Ok(product_image::ActiveModel {
        product_id: Set(product_id),
        image: Set(image.bytes),
        image_type: Set(image.mime),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Removes the listed images, ignoring ids that belong to another product.
pub async fn delete_from_product<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    image_ids: &[i32],
) -> Result<u64> {
    if image_ids.is_empty() {
        return Ok(0);
    }
    let result = product_image::Entity::delete_many()
        .filter(product_image::Column::ProductId.eq(product_id))
        .filter(product_image::Column::Id.is_in(image_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn delete_for_product<C: ConnectionTrait>(db: &C, product_id: i32) -> Result<u64> {
    let result = product_image::Entity::delete_many()
        .filter(product_image::Column::ProductId.eq(product_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
