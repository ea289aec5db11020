use model::entities::course;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};

use crate::error::Result;

/// All courses, alphabetically.
pub async fn all<C: ConnectionTrait>(db: &C) -> Result<Vec<course::Model>> {
    Ok(course::Entity::find()
        .order_by_asc(course::Column::CourseName)
        .all(db)
        .await?)
}
