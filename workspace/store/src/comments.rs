use chrono::Utc;
use model::entities::comment;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct NewComment {
    pub article_id: i32,
    pub user_id: Option<i32>,
    pub commenter_name: String,
    pub content: String,
}

/// Comments on an article, newest first.
pub async fn for_article<C: ConnectionTrait>(db: &C, article_id: i32) -> Result<Vec<comment::Model>> {
    Ok(comment::Entity::find()
        .filter(comment::Column::ArticleId.eq(article_id))
        .order_by_desc(comment::Column::CreatedAt)
        .order_by_desc(comment::Column::Id)
        .all(db)
        .await?)
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<comment::Model>> {
    Ok(comment::Entity::find_by_id(id).one(db).await?)
}

#[instrument(skip(db, new_comment), fields(article_id = new_comment.article_id))]
pub async fn add<C: ConnectionTrait>(db: &C, new_comment: NewComment) -> Result<comment::Model> {
    let created = comment::ActiveModel {
        article_id: Set(new_comment.article_id),
        user_id: Set(new_comment.user_id),
        commenter_name: Set(new_comment.commenter_name),
        content: Set(new_comment.content),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| StoreError::from_constraint(e, "article"))?;
    info!(comment_id = created.id, "Comment added");
    Ok(created)
}

#[instrument(skip(db))]
pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let result = comment::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(StoreError::NotFound(format!("comment {}", id)));
    }
    Ok(())
}
