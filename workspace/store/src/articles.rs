use chrono::Utc;
use model::entities::article::{self, ArticleStatus};
use model::entities::author_settings;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument, warn};

use crate::error::{Result, StoreError};

const SETTINGS_ID: i32 = 1;

/// Title, body and status submitted from the author's edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
}

/// Published articles, most recently published first.
pub async fn published<C: ConnectionTrait>(db: &C) -> Result<Vec<article::Model>> {
    Ok(article::Entity::find()
        .filter(article::Column::Status.eq(ArticleStatus::Published))
        .order_by_desc(article::Column::PublishedAt)
        .order_by_desc(article::Column::Id)
        .all(db)
        .await?)
}

/// Unpublished articles, most recently edited first.
pub async fn drafts<C: ConnectionTrait>(db: &C) -> Result<Vec<article::Model>> {
    Ok(article::Entity::find()
        .filter(article::Column::Status.eq(ArticleStatus::Draft))
        .order_by_desc(article::Column::LastModified)
        .order_by_desc(article::Column::Id)
        .all(db)
        .await?)
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<article::Model>> {
    Ok(article::Entity::find_by_id(id).one(db).await?)
}

/// The article only if it is visible to readers.
pub async fn find_published<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<article::Model>> {
    Ok(article::Entity::find_by_id(id)
        .filter(article::Column::Status.eq(ArticleStatus::Published))
        .one(db)
        .await?)
}

#[instrument(skip(db, draft), fields(title = %draft.title))]
pub async fn create<C: ConnectionTrait>(db: &C, draft: ArticleDraft) -> Result<article::Model> {
    let now = Utc::now().naive_utc();
    let published_at = (draft.status == ArticleStatus::Published).then_some(now);
    let created = article::ActiveModel {
        title: Set(draft.title),
        content: Set(draft.content),
        status: Set(draft.status),
        reads: Set(0),
        likes: Set(0),
        created_at: Set(now),
        last_modified: Set(now),
        published_at: Set(published_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(article_id = created.id, "Article created");
    Ok(created)
}

/// Saves an edit. The first transition to published stamps `published_at`.
#[instrument(skip(db, draft))]
pub async fn update<C: ConnectionTrait>(db: &C, id: i32, draft: ArticleDraft) -> Result<article::Model> {
    let existing = find(db, id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("article {}", id)))?;
    let now = Utc::now().naive_utc();
    let stamp_publish =
        draft.status == ArticleStatus::Published && existing.published_at.is_none();

    let mut active: article::ActiveModel = existing.into();
    active.title = Set(draft.title);
    active.content = Set(draft.content);
    active.status = Set(draft.status);
    active.last_modified = Set(now);
    if stamp_publish {
        active.published_at = Set(Some(now));
    }
    Ok(active.update(db).await?)
}

#[instrument(skip(db))]
pub async fn publish<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let existing = find(db, id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("article {}", id)))?;
    let now = Utc::now().naive_utc();
    let mut active: article::ActiveModel = existing.into();
    active.status = Set(ArticleStatus::Published);
    active.published_at = Set(Some(now));
    active.last_modified = Set(now);
    active.update(db).await?;
    info!(article_id = id, "Article published");
    Ok(())
}

#[instrument(skip(db))]
pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let result = article::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        warn!(article_id = id, "Delete targeted a missing article");
        return Err(StoreError::NotFound(format!("article {}", id)));
    }
    info!(article_id = id, "Article deleted");
    Ok(())
}

async fn bump<C: ConnectionTrait>(db: &C, id: i32, reads: i32, likes: i32) -> Result<()> {
    let result = article::Entity::update_many()
        .col_expr(article::Column::Reads, Expr::col(article::Column::Reads).add(reads))
        .col_expr(article::Column::Likes, Expr::col(article::Column::Likes).add(likes))
        .filter(article::Column::Id.eq(id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(StoreError::NotFound(format!("article {}", id)));
    }
    Ok(())
}

/// Counts one view.
pub async fn record_read<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    bump(db, id, 1, 0).await
}

/// Counts one like. The reader is redirected back to the article afterwards,
/// which records a read, so one read is taken off here to keep the count honest.
pub async fn like<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    bump(db, id, -1, 1).await
}

pub async fn settings<C: ConnectionTrait>(db: &C) -> Result<author_settings::Model> {
    author_settings::Entity::find_by_id(SETTINGS_ID)
        .one(db)
        .await?
        .ok_or_else(|| StoreError::NotFound("author settings".to_string()))
}

#[instrument(skip(db))]
pub async fn update_settings<C: ConnectionTrait>(
    db: &C,
    blog_title: &str,
    author_name: &str,
) -> Result<author_settings::Model> {
    let mut active: author_settings::ActiveModel = settings(db).await?.into();
    active.blog_title = Set(blog_title.to_string());
    active.author_name = Set(author_name.to_string());
    Ok(active.update(db).await?)
}
