use axum::{
    extract::{Path, State},
    response::{Json, Redirect},
    Form,
};
use chrono::NaiveDateTime;
use model::entities::{article, comment};
use serde::{Deserialize, Serialize};
use store::comments::NewComment;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::handlers::author::{ArticleView, SettingsPage, ARTICLE_NOT_FOUND};
use crate::schemas::AppState;
use crate::session::{CurrentUser, Principal};

pub const COMMENT_FIELDS_REQUIRED: &str = "Commenter name and content are required.";

#[derive(Debug, Serialize, ToSchema)]
pub struct ReaderHome {
    pub settings: SettingsPage,
    /// Newest publication first
    pub articles: Vec<ArticleView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentView {
    pub id: i32,
    pub article_id: i32,
    pub user_id: Option<i32>,
    pub commenter_name: String,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl From<comment::Model> for CommentView {
    fn from(model: comment::Model) -> Self {
        Self {
            id: model.id,
            article_id: model.article_id,
            user_id: model.user_id,
            commenter_name: model.commenter_name,
            content: model.content,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReaderArticlePage {
    pub settings: SettingsPage,
    pub article: ArticleView,
    /// Newest first
    pub comments: Vec<CommentView>,
    /// The signed-in reader, if any
    pub viewer: Option<Principal>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CommentForm {
    #[serde(default, alias = "commenterName")]
    pub commenter_name: String,
    #[serde(default, alias = "commentContent")]
    pub content: String,
}

async fn published_article(state: &AppState, id: i32) -> Result<article::Model, AppError> {
    store::articles::find_published(state.store.conn(), id)
        .await?
        .ok_or_else(|| {
            debug!(article_id = id, "Article missing or unpublished");
            AppError::not_found(ARTICLE_NOT_FOUND)
        })
}

fn article_path(id: i32) -> String {
    format!("/reader/article/{}", id)
}

/// Published articles
#[utoipa::path(
    get,
    path = "/reader",
    tag = "reader",
    responses((status = 200, description = "Reader home", body = ReaderHome))
)]
#[instrument(skip(state))]
pub async fn reader_home(State(state): State<AppState>) -> Result<Json<ReaderHome>, AppError> {
    let db = state.store.conn();
    let settings = store::articles::settings(db).await?;
    let articles = store::articles::published(db).await?;
    Ok(Json(ReaderHome {
        settings: settings.into(),
        articles: articles.into_iter().map(ArticleView::from).collect(),
    }))
}

/// Read a published article; each visit counts one read
#[utoipa::path(
    get,
    path = "/reader/article/{id}",
    tag = "reader",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article with comments", body = ReaderArticlePage),
        (status = 404, description = "Article not found")
    )
)]
#[instrument(skip(state, viewer))]
pub async fn read_article(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ReaderArticlePage>, AppError> {
    let db = state.store.conn();
    let mut article = published_article(&state, id).await?;
    store::articles::record_read(db, id).await?;
    article.reads += 1;

    let settings = store::articles::settings(db).await?;
    let comments = store::comments::for_article(db, id).await?;

    Ok(Json(ReaderArticlePage {
        settings: settings.into(),
        article: article.into(),
        comments: comments.into_iter().map(CommentView::from).collect(),
        viewer: viewer.map(|CurrentUser(principal)| principal),
    }))
}

/// Like an article
#[utoipa::path(
    post,
    path = "/reader/article/{id}/like",
    tag = "reader",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 303, description = "Liked, redirect back to the article"),
        (status = 404, description = "Article not found")
    )
)]
#[instrument(skip(state))]
pub async fn like_article(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Redirect, AppError> {
    published_article(&state, id).await?;
    store::articles::like(state.store.conn(), id).await?;
    debug!(article_id = id, "Article liked");
    Ok(Redirect::to(&article_path(id)))
}

/// Comment on an article
#[utoipa::path(
    post,
    path = "/reader/article/{id}/comment",
    tag = "reader",
    params(("id" = i32, Path, description = "Article ID")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Comment stored, redirect back to the article"),
        (status = 400, description = "Blank name or content", body = crate::schemas::ActionResponse),
        (status = 404, description = "Article not found")
    )
)]
#[instrument(skip(state, viewer, form))]
pub async fn add_comment(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(id): Path<i32>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    let commenter_name = form.commenter_name.trim();
    let content = form.content.trim();
    if commenter_name.is_empty() || content.is_empty() {
        return Err(AppError::bad_request(COMMENT_FIELDS_REQUIRED));
    }
    let CurrentUser(principal) = viewer.ok_or(AppError::Unauthenticated)?;
    published_article(&state, id).await?;

    let created = store::comments::add(
        state.store.conn(),
        NewComment {
            article_id: id,
            user_id: Some(principal.id),
            commenter_name: commenter_name.to_string(),
            content: content.to_string(),
        },
    )
    .await?;
    info!(article_id = id, comment_id = created.id, "Comment posted");
    Ok(Redirect::to(&article_path(id)))
}

/// Delete a comment; allowed for its author and for authorised users
#[utoipa::path(
    post,
    path = "/reader/article/{id}/comment/{comment_id}/delete",
    tag = "reader",
    params(
        ("id" = i32, Path, description = "Article ID"),
        ("comment_id" = i32, Path, description = "Comment ID")
    ),
    responses(
        (status = 303, description = "Deleted, redirect back to the article"),
        (status = 403, description = "Neither the commenter nor an authorised user"),
        (status = 404, description = "Comment not found")
    )
)]
#[instrument(skip(state, principal))]
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path((id, comment_id)): Path<(i32, i32)>,
) -> Result<Redirect, AppError> {
    let db = state.store.conn();
    let comment = store::comments::find(db, comment_id)
        .await?
        .filter(|c| c.article_id == id)
        .ok_or_else(|| AppError::not_found("Comment not found"))?;

    let own = comment.user_id == Some(principal.id);
    let authorised = own
        || store::users::find_by_id(db, principal.id)
            .await?
            .is_some_and(|user| user.authorised);
    if !authorised {
        warn!(comment_id, user_id = principal.id, "Comment delete denied");
        return Err(AppError::forbidden("Only the commenter or an authorised user can delete this comment."));
    }

    store::comments::delete(db, comment_id).await?;
    info!(comment_id, "Comment deleted");
    Ok(Redirect::to(&article_path(id)))
}
