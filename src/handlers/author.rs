use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use chrono::NaiveDateTime;
use model::entities::{article, article::ArticleStatus, author_settings};
use serde::{Deserialize, Serialize};
use store::{articles::ArticleDraft, StoreError};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::schemas::{ActionResponse, AppState};
use crate::session::{Author, Principal};

pub const ARTICLE_NOT_FOUND: &str = "Article not found";

#[derive(Debug, Serialize, ToSchema)]
pub struct ArticleView {
    pub id: i32,
    pub title: String,
    pub content: String,
    /// "draft" or "published"
    pub status: String,
    pub reads: i32,
    pub likes: i32,
    pub created_at: NaiveDateTime,
    pub last_modified: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
}

impl From<article::Model> for ArticleView {
    fn from(model: article::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            content: model.content,
            status: model.status.as_str().to_string(),
            reads: model.reads,
            likes: model.likes,
            created_at: model.created_at,
            last_modified: model.last_modified,
            published_at: model.published_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsPage {
    pub blog_title: String,
    pub author_name: String,
}

impl From<author_settings::Model> for SettingsPage {
    fn from(model: author_settings::Model) -> Self {
        Self {
            blog_title: model.blog_title,
            author_name: model.author_name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorHome {
    pub author: Principal,
    pub settings: SettingsPage,
    pub published: Vec<ArticleView>,
    pub drafts: Vec<ArticleView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArticleEditPage {
    /// Absent when writing a new article
    pub article: Option<ArticleView>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct SettingsForm {
    #[serde(default, alias = "blogTitle")]
    #[validate(length(min = 1, max = 200))]
    pub blog_title: String,
    #[serde(default, alias = "authorName")]
    #[validate(length(min = 1, max = 100))]
    pub author_name: String,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ArticleForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 100000))]
    pub content: String,
    /// "published" publishes, anything else saves a draft
    #[serde(default)]
    pub status: String,
}

impl ArticleForm {
    fn into_draft(self) -> Result<ArticleDraft, AppError> {
        let form = ArticleForm {
            title: self.title.trim().to_string(),
            ..self
        };
        form.validate()
            .map_err(|_| AppError::bad_request("Article title is required."))?;
        Ok(ArticleDraft {
            title: form.title,
            content: form.content,
            status: parse_status(&form.status),
        })
    }
}

pub fn parse_status(raw: &str) -> ArticleStatus {
    if raw.trim().eq_ignore_ascii_case("published") {
        ArticleStatus::Published
    } else {
        ArticleStatus::Draft
    }
}

fn missing_article() -> Response {
    let body = ActionResponse {
        success: false,
        message: Some(ARTICLE_NOT_FOUND.to_string()),
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

/// Author dashboard with published articles and drafts
#[utoipa::path(
    get,
    path = "/author",
    tag = "author",
    responses(
        (status = 200, description = "Author dashboard", body = AuthorHome),
        (status = 403, description = "Signed in but not an authorised author")
    )
)]
#[instrument(skip(state, principal))]
pub async fn author_home(
    State(state): State<AppState>,
    Author(principal): Author,
) -> Result<Json<AuthorHome>, AppError> {
    let db = state.store.conn();
    let settings = store::articles::settings(db).await?;
    let published = store::articles::published(db).await?;
    let drafts = store::articles::drafts(db).await?;
    debug!(published = published.len(), drafts = drafts.len(), "Author dashboard");

    Ok(Json(AuthorHome {
        author: principal,
        settings: settings.into(),
        published: published.into_iter().map(ArticleView::from).collect(),
        drafts: drafts.into_iter().map(ArticleView::from).collect(),
    }))
}

/// Blog settings form
#[utoipa::path(
    get,
    path = "/author/settings",
    tag = "author",
    responses((status = 200, description = "Current settings", body = SettingsPage))
)]
#[instrument(skip(state, _author))]
pub async fn settings_page(State(state): State<AppState>, _author: Author) -> Result<Json<SettingsPage>, AppError> {
    let settings = store::articles::settings(state.store.conn()).await?;
    Ok(Json(settings.into()))
}

/// Rename the blog or its author
#[utoipa::path(
    post,
    path = "/author/settings",
    tag = "author",
    request_body(content = SettingsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved, redirect to /author"),
        (status = 400, description = "Blank title or name", body = ActionResponse)
    )
)]
#[instrument(skip(state, _author, form))]
pub async fn update_settings(
    State(state): State<AppState>,
    _author: Author,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, AppError> {
    let form = SettingsForm {
        blog_title: form.blog_title.trim().to_string(),
        author_name: form.author_name.trim().to_string(),
    };
    form.validate()
        .map_err(|_| AppError::bad_request("Blog title and author name are required."))?;
    store::articles::update_settings(state.store.conn(), &form.blog_title, &form.author_name).await?;
    info!("Blog settings updated");
    Ok(Redirect::to("/author"))
}

/// Blank article form
#[utoipa::path(
    get,
    path = "/author/edit",
    tag = "author",
    responses((status = 200, description = "Empty editor", body = ArticleEditPage))
)]
pub async fn new_article_page(_author: Author) -> Json<ArticleEditPage> {
    Json(ArticleEditPage { article: None })
}

/// Write a new article
#[utoipa::path(
    post,
    path = "/author/edit",
    tag = "author",
    request_body(content = ArticleForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved, redirect to /author"),
        (status = 400, description = "Missing title", body = ActionResponse)
    )
)]
#[instrument(skip(state, _author, form))]
pub async fn create_article(
    State(state): State<AppState>,
    _author: Author,
    Form(form): Form<ArticleForm>,
) -> Result<Redirect, AppError> {
    let draft = form.into_draft()?;
    let created = store::articles::create(state.store.conn(), draft).await?;
    info!(article_id = created.id, status = created.status.as_str(), "Article written");
    Ok(Redirect::to("/author"))
}

/// Editor for an existing article
#[utoipa::path(
    get,
    path = "/author/edit/{id}",
    tag = "author",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Editor", body = ArticleEditPage),
        (status = 404, description = "Article not found")
    )
)]
#[instrument(skip(state, _author))]
pub async fn edit_article_page(
    State(state): State<AppState>,
    _author: Author,
    Path(id): Path<i32>,
) -> Result<Json<ArticleEditPage>, AppError> {
    let article = store::articles::find(state.store.conn(), id)
        .await?
        .ok_or_else(|| AppError::not_found(ARTICLE_NOT_FOUND))?;
    Ok(Json(ArticleEditPage {
        article: Some(article.into()),
    }))
}

/// Save changes to an article
#[utoipa::path(
    post,
    path = "/author/edit/{id}",
    tag = "author",
    params(("id" = i32, Path, description = "Article ID")),
    request_body(content = ArticleForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved, redirect to /author"),
        (status = 404, description = "Article not found")
    )
)]
#[instrument(skip(state, _author, form))]
pub async fn update_article(
    State(state): State<AppState>,
    _author: Author,
    Path(id): Path<i32>,
    Form(form): Form<ArticleForm>,
) -> Result<Redirect, AppError> {
    let draft = form.into_draft()?;
    match store::articles::update(state.store.conn(), id, draft).await {
        Ok(updated) => {
            info!(article_id = updated.id, "Article saved");
            Ok(Redirect::to("/author"))
        }
        Err(StoreError::NotFound(_)) => Err(AppError::not_found(ARTICLE_NOT_FOUND)),
        Err(e) => Err(e.into()),
    }
}

/// Delete an article and its comments
#[utoipa::path(
    delete,
    path = "/author/delete-article/{id}",
    tag = "author",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Deleted", body = ActionResponse),
        (status = 404, description = "Article not found", body = ActionResponse)
    )
)]
#[instrument(skip(state, _author))]
pub async fn delete_article(
    State(state): State<AppState>,
    _author: Author,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    match store::articles::delete(state.store.conn(), id).await {
        Ok(()) => Ok(Json(ActionResponse::ok()).into_response()),
        Err(StoreError::NotFound(_)) => {
            warn!(article_id = id, "Delete of missing article");
            Ok(missing_article())
        }
        Err(e) => Err(e.into()),
    }
}

/// Publish a draft
#[utoipa::path(
    post,
    path = "/author/publish-article/{id}",
    tag = "author",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Published", body = ActionResponse),
        (status = 404, description = "Article not found", body = ActionResponse)
    )
)]
#[instrument(skip(state, _author))]
pub async fn publish_article(
    State(state): State<AppState>,
    _author: Author,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    match store::articles::publish(state.store.conn(), id).await {
        Ok(()) => Ok(Json(ActionResponse::ok()).into_response()),
        Err(StoreError::NotFound(_)) => {
            warn!(article_id = id, "Publish of missing article");
            Ok(missing_article())
        }
        Err(e) => Err(e.into()),
    }
}
