use std::collections::HashMap;

use chrono::Utc;
use model::entities::user;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{Result, StoreError};

/// Fields captured by the registration form.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub course: String,
    pub description: String,
}

#[instrument(skip(db))]
pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<user::Model>> {
    trace!("Looking up user by email");
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?)
}

#[instrument(skip(db))]
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<user::Model>> {
    Ok(user::Entity::find_by_id(id).one(db).await?)
}

/// Loads every user in `ids` with one query, keyed by id. Unknown ids are absent.
#[instrument(skip(db, ids), fields(count = ids.len()))]
pub async fn find_many<C: ConnectionTrait>(db: &C, ids: &[i32]) -> Result<HashMap<i32, user::Model>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;
    debug!("Loaded {} of {} requested users", users.len(), ids.len());
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

pub async fn email_exists<C: ConnectionTrait>(db: &C, email: &str) -> Result<bool> {
    let count = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Inserts a new account with a zero rating. A taken email yields [`StoreError::Duplicate`].
#[instrument(skip(db, new_user), fields(email = %new_user.email))]
pub async fn create<C: ConnectionTrait>(db: &C, new_user: NewUser) -> Result<user::Model> {
    let model = user::ActiveModel {
        email: Set(new_user.email),
        name: Set(new_user.name),
        password_hash: Set(new_user.password_hash),
        course: Set(new_user.course),
        description: Set(new_user.description),
        rating: Set(0),
        image: Set(None),
        image_type: Set(None),
        authorised: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| StoreError::from_constraint(e, "email"))?;

    info!(user_id = model.id, "User created");
    Ok(model)
}

async fn update_column<C: ConnectionTrait>(
    db: &C,
    id: i32,
    column: user::Column,
    value: impl Into<sea_orm::Value>,
) -> Result<()> {
    let result = user::Entity::update_many()
        .col_expr(column, Expr::value(value))
        .filter(user::Column::Id.eq(id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        warn!(user_id = id, "Update targeted a missing user");
        return Err(StoreError::NotFound(format!("user {}", id)));
    }
    Ok(())
}

#[instrument(skip(db))]
pub async fn update_name<C: ConnectionTrait>(db: &C, id: i32, name: &str) -> Result<()> {
    update_column(db, id, user::Column::Name, name.to_string()).await
}

#[instrument(skip(db))]
pub async fn update_course<C: ConnectionTrait>(db: &C, id: i32, course: &str) -> Result<()> {
    update_column(db, id, user::Column::Course, course.to_string()).await
}

#[instrument(skip(db))]
pub async fn update_description<C: ConnectionTrait>(db: &C, id: i32, description: &str) -> Result<()> {
    update_column(db, id, user::Column::Description, description.to_string()).await
}

/// Replaces the profile picture. Fails with [`StoreError::NotFound`] for an unknown user.
#[instrument(skip(db, image), fields(bytes = image.len()))]
pub async fn update_image<C: ConnectionTrait>(
    db: &C,
    id: i32,
    image: Vec<u8>,
    image_type: &str,
) -> Result<()> {
    let result = user::Entity::update_many()
        .col_expr(user::Column::Image, Expr::value(image))
        .col_expr(user::Column::ImageType, Expr::value(image_type.to_string()))
        .filter(user::Column::Id.eq(id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(StoreError::NotFound(format!("user {}", id)));
    }
    Ok(())
}

pub async fn set_rating<C: ConnectionTrait>(db: &C, id: i32, rating: i32) -> Result<()> {
    update_column(db, id, user::Column::Rating, rating).await
}

/// Grants or revokes access to the blog author area.
#[instrument(skip(db))]
pub async fn set_authorised<C: ConnectionTrait>(db: &C, email: &str, authorised: bool) -> Result<user::Model> {
    let existing = find_by_email(db, email)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {}", email)))?;
    let mut active: user::ActiveModel = existing.into();
    active.authorised = Set(authorised);
    let updated = active.update(db).await?;
    info!(user_id = updated.id, authorised, "Author access changed");
    Ok(updated)
}
