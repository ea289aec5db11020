use std::collections::HashMap;

use chrono::Utc;
use model::entities::{review, user};
use model::rating::floor_mean;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::users;

#[derive(Debug, Clone)]
pub struct NewReview {
    /// The user being reviewed.
    pub user_id: i32,
    pub reviewer_id: i32,
    pub content: String,
    pub stars_given: i32,
}

/// Reviews received by `user_id`, newest first.
pub async fn for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<review::Model>> {
    Ok(review::Entity::find()
        .filter(review::Column::UserId.eq(user_id))
        .order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id)
        .all(db)
        .await?)
}

/// Maps each review id to the account that wrote it.
pub async fn reviewers_for<C: ConnectionTrait>(
    db: &C,
    reviews: &[review::Model],
) -> Result<HashMap<i32, user::Model>> {
    let reviewer_ids: Vec<i32> = reviews.iter().map(|r| r.reviewer_id).collect();
    let reviewers = users::find_many(db, &reviewer_ids).await?;
    Ok(reviews
        .iter()
        .filter_map(|r| reviewers.get(&r.reviewer_id).map(|u| (r.id, u.clone())))
        .collect())
}

/// Stores the review and refreshes the reviewed user's rating in one transaction.
/// Returns the new rating.
#[instrument(skip(db, new_review), fields(user_id = new_review.user_id, reviewer_id = new_review.reviewer_id))]
pub async fn submit<C: TransactionTrait>(db: &C, new_review: NewReview) -> Result<i32> {
    let txn = db.begin().await?;
    let reviewed = new_review.user_id;

    review::ActiveModel {
        user_id: Set(reviewed),
        reviewer_id: Set(new_review.reviewer_id),
        content: Set(new_review.content),
        stars_given: Set(new_review.stars_given),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let stars: Vec<i32> = review::Entity::find()
        .select_only()
        .column(review::Column::StarsGiven)
        .filter(review::Column::UserId.eq(reviewed))
        .into_tuple()
        .all(&txn)
        .await?;
    let rating = floor_mean(&stars);
    debug!(reviews = stars.len(), rating, "Recomputed rating");

    users::set_rating(&txn, reviewed, rating).await?;
    txn.commit().await?;

    info!(rating, "Review stored");
    Ok(rating)
}
