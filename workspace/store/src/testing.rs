//! Fixtures shared by the store tests.

use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use model::entities::product::OfferStatus;
use model::entities::{product, user};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

/// Fresh in-memory database with foreign keys on and all migrations applied.
pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn insert_user(db: &DatabaseConnection, email: &str) -> user::Model {
    user::ActiveModel {
        email: Set(email.to_string()),
        name: Set(email.split('@').next().unwrap_or("user").to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        course: Set("Computer Science".to_string()),
        description: Set("test user".to_string()),
        rating: Set(0),
        image: Set(None),
        image_type: Set(None),
        authorised: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

pub async fn insert_product(
    db: &DatabaseConnection,
    owner: i32,
    name: &str,
    transaction_type: &str,
    status: OfferStatus,
) -> product::Model {
    product::ActiveModel {
        user_id: Set(owner),
        name: Set(name.to_string()),
        description: Set(format!("{} description", name)),
        price: Set(Decimal::new(500, 2)),
        category: Set("Books".to_string()),
        transaction_type: Set(transaction_type.to_string()),
        condition: Set("Good".to_string()),
        availability: Set(true),
        offer_status: Set(status),
        offer_made_by: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert product")
}
