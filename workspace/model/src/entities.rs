//! Root of the SeaORM entity modules.
//! Marketplace tables (users, products, images, favourites, reviews) and the
//! blog tables (articles, comments, author settings) are defined here.

pub mod article;
pub mod author_settings;
pub mod comment;
pub mod course;
pub mod favourite;
pub mod product;
pub mod product_image;
pub mod review;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::article::Entity as Article;
    pub use super::author_settings::Entity as AuthorSettings;
    pub use super::comment::Entity as Comment;
    pub use super::course::Entity as Course;
    pub use super::favourite::Entity as Favourite;
    pub use super::product::Entity as Product;
    pub use super::product_image::Entity as ProductImage;
    pub use super::review::Entity as Review;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    async fn insert_user(db: &DatabaseConnection, email: &str) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            email: Set(email.to_string()),
            name: Set("Someone".to_string()),
            password_hash: Set("hash".to_string()),
            course: Set("Computer Science".to_string()),
            description: Set("hi".to_string()),
            rating: Set(0),
            image: Set(None),
            image_type: Set(None),
            authorised: Set(false),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let seller = insert_user(&db, "seller@mymail.sim.edu.sg").await?;
        let buyer = insert_user(&db, "buyer@mymail.sim.edu.sg").await?;

        let listing = product::ActiveModel {
            user_id: Set(seller.id),
            name: Set("Desk lamp".to_string()),
            description: Set("Barely used".to_string()),
            price: Set(Decimal::new(1250, 2)),
            category: Set("Furniture".to_string()),
            transaction_type: Set("Sell, Trade".to_string()),
            condition: Set("Good".to_string()),
            availability: Set(true),
            offer_status: Set(product::OfferStatus::NotMade),
            offer_made_by: Set(None),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        assert_eq!(listing.offer_status, product::OfferStatus::NotMade);
        assert_eq!(listing.price, Decimal::new(1250, 2));

        product_image::ActiveModel {
            product_id: Set(listing.id),
            image: Set(vec![1, 2, 3]),
            image_type: Set("image/png".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        favourite::ActiveModel {
            user_id: Set(buyer.id),
            product_id: Set(listing.id),
        }
        .insert(&db)
        .await?;

        // Composite key rejects a second identical favourite
        let duplicate = favourite::ActiveModel {
            user_id: Set(buyer.id),
            product_id: Set(listing.id),
        }
        .insert(&db)
        .await;
        assert!(duplicate.is_err());

        let images = listing.find_related(ProductImage).all(&db).await?;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image_type, "image/png");

        // Removing the product cascades to images and favourites
        Product::delete_by_id(listing.id).exec(&db).await?;
        assert_eq!(ProductImage::find().count(&db).await?, 0);
        assert_eq!(
            Favourite::find()
                .filter(favourite::Column::UserId.eq(buyer.id))
                .count(&db)
                .await?,
            0
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_seeded_reference_data() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let courses = Course::find().all(&db).await?;
        assert!(!courses.is_empty());

        let settings = AuthorSettings::find_by_id(1).one(&db).await?;
        assert!(settings.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_user_email_is_unique() -> Result<(), DbErr> {
        let db = setup_db().await?;

        insert_user(&db, "same@mymail.sim.edu.sg").await?;
        let second = insert_user(&db, "same@mymail.sim.edu.sg").await;
        assert!(second.is_err());

        assert_eq!(User::find().count(&db).await?, 1);
        Ok(())
    }
}
