use sea_orm_migration::{prelude::*, schema::*};

/// Courses offered on the registration form.
const COURSES: &[&str] = &[
    "Accounting",
    "Business Analytics",
    "Communication",
    "Computer Science",
    "Cyber Security",
    "Data Science",
    "Economics",
    "Finance",
    "Information Systems",
    "Marketing",
    "Psychology",
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Email).unique_key())
                    .col(string(Users::Name))
                    .col(string(Users::PasswordHash))
                    .col(string(Users::Course))
                    .col(text(Users::Description))
                    .col(integer(Users::Rating).default(0))
                    .col(blob_null(Users::Image))
                    .col(string_null(Users::ImageType))
                    .col(boolean(Users::Authorised).default(false))
                    .col(date_time(Users::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // Create courses table
        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(pk_auto(Courses::Id))
                    .col(string(Courses::CourseName).unique_key())
                    .to_owned(),
            )
            .await?;

        // Create products table
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(pk_auto(Products::Id))
                    .col(integer(Products::UserId))
                    .col(string(Products::Name))
                    .col(text(Products::Description))
                    .col(decimal(Products::Price).decimal_len(10, 2).default(0))
                    .col(string(Products::Category))
                    .col(string(Products::TransactionType))
                    .col(string(Products::Condition))
                    .col(boolean(Products::Availability).default(true))
                    .col(string_len(Products::OfferStatus, 20).default("not made"))
                    .col(integer_null(Products::OfferMadeBy))
                    .col(date_time(Products::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_owner")
                            .from(Products::Table, Products::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_offer_made_by")
                            .from(Products::Table, Products::OfferMadeBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_status_created")
                    .table(Products::Table)
                    .col(Products::OfferStatus)
                    .col(Products::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Create product_images table
        manager
            .create_table(
                Table::create()
                    .table(ProductImages::Table)
                    .if_not_exists()
                    .col(pk_auto(ProductImages::Id))
                    .col(integer(ProductImages::ProductId))
                    .col(blob(ProductImages::Image))
                    .col(string(ProductImages::ImageType))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_image_product")
                            .from(ProductImages::Table, ProductImages::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create favourites table (join table)
        manager
            .create_table(
                Table::create()
                    .table(Favourites::Table)
                    .if_not_exists()
                    .col(integer(Favourites::UserId))
                    .col(integer(Favourites::ProductId))
                    .primary_key(
                        Index::create()
                            .name("pk_favourites")
                            .col(Favourites::UserId)
                            .col(Favourites::ProductId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_favourites_user")
                            .from(Favourites::Table, Favourites::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_favourites_product")
                            .from(Favourites::Table, Favourites::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create reviews table
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(pk_auto(Reviews::Id))
                    .col(integer(Reviews::UserId))
                    .col(integer(Reviews::ReviewerId))
                    .col(text(Reviews::Content))
                    .col(integer(Reviews::StarsGiven))
                    .col(date_time(Reviews::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_user")
                            .from(Reviews::Table, Reviews::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_reviewer")
                            .from(Reviews::Table, Reviews::ReviewerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Seed the course list
        for course in COURSES {
            let insert = Query::insert()
                .into_table(Courses::Table)
                .columns([Courses::CourseName])
                .values([(*course).into()])
                .map_err(|e| DbErr::Custom(e.to_string()))?
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Favourites::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductImages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Name,
    PasswordHash,
    Course,
    Description,
    Rating,
    Image,
    ImageType,
    Authorised,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
    CourseName,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    UserId,
    Name,
    Description,
    Price,
    Category,
    TransactionType,
    Condition,
    Availability,
    OfferStatus,
    OfferMadeBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProductImages {
    Table,
    Id,
    ProductId,
    Image,
    ImageType,
}

#[derive(DeriveIden)]
enum Favourites {
    Table,
    UserId,
    ProductId,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    UserId,
    ReviewerId,
    Content,
    StarsGiven,
    CreatedAt,
}
