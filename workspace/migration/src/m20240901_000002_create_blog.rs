use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. Create articles table
        manager
            .create_table(
                Table::create()
                    .table(Articles::Table)
                    .if_not_exists()
                    .col(pk_auto(Articles::Id))
                    .col(string(Articles::Title))
                    .col(text(Articles::Content))
                    .col(string_len(Articles::Status, 20).default("draft"))
                    .col(integer(Articles::Reads).default(0))
                    .col(integer(Articles::Likes).default(0))
                    .col(date_time(Articles::CreatedAt).default(Expr::current_timestamp()))
                    .col(date_time(Articles::LastModified).default(Expr::current_timestamp()))
                    .col(date_time_null(Articles::PublishedAt))
                    .to_owned(),
            )
            .await?;

        // 2. Create comments table
        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(pk_auto(Comments::Id))
                    .col(integer(Comments::ArticleId))
                    .col(integer_null(Comments::UserId))
                    .col(string(Comments::CommenterName))
                    .col(text(Comments::Content))
                    .col(date_time(Comments::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_article")
                            .from(Comments::Table, Comments::ArticleId)
                            .to(Articles::Table, Articles::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_user")
                            .from(Comments::Table, Comments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 3. Create author_settings table with its single row
        manager
            .create_table(
                Table::create()
                    .table(AuthorSettings::Table)
                    .if_not_exists()
                    .col(integer(AuthorSettings::Id).primary_key())
                    .col(string(AuthorSettings::BlogTitle))
                    .col(string(AuthorSettings::AuthorName))
                    .to_owned(),
            )
            .await?;

        let seed = Query::insert()
            .into_table(AuthorSettings::Table)
            .columns([
                AuthorSettings::Id,
                AuthorSettings::BlogTitle,
                AuthorSettings::AuthorName,
            ])
            .values([1.into(), "Campus Blog".into(), "Campus Author".into()])
            .map_err(|e| DbErr::Custom(e.to_string()))?
            .to_owned();
        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthorSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Articles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Articles {
    Table,
    Id,
    Title,
    Content,
    Status,
    Reads,
    Likes,
    CreatedAt,
    LastModified,
    PublishedAt,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    ArticleId,
    UserId,
    CommenterName,
    Content,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuthorSettings {
    Table,
    Id,
    BlogTitle,
    AuthorName,
}
