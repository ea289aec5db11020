use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;

/// A registered member of the marketplace.
///
/// `password_hash` holds an argon2 PHC string and must never leave the server.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub course: String,
    pub description: String,
    /// Floor of the mean stars received, 0 when there are no reviews.
    #[sea_orm(default_value = "0")]
    pub rating: i32,
    pub image: Option<Vec<u8>>,
    pub image_type: Option<String>,
    /// Grants access to the blog author area.
    #[sea_orm(default_value = "false")]
    pub authorised: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product::Entity")]
    Product,
    #[sea_orm(has_many = "super::favourite::Entity")]
    Favourite,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::favourite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favourite.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
