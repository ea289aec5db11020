use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// Where a listing is in the offer lifecycle.
///
/// The lifecycle only moves forward:
/// `not made` -> `made` -> `in progress` -> `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum OfferStatus {
    #[sea_orm(string_value = "not made")]
    NotMade,
    #[sea_orm(string_value = "made")]
    Made,
    #[sea_orm(string_value = "in progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl OfferStatus {
    /// The state a listing must currently be in to move to `self`.
    pub fn previous(self) -> Option<Self> {
        match self {
            OfferStatus::NotMade => None,
            OfferStatus::Made => Some(OfferStatus::NotMade),
            OfferStatus::InProgress => Some(OfferStatus::Made),
            OfferStatus::Completed => Some(OfferStatus::InProgress),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OfferStatus::NotMade => "not made",
            OfferStatus::Made => "made",
            OfferStatus::InProgress => "in progress",
            OfferStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item listed by a user.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owner of the listing.
    pub user_id: i32,
    pub name: String,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub category: String,
    /// Comma-joined multi-select, e.g. "Sell, Trade".
    pub transaction_type: String,
    pub condition: String,
    #[sea_orm(default_value = "true")]
    pub availability: bool,
    pub offer_status: OfferStatus,
    pub offer_made_by: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OfferMadeBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    OfferMaker,
    #[sea_orm(has_many = "super::product_image::Entity")]
    ProductImage,
    #[sea_orm(has_many = "super::favourite::Entity")]
    Favourite,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductImage.def()
    }
}

impl Related<super::favourite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favourite.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
