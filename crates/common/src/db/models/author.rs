//! Author entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "authors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text", unique)]
    pub email: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub institute: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub job: Option<String>,

    /// Argon2 PHC string; never serialized out
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::author_article::Entity")]
    ArticleLinks,
}

impl Related<super::author_article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ArticleLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
