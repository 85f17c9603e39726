//! Article entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(column_type = "Text")]
    pub published_journal: String,

    pub published_date: Date,

    /// Denormalized comma-joined author display string. The link rows in
    /// author_articles are the source of truth; this is a derived cache
    /// recomputed on every write, never hand-edited.
    #[sea_orm(column_type = "Text")]
    pub author_names: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub subject: Option<String>,

    /// Denormalized comma-joined keyword string
    #[sea_orm(column_type = "Text", nullable)]
    pub keywords: Option<String>,

    pub corresponding_author_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::author::Entity",
        from = "Column::CorrespondingAuthorId",
        to = "super::author::Column::Id"
    )]
    CorrespondingAuthor,

    #[sea_orm(has_many = "super::author_article::Entity")]
    AuthorLinks,
}

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CorrespondingAuthor.def()
    }
}

impl Related<super::author_article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthorLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
