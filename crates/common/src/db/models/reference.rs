//! Reference entity: a directed citation edge between two articles
//!
//! The graph is a general directed multigraph. Cycles occur in real data and
//! self-loops (cited_from_id == cited_to_id) are tolerated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "references")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Citing article
    pub cited_from_id: i32,

    /// Cited article
    pub cited_to_id: i32,

    /// Citation text
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Surrounding context of the citation
    #[sea_orm(column_type = "Text", nullable)]
    pub citation_content: Option<String>,

    pub if_key_reference: bool,

    pub if_secondary_reference: bool,

    /// 0-10, NULL until the scoring callout succeeds
    pub ai_rated_score: Option<i32>,

    /// Reviewer feedback
    #[sea_orm(column_type = "Text", nullable)]
    pub feedback: Option<String>,

    /// Citing author's note
    #[sea_orm(column_type = "Text", nullable)]
    pub author_comment: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::CitedFromId",
        to = "super::article::Column::Id",
        on_delete = "Cascade"
    )]
    CitingArticle,

    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::CitedToId",
        to = "super::article::Column::Id",
        on_delete = "Cascade"
    )]
    CitedArticle,
}

impl ActiveModelBehavior for ActiveModel {}
