//! SeaORM entity models
//!
//! Database entities for the citation graph

mod article;
mod author;
mod author_article;
mod reference;

pub use author::{
    ActiveModel as AuthorActiveModel, Column as AuthorColumn, Entity as AuthorEntity,
    Model as Author,
};

pub use article::{
    ActiveModel as ArticleActiveModel, Column as ArticleColumn, Entity as ArticleEntity,
    Model as Article,
};

pub use author_article::{
    ActiveModel as AuthorArticleActiveModel, Column as AuthorArticleColumn,
    Entity as AuthorArticleEntity, Model as AuthorArticle,
};

pub use reference::{
    ActiveModel as ReferenceActiveModel, Column as ReferenceColumn, Entity as ReferenceEntity,
    Model as Reference,
};
