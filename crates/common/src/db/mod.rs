//! Database layer for Citequill
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management
//! - Idempotent schema bootstrap

pub mod models;
mod repository;

pub use repository::{
    join_display_list, split_display_list, ArticleSummary, AuthorChanges, NewReference,
    ReferenceChanges, Repository,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Schema DDL applied at startup. Every statement is idempotent so repeated
/// boots against the same database are safe.
const SCHEMA_DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS authors (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        institute TEXT,
        job TEXT,
        password_hash TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id SERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        published_journal TEXT NOT NULL,
        published_date DATE NOT NULL DEFAULT CURRENT_DATE,
        author_names TEXT NOT NULL,
        subject TEXT,
        keywords TEXT,
        corresponding_author_id INTEGER NOT NULL REFERENCES authors(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS author_articles (
        author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
        article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
        author_order INTEGER,
        PRIMARY KEY (author_id, article_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "references" (
        id SERIAL PRIMARY KEY,
        cited_from_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
        cited_to_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        citation_content TEXT,
        if_key_reference BOOLEAN NOT NULL,
        if_secondary_reference BOOLEAN NOT NULL,
        ai_rated_score INTEGER,
        feedback TEXT,
        author_comment TEXT
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_references_cited_from ON "references" (cited_from_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_references_cited_to ON "references" (cited_to_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_author_articles_article ON author_articles (article_id)"#,
];

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(true);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply the schema DDL
    pub async fn bootstrap_schema(&self) -> Result<()> {
        for ddl in SCHEMA_DDL {
            self.conn
                .execute_unprepared(ddl)
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Schema bootstrap failed: {}", e),
                })?;
        }

        info!("Schema bootstrap complete");
        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}
