use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};
use tracing::info;

use crate::error::AppError;
use crate::models::Conversation;

/// Append-only store for chatbot exchanges
#[async_trait]
pub trait ConversationLog: Send + Sync {
    async fn append(&self, entry: &Conversation) -> Result<(), AppError>;
}

/// `conversations` table in sqlite or postgres
#[derive(Clone)]
pub struct SqlConversationLog {
    pool: AnyPool,
}

impl SqlConversationLog {
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        sqlx::any::install_default_drivers();
        let url = normalize_url(database_url);
        let pool = AnyPoolOptions::new()
            .max_connections(if url.starts_with("sqlite") { 1 } else { 5 })
            .connect(&url)
            .await?;
        let log = Self { pool };
        log.create_table(&url).await?;
        Ok(log)
    }

    async fn create_table(&self, url: &str) -> Result<(), AppError> {
        let id_column = if url.starts_with("postgres") {
            "id SERIAL PRIMARY KEY"
        } else {
            "id INTEGER PRIMARY KEY AUTOINCREMENT"
        };
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                {id_column},
                timestamp TEXT NOT NULL,
                user_question TEXT NOT NULL,
                bot_answer TEXT NOT NULL,
                session_id TEXT
            )
            "#
        ))
        .execute(&self.pool)
        .await?;
        info!("conversations table ready");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM conversations")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }
}

#[async_trait]
impl ConversationLog for SqlConversationLog {
    async fn append(&self, entry: &Conversation) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO conversations (timestamp, user_question, bot_answer, session_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&entry.timestamp)
        .bind(&entry.user_question)
        .bind(&entry.bot_answer)
        .bind(&entry.session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Hosted postgres hands out `postgres://`; both schemes are accepted.
fn normalize_url(url: &str) -> String {
    match url.strip_prefix("postgresql://") {
        Some(rest) => format!("postgres://{rest}"),
        None => url.to_string(),
    }
}
