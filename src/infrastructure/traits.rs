//! Infrastructure traits, used for DI on higher levels

use crate::errors::{ExecutionError, GenerationError};
use crate::infrastructure::entities::ResultSet;
use async_trait::async_trait;

/// One chat turn in the wire format the hosted model expects.
#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Client for the hosted language model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one completion request and returns the raw model text.
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, GenerationError>;
}

/// Read-only access to the analytics database.
#[async_trait]
pub trait QueryRepository: Send + Sync {
    /// Executes the SQL text as-is and returns the decoded rows.
    async fn run_sql(&self, sql: &str) -> Result<ResultSet, ExecutionError>;

    /// Table/column metadata as a schema description string for the
    /// generation prompt.
    async fn describe_schema(&self) -> Result<String, ExecutionError>;
}
