//! DI "Interfaces"

use crate::core::session::TurnRecord;
use crate::errors::GenerationError;
use crate::infrastructure::entities::ResultSet;
use async_trait::async_trait;
use uuid::Uuid;

/// What one turn sends back to the chat surface.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub answer: String,
    /// The generated SQL, present whenever generation succeeded (also on
    /// execution failure, so the user can see what was attempted).
    pub sql: Option<String>,
    /// Rendered chart image, when the result had a chartable shape.
    pub chart_png: Option<Vec<u8>>,
}

impl TurnReply {
    pub fn text_only(answer: String) -> TurnReply {
        TurnReply {
            answer,
            sql: None,
            chart_png: None,
        }
    }
}

#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Translates a natural-language question into a single SQL statement.
    ///
    /// Retries the hosted call once; a second failure surfaces as
    /// `GenerationError`.
    async fn generate(
        &self,
        question: &str,
        schema_description: &str,
        history: &[TurnRecord],
    ) -> Result<String, GenerationError>;
}

#[async_trait]
pub trait AnswerFormatter: Send + Sync {
    /// Builds the reply for a successfully executed query.
    ///
    /// Never fails: summary and chart problems degrade to a plain textual
    /// rendering of the rows.
    async fn format(&self, question: &str, sql: &str, rows: &ResultSet) -> TurnReply;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Runs one full turn: generation, execution, formatting.
    ///
    /// Failures produce a user-visible error reply, never an `Err` that
    /// could take the session down.
    async fn process_turn(&self, session_id: Uuid, question: &str) -> TurnReply;
}
