//! Implementations for the service the app needs.
//!

use crate::core::session::SessionStore;
use crate::core::traits::{AnswerFormatter, ChatService, SqlGenerator, TurnReply};
use crate::infrastructure::traits::QueryRepository;
use async_trait::async_trait;
use di::{Ref, injectable};
use log::{error, info};
use std::fmt;
use uuid::Uuid;

/// Where a turn currently is. Used for logs and failure messages; a turn
/// always moves Generation -> Execution -> Formatting or short-circuits
/// back to idle with an error reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnStage {
    Generation,
    Execution,
    Formatting,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnStage::Generation => write!(f, "generation"),
            TurnStage::Execution => write!(f, "execution"),
            TurnStage::Formatting => write!(f, "formatting"),
        }
    }
}

#[injectable(ChatService)]
pub struct AnalyticsChatService {
    generator: Ref<dyn SqlGenerator>,
    repo: Ref<dyn QueryRepository>,
    formatter: Ref<dyn AnswerFormatter>,
    sessions: Ref<SessionStore>,
}

#[async_trait]
impl ChatService for AnalyticsChatService {
    async fn process_turn(&self, session_id: Uuid, question: &str) -> TurnReply {
        info!("session {session_id}: turn started");

        // Schema description comes from the same connection the query will
        // run on; a hard failure here is an execution-side problem.
        let schema = match self.repo.describe_schema().await {
            Ok(schema) => schema,
            Err(e) => {
                error!("session {session_id}: {} failed: {e}", TurnStage::Execution);
                return TurnReply::text_only(apology(TurnStage::Execution, &e.to_string()));
            }
        };

        let history = self.sessions.history(session_id);

        let sql = match self.generator.generate(question, &schema, &history).await {
            Ok(sql) => sql,
            Err(e) => {
                error!("session {session_id}: {} failed: {e}", TurnStage::Generation);
                return TurnReply::text_only(apology(TurnStage::Generation, &e.to_string()));
            }
        };

        let rows = match self.repo.run_sql(&sql).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("session {session_id}: {} failed: {e}", TurnStage::Execution);
                return TurnReply {
                    answer: apology(TurnStage::Execution, &e.to_string()),
                    sql: Some(sql),
                    chart_png: None,
                };
            }
        };

        // Formatting never fails the turn.
        let reply = self.formatter.format(question, &sql, &rows).await;

        self.sessions
            .record(session_id, question.to_owned(), sql);
        info!(
            "session {session_id}: turn completed ({} rows)",
            rows.row_count()
        );

        reply
    }
}

/// User-visible failure message: stage plus reason, never a stack trace.
fn apology(stage: TurnStage, reason: &str) -> String {
    match stage {
        TurnStage::Generation => format!(
            "申し訳ありません。SQLクエリの生成中にエラーが発生しました: {reason}"
        ),
        TurnStage::Execution => format!(
            "申し訳ありません。クエリの実行中にエラーが発生しました: {reason}"
        ),
        TurnStage::Formatting => format!(
            "申し訳ありません。回答の整形中にエラーが発生しました: {reason}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::TurnRecord;
    use crate::errors::{ExecutionError, GenerationError};
    use crate::infrastructure::entities::{CellValue, ResultSet};

    struct StubGenerator(Result<String, ()>);
    struct StubRepo(Result<ResultSet, String>);
    struct StubFormatter;

    #[async_trait]
    impl SqlGenerator for StubGenerator {
        async fn generate(
            &self,
            _: &str,
            _: &str,
            _: &[TurnRecord],
        ) -> Result<String, GenerationError> {
            self.0
                .clone()
                .map_err(|_| GenerationError::Provider("model down".to_owned()))
        }
    }

    #[async_trait]
    impl QueryRepository for StubRepo {
        async fn run_sql(&self, _: &str) -> Result<ResultSet, ExecutionError> {
            self.0
                .clone()
                .map_err(ExecutionError::Driver)
        }

        async fn describe_schema(&self) -> Result<String, ExecutionError> {
            Ok("Table users { user_id INTEGER }".to_owned())
        }
    }

    #[async_trait]
    impl AnswerFormatter for StubFormatter {
        async fn format(&self, _: &str, sql: &str, rows: &ResultSet) -> TurnReply {
            TurnReply {
                answer: format!("{} rows", rows.row_count()),
                sql: Some(sql.to_owned()),
                chart_png: None,
            }
        }
    }

    fn service(
        generator: StubGenerator,
        repo: StubRepo,
    ) -> (AnalyticsChatService, Ref<SessionStore>) {
        let sessions = Ref::new(SessionStore::default());
        let service = AnalyticsChatService {
            generator: Ref::new(generator),
            repo: Ref::new(repo),
            formatter: Ref::new(StubFormatter),
            sessions: sessions.clone(),
        };
        (service, sessions)
    }

    fn one_row() -> ResultSet {
        ResultSet {
            columns: vec!["count".to_owned()],
            rows: vec![vec![CellValue::Integer(7)]],
        }
    }

    #[tokio::test]
    async fn test_successful_turn_records_history() {
        let (service, sessions) = service(
            StubGenerator(Ok("SELECT COUNT(*) FROM users".to_owned())),
            StubRepo(Ok(one_row())),
        );
        let session_id = Uuid::new_v4();

        let reply = service.process_turn(session_id, "ユーザ数は？").await;
        assert_eq!(reply.answer, "1 rows");
        assert_eq!(reply.sql.as_deref(), Some("SELECT COUNT(*) FROM users"));

        let history = sessions.history(session_id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "ユーザ数は？");
    }

    #[tokio::test]
    async fn test_generation_failure_becomes_apology() {
        let (service, sessions) = service(StubGenerator(Err(())), StubRepo(Ok(one_row())));
        let session_id = Uuid::new_v4();

        let reply = service.process_turn(session_id, "q").await;
        assert!(reply.answer.contains("SQLクエリの生成中にエラー"));
        assert!(reply.sql.is_none());
        // Failed turns leave no history behind.
        assert!(sessions.history(session_id).is_empty());
    }

    #[tokio::test]
    async fn test_execution_failure_keeps_sql_in_reply() {
        let (service, sessions) = service(
            StubGenerator(Ok("SELECT * FROM missing".to_owned())),
            StubRepo(Err("no such table: missing".to_owned())),
        );
        let session_id = Uuid::new_v4();

        let reply = service.process_turn(session_id, "q").await;
        assert!(reply.answer.contains("クエリの実行中にエラー"));
        assert!(reply.answer.contains("no such table"));
        assert_eq!(reply.sql.as_deref(), Some("SELECT * FROM missing"));
        assert!(sessions.history(session_id).is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_does_not_poison_the_next() {
        let (failing, _) = service(StubGenerator(Err(())), StubRepo(Ok(one_row())));
        let session_id = Uuid::new_v4();
        let _ = failing.process_turn(session_id, "q1").await;

        let (working, _) = service(
            StubGenerator(Ok("SELECT 1".to_owned())),
            StubRepo(Ok(one_row())),
        );
        let reply = working.process_turn(session_id, "q2").await;
        assert_eq!(reply.answer, "1 rows");
    }
}
