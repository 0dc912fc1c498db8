//! LLM-backed SQL generation.

use crate::core::prompts;
use crate::core::session::TurnRecord;
use crate::core::traits::SqlGenerator;
use crate::errors::GenerationError;
use crate::infrastructure::traits::LlmClient;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::warn;
use minijinja::Environment;

pub struct LlmSqlGenerator {
    client: Ref<dyn LlmClient>,
    env: Environment<'static>,
}

#[injectable(SqlGenerator)]
impl LlmSqlGenerator {
    #[inject]
    pub fn create(client: Ref<dyn LlmClient>) -> LlmSqlGenerator {
        LlmSqlGenerator {
            client,
            env: prompts::environment(),
        }
    }
}

#[async_trait]
impl SqlGenerator for LlmSqlGenerator {
    async fn generate(
        &self,
        question: &str,
        schema_description: &str,
        history: &[TurnRecord],
    ) -> Result<String, GenerationError> {
        let messages = prompts::sql_prompt(&self.env, schema_description, question, history)?;

        let raw = match self.client.complete(&messages).await {
            Ok(raw) => raw,
            Err(first) => {
                // One immediate re-attempt, nothing beyond that.
                warn!("generation failed, retrying once: {first}");
                self.client.complete(&messages).await?
            }
        };

        let sql = strip_code_fences(&raw);
        if sql.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(sql)
    }
}

/// Removes a surrounding markdown code fence, which models add despite
/// being told not to.
fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("```sql")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::PromptMessage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedLlm {
        responses: Vec<Result<String, String>>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<Result<String, String>>) -> Ref<dyn LlmClient> {
            Ref::new(ScriptedLlm {
                responses,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _: &[PromptMessage]) -> Result<String, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(call) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(e)) => Err(GenerationError::Provider(e.clone())),
                None => panic!("unexpected extra model call"),
            }
        }
    }

    fn generator(client: Ref<dyn LlmClient>) -> LlmSqlGenerator {
        LlmSqlGenerator {
            client,
            env: prompts::environment(),
        }
    }

    #[tokio::test]
    async fn test_generate_returns_model_sql() {
        let g = generator(ScriptedLlm::new(vec![Ok(
            "SELECT COUNT(*) FROM users".to_owned()
        )]));
        let sql = g
            .generate("ユーザ数は？", prompts::STATIC_SCHEMA, &[])
            .await
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM users");
    }

    #[tokio::test]
    async fn test_generate_strips_fences() {
        let g = generator(ScriptedLlm::new(vec![Ok(
            "```sql\nSELECT 1;\n```".to_owned()
        )]));
        let sql = g.generate("q", prompts::STATIC_SCHEMA, &[]).await.unwrap();
        assert_eq!(sql, "SELECT 1;");
    }

    #[tokio::test]
    async fn test_generate_retries_once_then_succeeds() {
        let g = generator(ScriptedLlm::new(vec![
            Err("timeout".to_owned()),
            Ok("SELECT 2".to_owned()),
        ]));
        let sql = g.generate("q", prompts::STATIC_SCHEMA, &[]).await.unwrap();
        assert_eq!(sql, "SELECT 2");
    }

    #[tokio::test]
    async fn test_generate_fails_after_second_error() {
        let g = generator(ScriptedLlm::new(vec![
            Err("down".to_owned()),
            Err("still down".to_owned()),
        ]));
        let err = g.generate("q", prompts::STATIC_SCHEMA, &[]).await;
        assert!(matches!(err, Err(GenerationError::Provider(_))));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_text() {
        let g = generator(ScriptedLlm::new(vec![Ok("```\n```".to_owned())]));
        let err = g.generate("q", prompts::STATIC_SCHEMA, &[]).await;
        assert!(matches!(err, Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn test_strip_code_fences_passthrough() {
        assert_eq!(strip_code_fences("SELECT 1"), "SELECT 1");
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```\nSELECT 1\n```"), "SELECT 1");
    }
}
