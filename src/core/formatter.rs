//! Reply construction for executed queries.
//!
//! The deterministic rendering of the rows is always produced; the hosted
//! model only adds a phrased summary on top, and the chart only an image.
//! Neither is allowed to fail the turn.

use crate::core::charts;
use crate::core::prompts;
use crate::core::traits::{AnswerFormatter, TurnReply};
use crate::errors::FormattingError;
use crate::infrastructure::entities::ResultSet;
use crate::infrastructure::traits::LlmClient;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::warn;
use minijinja::Environment;

const NO_RESULTS_MESSAGE: &str =
    "ご質問の条件に該当するデータは見つかりませんでした。条件を変えてもう一度お試しください。";

pub struct ReplyFormatter {
    client: Ref<dyn LlmClient>,
    env: Environment<'static>,
    render_chart: fn(charts::ChartKind, &ResultSet) -> Result<Vec<u8>, FormattingError>,
}

#[injectable(AnswerFormatter)]
impl ReplyFormatter {
    #[inject]
    pub fn create(client: Ref<dyn LlmClient>) -> ReplyFormatter {
        ReplyFormatter {
            client,
            env: prompts::environment(),
            render_chart: charts::render,
        }
    }
}

#[async_trait]
impl AnswerFormatter for ReplyFormatter {
    async fn format(&self, question: &str, sql: &str, rows: &ResultSet) -> TurnReply {
        if rows.is_empty() {
            return TurnReply {
                answer: NO_RESULTS_MESSAGE.to_owned(),
                sql: Some(sql.to_owned()),
                chart_png: None,
            };
        }

        let rendered = render_rows(rows);

        let answer = match self.summarize(question, sql, &rendered).await {
            Ok(summary) => format!("{summary}\n\n{rendered}"),
            Err(e) => {
                warn!("{e}");
                rendered.clone()
            }
        };

        let chart_png = match charts::chart_kind(question, rows) {
            Some(kind) => match (self.render_chart)(kind, rows) {
                Ok(png) => Some(png),
                Err(e) => {
                    warn!("{e}");
                    None
                }
            },
            None => None,
        };

        TurnReply {
            answer,
            sql: Some(sql.to_owned()),
            chart_png,
        }
    }
}

impl ReplyFormatter {
    /// Marketing-style Japanese phrasing of the result. The caller falls
    /// back to the deterministic rendering on any failure.
    async fn summarize(
        &self,
        question: &str,
        sql: &str,
        rendered: &str,
    ) -> Result<String, FormattingError> {
        let messages = prompts::answer_prompt(&self.env, question, sql, rendered)
            .map_err(|e| FormattingError::Summary(e.to_string()))?;

        let summary = self
            .client
            .complete(&messages)
            .await
            .map_err(|e| FormattingError::Summary(e.to_string()))?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(FormattingError::Summary("model returned empty text".to_owned()));
        }
        Ok(summary.to_owned())
    }
}

/// Deterministic rendering: a sentence for a scalar, a markdown table
/// otherwise. Row count is not capped.
pub fn render_rows(rows: &ResultSet) -> String {
    if rows.is_scalar() {
        return format!("{} は {} です。", rows.columns[0], rows.rows[0][0]);
    }

    let mut out = String::new();
    out.push_str("| ");
    out.push_str(&rows.columns.join(" | "));
    out.push_str(" |\n|");
    for _ in &rows.columns {
        out.push_str(" --- |");
    }
    out.push('\n');
    for row in &rows.rows {
        out.push_str("| ");
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GenerationError;
    use crate::infrastructure::entities::CellValue;
    use crate::infrastructure::traits::PromptMessage;

    struct FixedLlm(Result<String, ()>);

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, _: &[PromptMessage]) -> Result<String, GenerationError> {
            self.0
                .clone()
                .map_err(|_| GenerationError::Provider("unavailable".to_owned()))
        }
    }

    fn formatter(llm: FixedLlm) -> ReplyFormatter {
        ReplyFormatter {
            client: Ref::new(llm),
            env: prompts::environment(),
            render_chart: charts::render,
        }
    }

    fn monthly_series(points: usize) -> ResultSet {
        ResultSet {
            columns: vec!["month".to_owned(), "active_users".to_owned()],
            rows: (0..points)
                .map(|i| {
                    vec![
                        CellValue::Text(format!("2025-{:02}", i + 1)),
                        CellValue::Integer(700 + i as i64),
                    ]
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_empty_result_gets_explicit_message() {
        let f = formatter(FixedLlm(Ok("summary".to_owned())));
        let reply = f
            .format("ペットカテゴリの人数は？", "SELECT 1", &ResultSet::default())
            .await;
        assert_eq!(reply.answer, NO_RESULTS_MESSAGE);
        assert!(reply.chart_png.is_none());
        assert_eq!(reply.sql.as_deref(), Some("SELECT 1"));
    }

    #[tokio::test]
    async fn test_series_reply_has_chart_and_all_values() {
        let f = formatter(FixedLlm(Ok("アクティブ者数は増加傾向です。".to_owned())));
        let rows = monthly_series(12);
        let reply = f
            .format("アクティブ者数の推移を教えて", "SELECT ...", &rows)
            .await;

        assert!(reply.chart_png.is_some());
        assert!(reply.answer.contains("アクティブ者数は増加傾向です。"));
        // Every numeric value stays in the text even with a chart attached.
        for i in 0..12 {
            assert!(reply.answer.contains(&format!("{}", 700 + i)));
        }
    }

    #[tokio::test]
    async fn test_summary_failure_falls_back_to_table() {
        let f = formatter(FixedLlm(Err(())));
        let rows = monthly_series(12);
        let reply = f
            .format("アクティブ者数の推移を教えて", "SELECT ...", &rows)
            .await;

        // Chart still rendered, values still listed, no summary prefix.
        assert!(reply.chart_png.is_some());
        assert!(reply.answer.starts_with("| month"));
        for i in 0..12 {
            assert!(reply.answer.contains(&format!("{}", 700 + i)));
        }
    }

    #[tokio::test]
    async fn test_chart_failure_keeps_values_in_text() {
        let f = ReplyFormatter {
            client: Ref::new(FixedLlm(Ok("増加傾向です。".to_owned()))),
            env: prompts::environment(),
            render_chart: |_, _| Err(FormattingError::Chart("render backend failed".to_owned())),
        };
        let rows = monthly_series(12);
        let reply = f
            .format("アクティブ者数の推移を教えて", "SELECT ...", &rows)
            .await;

        assert!(reply.chart_png.is_none());
        assert!(reply.answer.contains("増加傾向です。"));
        for i in 0..12 {
            assert!(reply.answer.contains(&format!("{}", 700 + i)));
        }
    }

    #[tokio::test]
    async fn test_scalar_result_is_a_sentence() {
        let f = formatter(FixedLlm(Err(())));
        let rows = ResultSet {
            columns: vec!["dormant_users".to_owned()],
            rows: vec![vec![CellValue::Integer(1498)]],
        };
        let reply = f.format("休眠ユーザ数は？", "SELECT ...", &rows).await;
        assert_eq!(reply.answer, "dormant_users は 1498 です。");
        assert!(reply.chart_png.is_none());
    }

    #[test]
    fn test_render_rows_table_shape() {
        let rows = monthly_series(2);
        let table = render_rows(&rows);
        assert!(table.starts_with("| month | active_users |"));
        assert!(table.contains("| 2025-01 | 700 |"));
        assert!(table.contains("| 2025-02 | 701 |"));
    }
}
