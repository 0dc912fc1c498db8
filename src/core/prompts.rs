//! Prompt templates for SQL generation and answer phrasing.
//!
//! The templates carry the business rules of the demo dataset: how active,
//! dormant and cancelled users are defined, and how the model is expected
//! to use the status flags. Changing these strings changes the assistant's
//! behavior more than any code in this crate.

use crate::core::session::TurnRecord;
use crate::infrastructure::traits::{PromptMessage, Role};
use minijinja::{Environment, context};

/// Fallback schema description, used when live introspection fails.
pub const STATIC_SCHEMA: &str = r#"Table users {
    user_id INTEGER [pk]
    name TEXT [not null]
    email TEXT [unique]
    registration_date TEXT [not null]
    is_active INTEGER [default: 1]
    is_dormant INTEGER [default: 0]
    is_cancelled INTEGER [default: 0]
    last_activity_date TEXT
}

Table categories {
    category_id INTEGER [pk]
    category_name TEXT [not null, unique]
}

Table purchases {
    purchase_id INTEGER [pk]
    user_id INTEGER [ref: > users.user_id, not null]
    amount REAL [not null]
    purchase_date TEXT [not null]
    category_id INTEGER [ref: > categories.category_id, not null]
}
"#;

/// Dataset semantics appended to whichever schema description is in use.
pub const SCHEMA_NOTES: &str = r#"Note:
- is_active: 1 for active, 0 for inactive (do not use this flag to determine if a user is active)
- is_dormant: 1 for dormant, 0 for not dormant (do not use this flag to determine if a user is dormant)
- is_cancelled: 1 for cancelled, 0 for not cancelled
- Active users: users who made at least one purchase in the specified time period and are not cancelled
- Dormant users: users with no purchases in the specified time period (typically 90 days) and not cancelled
- Cancelled users: is_cancelled = 1
- purchase_date and registration_date format: 'YYYY-MM-DD'
"#;

const SQL_PROMPT_TEMPLATE: &str = r#"You are a SQL expert. Given the following database schema and a question,
generate a SQL query that answers the question.

Database Schema:
{{ schema }}

{{ notes }}

Important guidelines:
1. Always exclude cancelled users (is_cancelled = 1) unless explicitly asked to include them.
2. For time-based queries, use date functions such as date(), datetime(), strftime().
3. For "active users", count users on a month-by-month basis. An active user in a given
   month is someone who has not cancelled (is_cancelled = 0) and made at least one
   purchase during that specific month. A user can be active in April, dormant in May,
   and active again in June. Do NOT filter by is_active.

   Example query for monthly active users over the past 6 months:
   ```
   WITH month_list AS (
     SELECT date('now', 'start of month', '-5 months') AS month_start,
            date('now', 'start of month', '-4 months', '-1 day') AS month_end
     UNION ALL SELECT date('now', 'start of month', '-4 months'),
                      date('now', 'start of month', '-3 months', '-1 day')
     UNION ALL SELECT date('now', 'start of month', '-3 months'),
                      date('now', 'start of month', '-2 months', '-1 day')
     UNION ALL SELECT date('now', 'start of month', '-2 months'),
                      date('now', 'start of month', '-1 months', '-1 day')
     UNION ALL SELECT date('now', 'start of month', '-1 months'),
                      date('now', 'start of month', '-1 day')
     UNION ALL SELECT date('now', 'start of month'),
                      date('now', 'start of month', '+1 month', '-1 day')
   )
   SELECT strftime('%Y-%m', m.month_start) AS month,
          COUNT(DISTINCT p.user_id) AS active_users
   FROM month_list m
   LEFT JOIN purchases p
     ON p.purchase_date >= m.month_start AND p.purchase_date <= m.month_end
   JOIN users u ON u.user_id = p.user_id AND u.is_cancelled = 0
   GROUP BY month
   ORDER BY month;
   ```

   For the monthly average purchase amount per active user, divide the total
   purchase amount by the number of distinct active users in each month,
   using the same month list:
   ```
   SELECT strftime('%Y-%m', m.month_start) AS month,
          CASE WHEN COUNT(DISTINCT p.user_id) = 0 THEN 0
               ELSE ROUND(SUM(p.amount) / COUNT(DISTINCT p.user_id), 2)
          END AS avg_purchase_amount
   FROM month_list m
   LEFT JOIN purchases p
     ON p.purchase_date >= m.month_start AND p.purchase_date <= m.month_end
   JOIN users u ON u.user_id = p.user_id AND u.is_cancelled = 0
   GROUP BY month
   ORDER BY month;
   ```
4. For "dormant users", count users who made no purchases in the period (typically the
   last 90 days) and are not cancelled. Do NOT use the is_dormant flag.

   Example query for dormant users:
   ```
   SELECT COUNT(DISTINCT u.user_id) AS dormant_users
   FROM users u
   WHERE u.is_cancelled = 0
     AND NOT EXISTS (
       SELECT 1 FROM purchases p
       WHERE p.user_id = u.user_id
         AND p.purchase_date >= date('now', '-90 days')
     );
   ```
5. For questions about high/medium/low spenders, aggregate purchase amounts per user
   first, then bucket with appropriate thresholds based on the data.
6. For questions about user preferences, look at their purchase categories.
7. Always qualify column names with table names or aliases, including in WHERE,
   GROUP BY and ORDER BY clauses and inside aggregate functions.
8. IMPORTANT: use the exact Japanese category names as stored in the database
   (e.g. '美容', '旅行', 'ペット'). DO NOT translate category names to English.
9. Return only the SQL query without any explanation or markdown.
{%- if history %}

Earlier questions in this conversation and the SQL that answered them:
{%- for turn in history %}
Question: {{ turn.question }}
SQL: {{ turn.sql }}
{%- endfor %}
{%- endif %}

Question: {{ question }}

SQL Query:"#;

const ANSWER_PROMPT_TEMPLATE: &str = r#"あなたはクレジットカード会社のマーケティング部門向けのアシスタントです。
ユーザーの質問に対して、SQLクエリを実行した結果を元に、日本語で丁寧に回答してください。

ユーザーの質問: {{ question }}

実行したSQLクエリ: {{ sql }}

クエリの結果: {{ result }}

以下のガイドラインに従って回答を作成してください：
1. 結果を明確に説明し、重要な数値や傾向を強調してください。
2. マーケティングの観点から、結果の意味や示唆を提供してください。
3. 専門用語は避け、わかりやすい言葉で説明してください。
4. 回答は日本語で提供してください。

回答:"#;

/// Template environment with both prompts registered.
pub fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.add_template("sql", SQL_PROMPT_TEMPLATE)
        .expect("sql prompt template must parse");
    env.add_template("answer", ANSWER_PROMPT_TEMPLATE)
        .expect("answer prompt template must parse");
    env
}

/// Renders the SQL-generation prompt as a single user message.
pub fn sql_prompt(
    env: &Environment<'_>,
    schema: &str,
    question: &str,
    history: &[TurnRecord],
) -> Result<Vec<PromptMessage>, minijinja::Error> {
    let history: Vec<minijinja::Value> = history
        .iter()
        .map(|t| context! { question => t.question, sql => t.sql })
        .collect();

    let prompt = env.get_template("sql")?.render(context! {
        schema => schema,
        notes => SCHEMA_NOTES,
        question => question,
        history => history,
    })?;

    Ok(vec![PromptMessage {
        role: Role::User,
        content: prompt,
    }])
}

/// Renders the Japanese answer-summary prompt.
pub fn answer_prompt(
    env: &Environment<'_>,
    question: &str,
    sql: &str,
    result: &str,
) -> Result<Vec<PromptMessage>, minijinja::Error> {
    let prompt = env.get_template("answer")?.render(context! {
        question => question,
        sql => sql,
        result => result,
    })?;

    Ok(vec![PromptMessage {
        role: Role::User,
        content: prompt,
    }])
}
