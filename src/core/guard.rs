//! Read-only statement check.
//!
//! Generated SQL is executed verbatim, so anything that could mutate the
//! database is rejected before it reaches the driver. The check is a
//! keyword screen, not a parser: it must stay conservative.

use crate::errors::ExecutionError;

const MUTATING_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "truncate", "replace", "merge",
    "attach", "detach", "pragma", "vacuum", "reindex", "grant", "revoke",
];

/// Rejects statements that are not a single read-only query.
pub fn ensure_read_only(sql: &str) -> Result<(), ExecutionError> {
    let trimmed = sql.trim().trim_end_matches(';').trim();

    if trimmed.is_empty() {
        return Err(ExecutionError::Rejected("empty statement".to_owned()));
    }

    // One statement per turn. A second semicolon-separated statement could
    // smuggle a write past the leading-keyword check.
    if trimmed.contains(';') {
        return Err(ExecutionError::Rejected(
            "multiple statements are not allowed".to_owned(),
        ));
    }

    let first_word = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if first_word != "select" && first_word != "with" {
        return Err(ExecutionError::Rejected(format!(
            "only SELECT queries are allowed, got '{first_word}'"
        )));
    }

    // Mutating verbs anywhere in the statement (covers CTE bodies).
    for token in tokens(trimmed) {
        if MUTATING_KEYWORDS.contains(&token.as_str()) {
            return Err(ExecutionError::Rejected(format!(
                "mutating keyword '{token}' is not allowed"
            )));
        }
    }

    Ok(())
}

/// Lowercased word tokens outside of string literals. Identifiers keep
/// their underscores so `created_at` never matches `create`.
fn tokens(sql: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_string = false;

    for c in sql.chars() {
        if c == '\'' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        if c.is_alphanumeric() || c == '_' {
            current.push(c.to_ascii_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_select() {
        assert!(ensure_read_only("SELECT COUNT(*) FROM users WHERE is_cancelled = 0").is_ok());
    }

    #[test]
    fn test_accepts_cte_select() {
        let sql = "WITH totals AS (SELECT user_id, SUM(amount) AS total FROM purchases GROUP BY user_id) SELECT COUNT(*) FROM totals;";
        assert!(ensure_read_only(sql).is_ok());
    }

    #[test]
    fn test_rejects_delete() {
        assert!(matches!(
            ensure_read_only("DELETE FROM users"),
            Err(ExecutionError::Rejected(_))
        ));
    }

    #[test]
    fn test_rejects_update_inside_cte() {
        let sql = "WITH x AS (SELECT 1) UPDATE users SET is_cancelled = 1";
        assert!(ensure_read_only(sql).is_err());
    }

    #[test]
    fn test_rejects_stacked_statements() {
        let sql = "SELECT 1; SELECT 2";
        assert!(ensure_read_only(sql).is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(ensure_read_only("   ;  ").is_err());
    }

    #[test]
    fn test_identifier_containing_keyword_is_fine() {
        let sql = "SELECT registration_date, last_activity_date FROM users";
        assert!(ensure_read_only(sql).is_ok());
    }

    #[test]
    fn test_keyword_inside_string_literal_is_fine() {
        let sql = "SELECT COUNT(*) FROM categories WHERE category_name = 'update club'";
        assert!(ensure_read_only(sql).is_ok());
    }
}
