//! Query execution and schema description against the analytics database.

use crate::config::{DatabaseSettings, Settings};
use crate::core::guard;
use crate::core::prompts;
use crate::errors::ExecutionError;
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{CellValue, ResultSet};
use crate::infrastructure::traits::QueryRepository;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{debug, warn};
use sqlx::any::AnyRow;
use sqlx::{Column, Row};

// The Any driver forwards SQL to the backend verbatim, so placeholder
// syntax has to match the backend.
const POSTGRES_COLUMNS_QUERY: &str = "SELECT column_name, data_type FROM information_schema.columns WHERE table_name = $1 ORDER BY ordinal_position";
const MYSQL_COLUMNS_QUERY: &str = "SELECT column_name, data_type FROM information_schema.columns WHERE table_name = ? ORDER BY ordinal_position";

pub struct DbQueryRepository {
    connection: Ref<DatabaseConnection>,
    settings: Ref<Settings>,
}

#[injectable(QueryRepository)]
impl DbQueryRepository {
    #[inject]
    pub fn create(connection: Ref<DatabaseConnection>, settings: Ref<Settings>) -> DbQueryRepository {
        DbQueryRepository {
            connection,
            settings,
        }
    }
}

#[async_trait]
impl QueryRepository for DbQueryRepository {
    async fn run_sql(&self, sql: &str) -> Result<ResultSet, ExecutionError> {
        guard::ensure_read_only(sql)?;

        debug!("executing: {sql}");
        let rows = sqlx::query(sql).fetch_all(&**self.connection).await?;

        let mut result = ResultSet::default();
        if let Some(first) = rows.first() {
            result.columns = first
                .columns()
                .iter()
                .map(|c| c.name().to_owned())
                .collect();
        }
        for row in &rows {
            let cells = (0..row.columns().len())
                .map(|i| decode_cell(row, i))
                .collect();
            result.rows.push(cells);
        }

        Ok(result)
    }

    async fn describe_schema(&self) -> Result<String, ExecutionError> {
        match self.introspect().await {
            Ok(description) => Ok(description),
            Err(e) => {
                // The demo schema is known; a broken catalog query should
                // not take the whole turn down.
                warn!("schema introspection failed, using static description: {e}");
                Ok(prompts::STATIC_SCHEMA.to_owned())
            }
        }
    }
}

impl DbQueryRepository {
    async fn introspect(&self) -> Result<String, ExecutionError> {
        let tables = self.table_names().await?;

        let mut description = String::new();
        for table in &tables {
            let columns = self.table_columns(table).await?;
            description.push_str(&format!("Table {table} {{\n"));
            for (name, type_name) in columns {
                description.push_str(&format!("    {name} {type_name}\n"));
            }
            description.push_str("}\n\n");
        }

        if description.is_empty() {
            return Err(ExecutionError::Driver("no tables found".to_owned()));
        }
        Ok(description)
    }

    async fn table_names(&self) -> Result<Vec<String>, ExecutionError> {
        let query = match &self.settings.database {
            DatabaseSettings::Sqlite { .. } => {
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            }
            DatabaseSettings::Postgres { .. } => {
                "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public' ORDER BY table_name"
            }
            DatabaseSettings::Mysql { .. } => {
                "SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE() ORDER BY table_name"
            }
        };

        let rows = sqlx::query(query).fetch_all(&**self.connection).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(ExecutionError::from))
            .collect()
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<(String, String)>, ExecutionError> {
        match &self.settings.database {
            DatabaseSettings::Sqlite { .. } => {
                let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
                    .fetch_all(&**self.connection)
                    .await?;
                rows.iter()
                    .map(|row| {
                        let name: String = row.try_get("name")?;
                        let type_name: String = row.try_get("type")?;
                        Ok((name, type_name))
                    })
                    .collect()
            }
            DatabaseSettings::Postgres { .. } => {
                self.catalog_columns(POSTGRES_COLUMNS_QUERY, table).await
            }
            DatabaseSettings::Mysql { .. } => {
                self.catalog_columns(MYSQL_COLUMNS_QUERY, table).await
            }
        }
    }

    async fn catalog_columns(
        &self,
        query: &str,
        table: &str,
    ) -> Result<Vec<(String, String)>, ExecutionError> {
        let rows = sqlx::query(query)
            .bind(table)
            .fetch_all(&**self.connection)
            .await?;
        rows.iter()
            .map(|row| {
                let name: String = row.try_get(0)?;
                let type_name: String = row.try_get(1)?;
                Ok((name, type_name))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_queries_use_backend_placeholders() {
        assert!(POSTGRES_COLUMNS_QUERY.contains("$1"));
        assert!(!POSTGRES_COLUMNS_QUERY.contains('?'));
        assert!(MYSQL_COLUMNS_QUERY.contains('?'));
        assert!(!MYSQL_COLUMNS_QUERY.contains("$1"));
    }
}

/// Ordered decode probe: the `Any` driver exposes no portable column type
/// names, so each cell is tried as integer, real, boolean, then text.
fn decode_cell(row: &AnyRow, index: usize) -> CellValue {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(CellValue::Integer).unwrap_or(CellValue::Null);
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(CellValue::Real).unwrap_or(CellValue::Null);
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value
            .map(|b| CellValue::Integer(b as i64))
            .unwrap_or(CellValue::Null);
    }
    match row.try_get::<Option<String>, _>(index) {
        Ok(Some(value)) => CellValue::Text(value),
        _ => CellValue::Null,
    }
}
