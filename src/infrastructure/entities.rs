//! Typed query result model.
//!
//! Generated SQL comes back from the driver as untyped rows; they are
//! decoded into an ordered column list plus typed cells before anything
//! else touches them.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CellValue {
    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Integer(_) | CellValue::Real(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Real(v) => {
                if v.fract() == 0.0 {
                    write!(f, "{v:.0}")
                } else {
                    write!(f, "{v:.2}")
                }
            }
            CellValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// An ordered set of rows as returned by the executor.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when the result is a single scalar cell.
    pub fn is_scalar(&self) -> bool {
        self.rows.len() == 1 && self.columns.len() == 1
    }

    /// Interprets the result as a labelled numeric series: first column as
    /// labels, second column as values. This is the shape charts are drawn
    /// from (month/count pairs, tier/count pairs and so on).
    pub fn as_series(&self) -> Option<Vec<(String, f64)>> {
        if self.columns.len() < 2 || self.rows.len() < 2 {
            return None;
        }
        let mut series = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let label = row.first()?.to_string();
            let value = row.get(1)?.as_f64()?;
            series.push((label, value));
        }
        Some(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_set() -> ResultSet {
        ResultSet {
            columns: vec!["month".to_owned(), "active_users".to_owned()],
            rows: vec![
                vec![
                    CellValue::Text("2026-01".to_owned()),
                    CellValue::Integer(812),
                ],
                vec![
                    CellValue::Text("2026-02".to_owned()),
                    CellValue::Integer(790),
                ],
            ],
        }
    }

    #[test]
    fn test_series_shape_detected() {
        let series = series_set().as_series().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0], ("2026-01".to_owned(), 812.0));
    }

    #[test]
    fn test_scalar_is_not_a_series() {
        let set = ResultSet {
            columns: vec!["count".to_owned()],
            rows: vec![vec![CellValue::Integer(42)]],
        };
        assert!(set.is_scalar());
        assert!(set.as_series().is_none());
    }

    #[test]
    fn test_non_numeric_second_column_is_not_a_series() {
        let set = ResultSet {
            columns: vec!["name".to_owned(), "email".to_owned()],
            rows: vec![
                vec![
                    CellValue::Text("佐藤 太郎".to_owned()),
                    CellValue::Text("sato@example.com".to_owned()),
                ],
                vec![
                    CellValue::Text("鈴木 花子".to_owned()),
                    CellValue::Text("suzuki@example.com".to_owned()),
                ],
            ],
        };
        assert!(set.as_series().is_none());
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Integer(3).to_string(), "3");
        assert_eq!(CellValue::Real(1234.5).to_string(), "1234.50");
        assert_eq!(CellValue::Real(1200.0).to_string(), "1200");
        assert_eq!(CellValue::Null.to_string(), "");
    }
}
