use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single cell value from a database row or parsed import row.
///
/// This is a deliberately small, driver-agnostic representation: the
/// concrete SQL Server/MySQL/PostgreSQL clients are out of scope (§1), so
/// `reef-delta` and `reef-pipeline` operate over this enum instead of a
/// driver's native row type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

/// A single row, as an ordered-by-column-name map so hashing (§4.C2,
/// §4.C4) is independent of the order columns were selected in.
pub type Row = BTreeMap<String, ColumnValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_is_ordered_by_column_name() {
        let mut row: Row = Row::new();
        row.insert("zeta".into(), ColumnValue::Int(1));
        row.insert("alpha".into(), ColumnValue::Int(2));
        let keys: Vec<_> = row.keys().cloned().collect();
        assert_eq!(keys, vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
