//! Grouping and batching for §4.C8 phase 6 ("Split"): partition rows by
//! `split_key_column`, falling back to the literal key `"unknown"`, then
//! chunk each group into `batch_size`-row batches.

use reef_types::{ColumnValue, Row};

pub struct SplitGroup {
    pub split_key: String,
    pub rows: Vec<Row>,
}

/// Group `rows` by the text value of `split_key_column`, preserving first-
/// seen group order. Rows missing the column, or holding a non-text value
/// in it, fall into the `"unknown"` group.
pub fn group_by_split_key(rows: Vec<Row>, split_key_column: &str) -> Vec<SplitGroup> {
    let mut groups: Vec<SplitGroup> = Vec::new();
    for row in rows {
        let key = match row.get(split_key_column) {
            Some(ColumnValue::Text(s)) => s.clone(),
            _ => "unknown".to_string(),
        };
        match groups.iter_mut().find(|g| g.split_key == key) {
            Some(group) => group.rows.push(row),
            None => groups.push(SplitGroup { split_key: key, rows: vec![row] }),
        }
    }
    groups
}

/// Chunk one group's rows into `batch_size`-row batches (`0` means "one
/// batch holding everything").
pub fn batch(rows: Vec<Row>, batch_size: u32) -> Vec<Vec<Row>> {
    if batch_size == 0 {
        return vec![rows];
    }
    rows.chunks(batch_size as usize).map(|chunk| chunk.to_vec()).collect()
}
