use reef_types::{ColumnValue, Row};

/// One group of rows destined for a single email (§4.C11 grouping rules).
#[derive(Debug, Clone)]
pub struct EmailGroup {
    pub split_key: Option<String>,
    pub rows: Vec<Row>,
}

fn column_as_string(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        ColumnValue::Null => None,
        ColumnValue::Bool(b) => Some(b.to_string()),
        ColumnValue::Int(i) => Some(i.to_string()),
        ColumnValue::Float(f) => Some(f.to_string()),
        ColumnValue::Text(s) => Some(s.clone()),
        ColumnValue::Bytes(_) => None,
        ColumnValue::Timestamp(t) => Some(t.to_rfc3339()),
    }
}

/// Apply §4.C11's grouping rules:
/// 1. `split_key_column` set → group by its value.
/// 2. Else, if every row resolves to the same recipient (or hardcoded
///    recipients are configured) → one group with everything.
/// 3. Else → one group per row.
pub fn group_rows(
    rows: Vec<Row>,
    split_key_column: Option<&str>,
    recipients_column: Option<&str>,
    use_hardcoded_recipients: bool,
) -> Vec<EmailGroup> {
    if let Some(column) = split_key_column {
        let mut groups: Vec<EmailGroup> = Vec::new();
        for row in rows {
            let key = column_as_string(&row, column).unwrap_or_else(|| "unknown".to_string());
            match groups.iter_mut().find(|g| g.split_key.as_deref() == Some(key.as_str())) {
                Some(group) => group.rows.push(row),
                None => groups.push(EmailGroup {
                    split_key: Some(key),
                    rows: vec![row],
                }),
            }
        }
        return groups;
    }

    let single_recipient = use_hardcoded_recipients
        || recipients_column.map(|column| all_rows_share_recipient(&rows, column)).unwrap_or(true);

    if single_recipient {
        return vec![EmailGroup {
            split_key: None,
            rows,
        }];
    }

    rows.into_iter()
        .map(|row| EmailGroup {
            split_key: None,
            rows: vec![row],
        })
        .collect()
}

fn all_rows_share_recipient(rows: &[Row], column: &str) -> bool {
    let mut first: Option<String> = None;
    for row in rows {
        let value = column_as_string(row, column);
        match (&first, &value) {
            (None, _) => first = value,
            (Some(f), Some(v)) if f == v => {}
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(pairs: &[(&str, &str)]) -> Row {
        let mut row = BTreeMap::new();
        for (k, v) in pairs {
            row.insert(k.to_string(), ColumnValue::Text(v.to_string()));
        }
        row
    }

    #[test]
    fn groups_by_split_key_column_when_configured() {
        let rows = vec![
            row(&[("region", "east")]),
            row(&[("region", "west")]),
            row(&[("region", "east")]),
        ];
        let groups = group_rows(rows, Some("region"), None, false);
        assert_eq!(groups.len(), 2);
        let east = groups.iter().find(|g| g.split_key.as_deref() == Some("east")).unwrap();
        assert_eq!(east.rows.len(), 2);
    }

    #[test]
    fn one_email_per_row_when_recipients_diverge() {
        let rows = vec![row(&[("email", "a@x.com")]), row(&[("email", "b@x.com")])];
        let groups = group_rows(rows, None, Some("email"), false);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn single_group_when_all_rows_share_a_recipient() {
        let rows = vec![row(&[("email", "a@x.com")]), row(&[("email", "a@x.com")])];
        let groups = group_rows(rows, None, Some("email"), false);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows.len(), 2);
    }

    #[test]
    fn single_group_when_hardcoded_recipients_configured() {
        let rows = vec![row(&[("email", "a@x.com")]), row(&[("email", "b@x.com")])];
        let groups = group_rows(rows, None, Some("email"), true);
        assert_eq!(groups.len(), 1);
    }
}
