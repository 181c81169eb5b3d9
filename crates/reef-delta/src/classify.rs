use std::collections::BTreeMap;

/// Outcome of comparing one run's row hashes against the previously
/// committed state (§4.C4 "Change classification").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub new_rows: Vec<String>,
    pub changed_rows: Vec<String>,
    pub unchanged_rows: Vec<String>,
    pub deleted_reef_ids: Vec<String>,
}

pub fn classify(
    previous: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
) -> Classification {
    let mut result = Classification::default();

    for (reef_id, hash) in current {
        match previous.get(reef_id) {
            None => result.new_rows.push(reef_id.clone()),
            Some(prev_hash) if prev_hash == hash => result.unchanged_rows.push(reef_id.clone()),
            Some(_) => result.changed_rows.push(reef_id.clone()),
        }
    }

    for reef_id in previous.keys() {
        if !current.contains_key(reef_id) {
            result.deleted_reef_ids.push(reef_id.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_new_changed_unchanged_and_deleted() {
        let mut previous = BTreeMap::new();
        previous.insert("1".to_string(), "hash-a".to_string());
        previous.insert("2".to_string(), "hash-b".to_string());
        previous.insert("3".to_string(), "hash-c".to_string());

        let mut current = BTreeMap::new();
        current.insert("1".to_string(), "hash-a".to_string()); // unchanged
        current.insert("2".to_string(), "hash-b-new".to_string()); // changed
        current.insert("4".to_string(), "hash-d".to_string()); // new
        // "3" is missing -> deleted

        let result = classify(&previous, &current);
        assert_eq!(result.unchanged_rows, vec!["1".to_string()]);
        assert_eq!(result.changed_rows, vec!["2".to_string()]);
        assert_eq!(result.new_rows, vec!["4".to_string()]);
        assert_eq!(result.deleted_reef_ids, vec!["3".to_string()]);
    }
}
