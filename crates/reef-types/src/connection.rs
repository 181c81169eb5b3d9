use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;

/// Supported source/target RDBMS kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    SqlServer,
    MySql,
    PostgreSql,
}

/// A reference to an external RDBMS.
///
/// `connection_string` is always stored as ciphertext (the `"PWENC:"`
/// marker from `reef-encrypt`); pipelines decrypt it into memory only for
/// the duration of a single execution and never log the plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub name: String,
    pub kind: ConnectionKind,
    pub connection_string: String,
    pub active: bool,
    pub integrity_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// Fields that feed [`reef_hash`]'s business-field hash, in the order
    /// the hasher will canonicalise them (lexicographic by field name).
    pub fn hashable_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("active", self.active.to_string()),
            ("connection_string", self.connection_string.clone()),
            ("kind", format!("{:?}", self.kind)),
            ("name", self.name.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashable_fields_are_lexicographically_ordered() {
        let conn = Connection {
            id: ConnectionId::new(),
            name: "warehouse".into(),
            kind: ConnectionKind::PostgreSql,
            connection_string: "PWENC:abc::def".into(),
            active: true,
            integrity_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let fields = conn.hashable_fields();
        let names: Vec<_> = fields.iter().map(|(k, _)| *k).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
