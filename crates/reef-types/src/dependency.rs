use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DependencyId, ProfileId};

/// A directed edge: `dependent_profile` requires `prerequisite_profile` to
/// have completed first. `execution_order` breaks ties when a profile has
/// multiple prerequisites (§4.C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub id: DependencyId,
    pub dependent_profile: ProfileId,
    pub prerequisite_profile: ProfileId,
    pub execution_order: i32,
    pub created_at: DateTime<Utc>,
}

impl Dependency {
    pub fn is_self_edge(&self) -> bool {
        self.dependent_profile == self.prerequisite_profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_edge_detected() {
        let id = ProfileId::new();
        let dep = Dependency {
            id: DependencyId::new(),
            dependent_profile: id,
            prerequisite_profile: id,
            execution_order: 0,
            created_at: Utc::now(),
        };
        assert!(dep.is_self_edge());
    }
}
