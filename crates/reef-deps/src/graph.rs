use std::collections::{BTreeMap, BTreeSet};

use reef_types::{Dependency, ProfileId};

use crate::error::DepsError;

/// One node surfaced by [`DependencyGraph::build_graph`], annotated with its
/// distance from the traversal root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphNode {
    pub profile_id: ProfileId,
    pub depth: usize,
}

/// A bounded-depth view of the graph rooted at one profile, suitable for a
/// UI dependency visualisation (§9 depth cap).
#[derive(Debug, Clone, Default)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<(ProfileId, ProfileId)>,
    /// `true` if the traversal hit `depth_cap` before exhausting the graph.
    pub truncated: bool,
}

/// In-memory view of the acyclic `Dependency` edge set (§4.C5).
///
/// Edges run `dependent_profile -> prerequisite_profile`. Every traversal
/// here is iterative over an explicit stack with a visited set, never
/// recursive, so depth is bounded only by available memory rather than the
/// call stack.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    prerequisites_of: BTreeMap<ProfileId, Vec<ProfileId>>,
    dependents_of: BTreeMap<ProfileId, BTreeSet<ProfileId>>,
}

impl DependencyGraph {
    /// Build a graph from the full edge set. Prerequisites of a profile are
    /// ordered by `execution_order` then by id, matching the tie-break rule
    /// profiles with multiple prerequisites are resolved under.
    pub fn build(edges: &[Dependency]) -> Self {
        let mut raw: BTreeMap<ProfileId, Vec<(i32, ProfileId)>> = BTreeMap::new();
        let mut dependents_of: BTreeMap<ProfileId, BTreeSet<ProfileId>> = BTreeMap::new();

        for edge in edges {
            raw.entry(edge.dependent_profile)
                .or_default()
                .push((edge.execution_order, edge.prerequisite_profile));
            dependents_of
                .entry(edge.prerequisite_profile)
                .or_default()
                .insert(edge.dependent_profile);
        }

        let prerequisites_of = raw
            .into_iter()
            .map(|(dependent, mut prereqs)| {
                prereqs.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
                (dependent, prereqs.into_iter().map(|(_, p)| p).collect())
            })
            .collect();

        Self {
            prerequisites_of,
            dependents_of,
        }
    }

    /// Direct prerequisites of `profile`, in tie-break order.
    pub fn prerequisites_of(&self, profile: ProfileId) -> &[ProfileId] {
        self.prerequisites_of
            .get(&profile)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Profiles that directly depend on `profile`.
    pub fn dependents_of(&self, profile: ProfileId) -> impl Iterator<Item = &ProfileId> {
        self.dependents_of
            .get(&profile)
            .into_iter()
            .flat_map(|set| set.iter())
    }

    /// Depth-first post-order traversal: every prerequisite appears before
    /// the profile that needs it. Errors if a cycle is reachable from
    /// `root` (should never happen once [`crate::validate_edge`] is the
    /// only write path, but existing data may predate that check).
    pub fn get_execution_order(&self, root: ProfileId) -> Result<Vec<ProfileId>, DepsError> {
        let mut order = Vec::new();
        let mut visited: BTreeSet<ProfileId> = BTreeSet::new();
        let mut on_stack: BTreeSet<ProfileId> = BTreeSet::new();
        let mut stack: Vec<(ProfileId, usize)> = vec![(root, 0)];
        on_stack.insert(root);

        while let Some(&(node, child_idx)) = stack.last() {
            let prereqs = self.prerequisites_of(node);

            if child_idx < prereqs.len() {
                let child = prereqs[child_idx];
                stack.last_mut().expect("stack is non-empty").1 += 1;

                if on_stack.contains(&child) {
                    return Err(DepsError::CycleDetected(child));
                }
                if !visited.contains(&child) {
                    on_stack.insert(child);
                    stack.push((child, 0));
                }
            } else {
                stack.pop();
                on_stack.remove(&node);
                if visited.insert(node) {
                    order.push(node);
                }
            }
        }

        Ok(order)
    }

    /// Would adding the edge `a` depends on `depends_on_b` create a cycle?
    /// True iff `a` is already reachable from `b` via existing prerequisite
    /// edges.
    pub fn would_create_cycle(&self, a: ProfileId, depends_on_b: ProfileId) -> bool {
        if a == depends_on_b {
            return true;
        }
        let mut visited: BTreeSet<ProfileId> = BTreeSet::new();
        let mut stack = vec![depends_on_b];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            for &prereq in self.prerequisites_of(node) {
                if prereq == a {
                    return true;
                }
                stack.push(prereq);
            }
        }
        false
    }

    /// Bounded-depth DFS from `root` for visualisation, capping traversal
    /// at `depth_cap` hops to keep pathological graphs cheap to render.
    pub fn build_graph(&self, root: ProfileId, depth_cap: usize) -> GraphView {
        let mut view = GraphView::default();
        let mut visited: BTreeSet<ProfileId> = BTreeSet::new();
        let mut stack = vec![(root, 0usize)];

        while let Some((node, depth)) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            view.nodes.push(GraphNode {
                profile_id: node,
                depth,
            });
            if depth >= depth_cap {
                view.truncated = true;
                continue;
            }
            for &prereq in self.prerequisites_of(node) {
                view.edges.push((node, prereq));
                stack.push((prereq, depth + 1));
            }
        }

        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reef_types::DependencyId;

    fn edge(dependent: ProfileId, prerequisite: ProfileId, order: i32) -> Dependency {
        Dependency {
            id: DependencyId::new(),
            dependent_profile: dependent,
            prerequisite_profile: prerequisite,
            execution_order: order,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn execution_order_places_prerequisites_before_dependants() {
        let p1 = ProfileId::new();
        let p2 = ProfileId::new();
        let p3 = ProfileId::new();
        let p4 = ProfileId::new();

        let graph = DependencyGraph::build(&[
            edge(p1, p2, 0),
            edge(p1, p3, 1),
            edge(p2, p4, 0),
            edge(p3, p4, 0),
        ]);

        let order = graph.get_execution_order(p1).expect("acyclic");
        let pos = |id: ProfileId| order.iter().position(|&x| x == id).unwrap();

        assert!(pos(p4) < pos(p2));
        assert!(pos(p4) < pos(p3));
        assert!(pos(p2) < pos(p1));
        assert!(pos(p3) < pos(p1));
    }

    #[test]
    fn cycle_is_detected() {
        let p1 = ProfileId::new();
        let p2 = ProfileId::new();
        let graph = DependencyGraph::build(&[edge(p1, p2, 0), edge(p2, p1, 0)]);

        assert!(matches!(
            graph.get_execution_order(p1),
            Err(DepsError::CycleDetected(_))
        ));
    }

    #[test]
    fn would_create_cycle_detects_transitive_back_edge() {
        let p1 = ProfileId::new();
        let p2 = ProfileId::new();
        let p3 = ProfileId::new();
        let graph = DependencyGraph::build(&[edge(p1, p2, 0), edge(p2, p3, 0)]);

        assert!(graph.would_create_cycle(p1, p3));
        assert!(!graph.would_create_cycle(p3, p1));
    }

    #[test]
    fn build_graph_respects_depth_cap() {
        let profiles: Vec<ProfileId> = (0..5).map(|_| ProfileId::new()).collect();
        let edges: Vec<Dependency> = profiles
            .windows(2)
            .map(|pair| edge(pair[0], pair[1], 0))
            .collect();
        let graph = DependencyGraph::build(&edges);

        let view = graph.build_graph(profiles[0], 2);
        assert!(view.truncated);
        assert!(view.nodes.len() <= 4);
    }
}
