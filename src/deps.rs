//! Dependency graph checks over directed task relations.
//!
//! `blocked_by` edges gate completion of the owning task; `blocks` edges are
//! followed to report downstream impact. The graph is not guaranteed
//! acyclic, so traversal carries a visited set and a depth bound.

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};
use crate::fields::{Relation, Status};
use crate::task::Task;

/// Traversal guard for cyclic or degenerate graphs.
const MAX_DEPTH: usize = 64;

/// Check whether the task may transition to completed.
///
/// Every `blocked_by` target must resolve to a completed task. A missing
/// target is treated as unresolved rather than ignored, so a dangling edge
/// cannot silently unblock completion.
pub fn can_complete<'a, F>(task: &Task, mut fetch: F) -> CoreResult<()>
where
    F: FnMut(u64) -> Option<&'a Task>,
{
    for dep in task
        .dependencies
        .iter()
        .filter(|d| d.relation == Relation::BlockedBy)
    {
        match fetch(dep.task) {
            Some(target) if target.status == Status::Completed => {}
            _ => {
                return Err(CoreError::DependencyUnresolved {
                    task: task.id,
                    blocked_on: dep.task,
                })
            }
        }
    }
    Ok(())
}

/// Collect ids of tasks downstream of `root` through `blocks` edges.
///
/// Breadth-first with a visited set; cycles terminate, and the depth bound
/// caps pathological chains. `root` itself is not included.
pub fn find_downstream<'a, F>(root: u64, mut fetch: F) -> Vec<u64>
where
    F: FnMut(u64) -> Option<&'a Task>,
{
    let mut visited: HashSet<u64> = HashSet::new();
    visited.insert(root);
    let mut out = Vec::new();
    let mut frontier = vec![root];

    for _ in 0..MAX_DEPTH {
        if frontier.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for id in frontier {
            let Some(task) = fetch(id) else { continue };
            for dep in &task.dependencies {
                if dep.relation == Relation::Blocks && visited.insert(dep.task) {
                    out.push(dep.task);
                    next.push(dep.task);
                }
            }
        }
        frontier = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Dependency;
    use crate::testutil::sample_task;

    fn with_deps(id: u64, deps: Vec<(u64, Relation)>) -> Task {
        let mut t = sample_task(id);
        t.dependencies = deps
            .into_iter()
            .map(|(task, relation)| Dependency { task, relation })
            .collect();
        t
    }

    #[test]
    fn no_blockers_trivially_completes() {
        let t = with_deps(1, vec![(2, Relation::Related), (3, Relation::Blocks)]);
        assert!(can_complete(&t, |_| None).is_ok());
    }

    #[test]
    fn open_blocker_is_unresolved() {
        let t = with_deps(1, vec![(2, Relation::BlockedBy)]);
        let blocker = sample_task(2);
        let err = can_complete(&t, |id| (id == 2).then_some(&blocker)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DependencyUnresolved { task: 1, blocked_on: 2 }
        ));
    }

    #[test]
    fn completed_blocker_allows_completion() {
        let t = with_deps(1, vec![(2, Relation::BlockedBy)]);
        let mut blocker = sample_task(2);
        blocker.status = Status::Completed;
        assert!(can_complete(&t, |id| (id == 2).then_some(&blocker)).is_ok());
    }

    #[test]
    fn missing_blocker_is_unresolved() {
        let t = with_deps(1, vec![(99, Relation::BlockedBy)]);
        assert!(can_complete(&t, |_| None).is_err());
    }

    #[test]
    fn downstream_follows_blocks_edges() {
        let a = with_deps(1, vec![(2, Relation::Blocks), (4, Relation::Related)]);
        let b = with_deps(2, vec![(3, Relation::Blocks)]);
        let c = with_deps(3, vec![]);
        let lookup = |id: u64| match id {
            1 => Some(&a),
            2 => Some(&b),
            3 => Some(&c),
            _ => None,
        };
        assert_eq!(find_downstream(1, lookup), vec![2, 3]);
    }

    #[test]
    fn downstream_terminates_on_cycles() {
        let a = with_deps(1, vec![(2, Relation::Blocks)]);
        let b = with_deps(2, vec![(1, Relation::Blocks)]);
        let lookup = |id: u64| match id {
            1 => Some(&a),
            2 => Some(&b),
            _ => None,
        };
        assert_eq!(find_downstream(1, lookup), vec![2]);
    }
}
