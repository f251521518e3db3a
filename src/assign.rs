//! Assignment ledger: the set of users assigned to a task.
//!
//! The set is keyed by user. Re-assigning a user is an upsert that rewrites
//! the role and attribution in place, never a second entry.

use crate::fields::Role;
use crate::task::{Assignee, Task};

/// Assign `user` to the task with `role`, attributed to `assigned_by`.
///
/// Returns true when the user was newly added, false when an existing
/// entry was updated in place.
pub fn assign(task: &mut Task, user: u64, role: Role, assigned_by: u64, now_utc: i64) -> bool {
    if let Some(entry) = task.assignees.iter_mut().find(|a| a.user == user) {
        entry.role = role;
        entry.assigned_by = assigned_by;
        entry.assigned_at_utc = now_utc;
        false
    } else {
        task.assignees.push(Assignee {
            user,
            role,
            assigned_by,
            assigned_at_utc: now_utc,
        });
        true
    }
}

/// The task's primary assignee: the first `Owner` entry if any, otherwise
/// the earliest-assigned entry, otherwise none.
pub fn primary_assignee(task: &Task) -> Option<&Assignee> {
    task.assignees
        .iter()
        .find(|a| a.role == Role::Owner)
        .or_else(|| task.assignees.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_task;

    #[test]
    fn assign_appends_then_upserts() {
        let mut t = sample_task(1);
        assert!(assign(&mut t, 7, Role::Contributor, 2, 100));
        assert!(!assign(&mut t, 7, Role::Reviewer, 3, 200));
        assert_eq!(t.assignees.len(), 1);
        assert_eq!(t.assignees[0].role, Role::Reviewer);
        assert_eq!(t.assignees[0].assigned_by, 3);
        assert_eq!(t.assignees[0].assigned_at_utc, 200);
    }

    #[test]
    fn primary_prefers_owner() {
        let mut t = sample_task(1);
        assign(&mut t, 5, Role::Contributor, 1, 10);
        assign(&mut t, 6, Role::Owner, 1, 20);
        assert_eq!(primary_assignee(&t).unwrap().user, 6);
    }

    #[test]
    fn primary_falls_back_to_first() {
        let mut t = sample_task(1);
        assert!(primary_assignee(&t).is_none());
        assign(&mut t, 5, Role::Reviewer, 1, 10);
        assign(&mut t, 6, Role::Contributor, 1, 20);
        assert_eq!(primary_assignee(&t).unwrap().user, 5);
    }
}
