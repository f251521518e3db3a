//! Read-only aggregation over the task population.
//!
//! The aggregator is an in-process reducer over the loaded store: no
//! queries are pushed to the persistence layer, so the whole report is
//! portable and testable without a live database. It performs no writes
//! and tolerates an empty population (rates default to 0, series stay
//! zero-filled or empty, never a fault).

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::db::{day_of, Database};
use crate::fields::Status;
use crate::task::Task;

/// Filters narrowing the task population.
#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    pub club: Option<u64>,
    pub objective: Option<u64>,
    pub goal: Option<u64>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        if let Some(c) = self.club {
            if task.club != c {
                return false;
            }
        }
        if let Some(o) = self.objective {
            if task.objective != o {
                return false;
            }
        }
        if let Some(g) = self.goal {
            if task.goal != Some(g) {
                return false;
            }
        }
        true
    }
}

/// Inclusive calendar-day window.
pub type Window = (NaiveDate, NaiveDate);

/// One point of a per-day creation series.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: u64,
}

/// One per-day engagement bucket.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EngagementPoint {
    pub day: NaiveDate,
    pub active_users: u64,
    pub new_users: u64,
    pub tasks_created: u64,
}

/// A club's standing on the completion leaderboard.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClubStanding {
    pub club: u64,
    pub name: String,
    pub member_count: u64,
    pub tasks_completed: u64,
}

/// Aggregated reporting view consumed by the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    /// Completed / total over the filtered population, as a percentage.
    pub task_completion_rate: f64,
    /// Total assignments / distinct assigned users.
    pub average_tasks_per_user: f64,
    /// Ranked by completed count desc, club name asc on ties.
    pub top_performing_clubs: Vec<ClubStanding>,
    pub user_growth: Vec<DayCount>,
    pub club_growth: Vec<DayCount>,
    pub user_engagement: Vec<EngagementPoint>,
    /// Set when the scan budget ran out before the population was covered.
    pub partial: bool,
}

/// Produce the aggregate report for the filtered population.
///
/// `window` bounds the population by creation day and the per-day series;
/// without a window the series are empty and the whole population is
/// considered. `budget` caps how many tasks the scan examines; exceeding
/// it yields a report marked `partial` instead of an error.
pub fn aggregate(
    db: &Database,
    filter: &TaskFilter,
    window: Option<Window>,
    budget: Option<usize>,
) -> AnalyticsReport {
    let in_window = |day: NaiveDate| match window {
        Some((start, end)) => day >= start && day <= end,
        None => true,
    };

    let mut total: u64 = 0;
    let mut completed: u64 = 0;
    let mut assignments: u64 = 0;
    let mut assigned_users: HashSet<u64> = HashSet::new();
    let mut completed_per_club: BTreeMap<u64, u64> = BTreeMap::new();
    let mut created_per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut partial = false;

    for (scanned, task) in db.tasks.iter().enumerate() {
        if let Some(max) = budget {
            if scanned >= max {
                partial = true;
                break;
            }
        }
        if !filter.matches(task) || !in_window(day_of(task.created_at_utc)) {
            continue;
        }
        total += 1;
        *created_per_day.entry(day_of(task.created_at_utc)).or_default() += 1;
        assignments += task.assignees.len() as u64;
        for a in &task.assignees {
            assigned_users.insert(a.user);
        }
        if task.status == Status::Completed {
            completed += 1;
            let completed_day = task.completed_at_utc.map(day_of);
            if completed_day.map(&in_window).unwrap_or(false) {
                *completed_per_club.entry(task.club).or_default() += 1;
            }
        }
    }

    let task_completion_rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };
    let average_tasks_per_user = if assigned_users.is_empty() {
        0.0
    } else {
        assignments as f64 / assigned_users.len() as f64
    };

    let mut top_performing_clubs: Vec<ClubStanding> = db
        .clubs
        .iter()
        .filter(|c| filter.club.map_or(true, |want| c.id == want))
        .map(|c| ClubStanding {
            club: c.id,
            name: c.name.clone(),
            member_count: c.members.len() as u64,
            tasks_completed: completed_per_club.get(&c.id).copied().unwrap_or(0),
        })
        .collect();
    top_performing_clubs
        .sort_by(|a, b| b.tasks_completed.cmp(&a.tasks_completed).then(a.name.cmp(&b.name)));

    let (user_growth, club_growth, user_engagement) = match window {
        Some(w) => per_day_series(db, w, &created_per_day),
        None => (vec![], vec![], vec![]),
    };

    debug!(total, completed, partial, "aggregation done");
    AnalyticsReport {
        total_tasks: total,
        completed_tasks: completed,
        task_completion_rate,
        average_tasks_per_user,
        top_performing_clubs,
        user_growth,
        club_growth,
        user_engagement,
        partial,
    }
}

/// Zero-filled per-day growth and engagement series over the window.
///
/// The start is clamped to the earliest record day in the store, so an
/// open-ended window (e.g. only an upper bound) cannot zero-fill millions
/// of days that predate the community.
fn per_day_series(
    db: &Database,
    (start, end): Window,
    created_per_day: &BTreeMap<NaiveDate, u64>,
) -> (Vec<DayCount>, Vec<DayCount>, Vec<EngagementPoint>) {
    let mut users_per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for u in &db.users {
        *users_per_day.entry(day_of(u.created_at_utc)).or_default() += 1;
    }
    let mut clubs_per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for c in &db.clubs {
        *clubs_per_day.entry(day_of(c.created_at_utc)).or_default() += 1;
    }
    let mut active_per_day: BTreeMap<NaiveDate, HashSet<u64>> = BTreeMap::new();
    for rec in &db.activity {
        active_per_day.entry(day_of(rec.at_utc)).or_default().insert(rec.user);
    }

    let earliest = [
        users_per_day.keys().next(),
        clubs_per_day.keys().next(),
        active_per_day.keys().next(),
        created_per_day.keys().next(),
    ]
    .into_iter()
    .flatten()
    .min()
    .copied();
    let Some(earliest) = earliest else {
        // Nothing ever happened; every series is empty.
        return (vec![], vec![], vec![]);
    };

    let mut user_growth = Vec::new();
    let mut club_growth = Vec::new();
    let mut engagement = Vec::new();
    let mut day = start.max(earliest);
    while day <= end {
        let new_users = users_per_day.get(&day).copied().unwrap_or(0);
        user_growth.push(DayCount { day, count: new_users });
        club_growth.push(DayCount {
            day,
            count: clubs_per_day.get(&day).copied().unwrap_or(0),
        });
        engagement.push(EngagementPoint {
            day,
            active_users: active_per_day.get(&day).map(|s| s.len() as u64).unwrap_or(0),
            new_users,
            tasks_created: created_per_day.get(&day).copied().unwrap_or(0),
        });
        day += Duration::days(1);
    }
    (user_growth, club_growth, engagement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Role;
    use crate::task::Assignee;
    use crate::testutil::{club, sample_task, user};

    const DAY: i64 = 86_400;
    // 2024-01-01T00:00:00Z
    const JAN1: i64 = 1_704_067_200;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn completed_task(id: u64, club: u64, completed_at: i64) -> crate::task::Task {
        let mut t = sample_task(id);
        t.club = club;
        t.status = Status::Completed;
        t.progress = 100;
        t.completed_at_utc = Some(completed_at);
        t.completed_by = Some(1);
        t
    }

    #[test]
    fn empty_population_yields_zero_report() {
        let db = Database::default();
        let report = aggregate(&db, &TaskFilter::default(), None, None);
        assert_eq!(report.total_tasks, 0);
        assert_eq!(report.task_completion_rate, 0.0);
        assert_eq!(report.average_tasks_per_user, 0.0);
        assert!(report.user_growth.is_empty());
        assert!(!report.partial);
    }

    #[test]
    fn completion_rate_over_filtered_club() {
        let mut db = Database::default();
        db.clubs.push(club(1, "Chess", vec![1, 2, 3], JAN1));
        db.clubs.push(club(2, "Debate", vec![4], JAN1));
        for id in 1..=6 {
            db.tasks.push(completed_task(id, 1, JAN1 + DAY));
        }
        for id in 7..=10 {
            db.tasks.push({
                let mut t = sample_task(id);
                t.club = 1;
                t
            });
        }
        // Noise from another club must not leak into the filter.
        db.tasks.push(completed_task(11, 2, JAN1));

        let filter = TaskFilter {
            club: Some(1),
            ..Default::default()
        };
        let report = aggregate(&db, &filter, Some((date(1), date(31))), None);
        assert_eq!(report.total_tasks, 10);
        assert_eq!(report.completed_tasks, 6);
        assert!((report.task_completion_rate - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn leaderboard_ranks_and_breaks_ties_by_name() {
        let mut db = Database::default();
        db.clubs.push(club(1, "Robotics", vec![1], JAN1));
        db.clubs.push(club(2, "Astronomy", vec![2, 3], JAN1));
        db.clubs.push(club(3, "Chess", vec![4], JAN1));
        db.tasks.push(completed_task(1, 1, JAN1));
        db.tasks.push(completed_task(2, 2, JAN1));
        db.tasks.push(completed_task(3, 3, JAN1));
        db.tasks.push(completed_task(4, 3, JAN1));

        let report = aggregate(&db, &TaskFilter::default(), Some((date(1), date(2))), None);
        let names: Vec<_> = report
            .top_performing_clubs
            .iter()
            .map(|c| (c.name.as_str(), c.tasks_completed))
            .collect();
        // Chess leads; Astronomy and Robotics tie at 1 and sort by name.
        assert_eq!(
            names,
            vec![("Chess", 2), ("Astronomy", 1), ("Robotics", 1)]
        );
        assert_eq!(report.top_performing_clubs[1].member_count, 2);
    }

    #[test]
    fn growth_series_is_zero_filled_per_day() {
        let mut db = Database::default();
        db.users.push(user(1, "ada", JAN1));
        db.users.push(user(2, "bob", JAN1));
        db.users.push(user(3, "cyn", JAN1 + 2 * DAY));
        db.clubs.push(club(1, "Chess", vec![], JAN1 + DAY));

        let report = aggregate(&db, &TaskFilter::default(), Some((date(1), date(3))), None);
        let counts: Vec<u64> = report.user_growth.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![2, 0, 1]);
        let clubs: Vec<u64> = report.club_growth.iter().map(|p| p.count).collect();
        assert_eq!(clubs, vec![0, 1, 0]);
        assert_eq!(report.user_growth[1].day, date(2));
    }

    #[test]
    fn engagement_counts_distinct_active_users() {
        let mut db = Database::default();
        db.record_activity(1, "task.update", JAN1);
        db.record_activity(1, "task.check", JAN1 + 60);
        db.record_activity(2, "task.update", JAN1);
        db.tasks.push({
            let mut t = sample_task(1);
            t.created_at_utc = JAN1;
            t
        });

        let report = aggregate(&db, &TaskFilter::default(), Some((date(1), date(2))), None);
        assert_eq!(report.user_engagement[0].active_users, 2);
        assert_eq!(report.user_engagement[0].tasks_created, 1);
        assert_eq!(report.user_engagement[1].active_users, 0);
    }

    #[test]
    fn average_tasks_per_user() {
        let mut db = Database::default();
        let mut t1 = sample_task(1);
        t1.assignees.push(Assignee {
            user: 1,
            role: Role::Owner,
            assigned_by: 1,
            assigned_at_utc: 0,
        });
        t1.assignees.push(Assignee {
            user: 2,
            role: Role::Contributor,
            assigned_by: 1,
            assigned_at_utc: 0,
        });
        let mut t2 = sample_task(2);
        t2.assignees.push(Assignee {
            user: 1,
            role: Role::Owner,
            assigned_by: 1,
            assigned_at_utc: 0,
        });
        db.tasks.push(t1);
        db.tasks.push(t2);

        let report = aggregate(&db, &TaskFilter::default(), None, None);
        // 3 assignments over 2 distinct users.
        assert!((report.average_tasks_per_user - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn open_start_window_clamps_to_earliest_record() {
        let mut db = Database::default();
        db.users.push(user(1, "ada", JAN1));
        db.users.push(user(2, "bob", JAN1 + 2 * DAY));

        let report = aggregate(
            &db,
            &TaskFilter::default(),
            Some((NaiveDate::MIN, date(3))),
            None,
        );
        // Series start at the first record day, not at the window's
        // unbounded lower edge.
        assert_eq!(report.user_growth.len(), 3);
        assert_eq!(report.user_growth[0].day, date(1));
        let counts: Vec<u64> = report.user_growth.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![1, 0, 1]);
        assert_eq!(report.user_engagement.len(), 3);
    }

    #[test]
    fn open_start_window_on_empty_store_yields_empty_series() {
        let db = Database::default();
        let report = aggregate(
            &db,
            &TaskFilter::default(),
            Some((NaiveDate::MIN, date(31))),
            None,
        );
        assert!(report.user_growth.is_empty());
        assert!(report.club_growth.is_empty());
        assert!(report.user_engagement.is_empty());
    }

    #[test]
    fn budget_exhaustion_marks_report_partial() {
        let mut db = Database::default();
        for id in 1..=10 {
            db.tasks.push(sample_task(id));
        }
        let report = aggregate(&db, &TaskFilter::default(), None, Some(3));
        assert!(report.partial);
        assert_eq!(report.total_tasks, 3);
    }
}
