//! Recurrence expansion: spawning the next instance of a repeating task.
//!
//! Cadence is anchored on the completed task's due date, not on when the
//! work actually finished, so a series keeps its rhythm even when tasks
//! are completed early or late.

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::fields::{Frequency, Status};
use crate::task::{RecurrenceRule, Task};

/// Compute the next occurrence date strictly after `after`, or none if the
/// rule's end conditions leave no further occurrence.
///
/// `daily` advances by `interval` days. `weekly` advances to the next
/// weekday in `days_of_week` (0 = Sunday .. 6 = Saturday), or by `interval`
/// weeks when the set is empty. `monthly` advances `interval` months,
/// landing on `day_of_month` clamped to the month length. `yearly` advances
/// `interval` years preserving month and day.
pub fn next_due(rule: &RecurrenceRule, after: NaiveDate) -> Option<NaiveDate> {
    let interval = rule.interval.max(1);
    let next = match rule.frequency {
        Frequency::Daily => after + Duration::days(i64::from(interval)),
        Frequency::Weekly => {
            if rule.days_of_week.is_empty() {
                after + Duration::weeks(i64::from(interval))
            } else {
                next_matching_weekday(after, &rule.days_of_week)?
            }
        }
        Frequency::Monthly => {
            let shifted = after.checked_add_months(Months::new(interval))?;
            match rule.day_of_month {
                Some(day) => clamp_to_month(shifted.year(), shifted.month(), u32::from(day)),
                None => shifted,
            }
        }
        Frequency::Yearly => after.checked_add_months(Months::new(interval * 12))?,
    };

    if let Some(end) = rule.end_date {
        if next > end {
            return None;
        }
    }
    Some(next)
}

/// The first date strictly after `after` whose weekday is in `days` (0 = Sun).
fn next_matching_weekday(after: NaiveDate, days: &[u8]) -> Option<NaiveDate> {
    (1..=7)
        .map(|offset| after + Duration::days(offset))
        .find(|d| days.contains(&(d.weekday().num_days_from_sunday() as u8)))
}

fn clamp_to_month(year: i32, month: u32, day: u32) -> NaiveDate {
    let mut day = day.min(31);
    loop {
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            return d;
        }
        day -= 1;
    }
}

/// Build the successor instance of a completed recurring task, or none when
/// the series has ended (occurrence count exhausted or end date passed).
///
/// The successor copies the descriptive fields, resets every checklist item
/// to incomplete, drops completion/blocking state, and points back at the
/// completed task through `parent_task`. The caller supplies the fresh id
/// and today's date.
pub fn expand(task: &Task, new_id: u64, today: NaiveDate, now_utc: i64) -> Option<Task> {
    let rule = task.recurrence.as_ref()?;
    if let Some(max) = rule.occurrences {
        if rule.occurrence >= max {
            return None;
        }
    }
    let due = next_due(rule, task.due)?;

    let mut next_rule = rule.clone();
    next_rule.occurrence = rule.occurrence + 1;

    let mut checklist = task.checklist.clone();
    for item in &mut checklist {
        item.completed = false;
        item.completed_by = None;
        item.completed_at_utc = None;
    }

    Some(Task {
        id: new_id,
        title: task.title.clone(),
        description: task.description.clone(),
        tags: task.tags.clone(),
        club: task.club,
        objective: task.objective,
        goal: task.goal,
        status: Status::NotStarted,
        priority: task.priority,
        due,
        start: today,
        progress: 0,
        assignees: task.assignees.clone(),
        checklist,
        subtasks: vec![],
        dependencies: vec![],
        recurrence: Some(next_rule),
        parent_task: Some(task.id),
        blocked_reason: None,
        blocked_by: None,
        blocked_at_utc: None,
        completed_at_utc: None,
        completed_by: None,
        comments: vec![],
        next_check_id: task.next_check_id,
        next_subtask_id: 0,
        next_comment_id: 0,
        created_by: task.created_by,
        created_at_utc: now_utc,
        updated_at_utc: now_utc,
        revision: 0,
    })
}
