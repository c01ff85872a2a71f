use chrono::{DateTime, Utc};

use crate::assignment::RoleAssignment;

/// Whether an assignment grants anything at `now`.
///
/// Permanent rows are always active. A temporary row needs an end time,
/// must have started, and must not have ended; the end instant itself is
/// still inside the window.
pub fn is_active_at(row: &RoleAssignment, now: DateTime<Utc>) -> bool {
    if !row.is_temporary {
        return true;
    }
    let Some(end) = row.temporary_access_end_time else {
        return false;
    };
    if let Some(start) = row.temporary_access_start_time
        && now < start
    {
        return false;
    }
    now <= end
}

pub fn active_assignments(
    rows: &[RoleAssignment],
    now: DateTime<Utc>,
) -> impl Iterator<Item = &RoleAssignment> {
    rows.iter().filter(move |row| {
        let active = is_active_at(row, now);
        if !active {
            tracing::debug!(
                role = %row.role_slug,
                scope_id = %row.scope_id,
                start = ?row.temporary_access_start_time,
                end = ?row.temporary_access_end_time,
                "skipping inactive temporary assignment"
            );
        }
        active
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn temporary(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> RoleAssignment {
        RoleAssignment::builtin("member", "proj-1").temporary(start, end)
    }

    #[test]
    fn permanent_rows_are_always_active() {
        assert!(is_active_at(&RoleAssignment::builtin("admin", "p"), now()));
    }

    #[test]
    fn temporary_row_inside_window_is_active() {
        let row = temporary(
            Some(now() - Duration::hours(1)),
            Some(now() + Duration::hours(1)),
        );
        assert!(is_active_at(&row, now()));
    }

    #[test]
    fn expired_row_is_inactive() {
        let row = temporary(None, Some(now() - Duration::seconds(1)));
        assert!(!is_active_at(&row, now()));
    }

    #[test]
    fn end_instant_is_inclusive() {
        let row = temporary(None, Some(now()));
        assert!(is_active_at(&row, now()));
    }

    #[test]
    fn missing_end_time_is_never_permanent() {
        let row = temporary(Some(now() - Duration::days(1)), None);
        assert!(!is_active_at(&row, now()));
    }

    #[test]
    fn future_start_is_not_yet_active() {
        let row = temporary(
            Some(now() + Duration::minutes(5)),
            Some(now() + Duration::hours(1)),
        );
        assert!(!is_active_at(&row, now()));
    }

    #[test]
    fn same_row_flips_between_evaluation_times() {
        let row = temporary(None, Some(now()));

        assert!(is_active_at(&row, now() - Duration::minutes(1)));
        assert!(!is_active_at(&row, now() + Duration::minutes(1)));
    }

    #[test]
    fn active_assignments_preserves_order() {
        let rows = vec![
            RoleAssignment::builtin("viewer", "p"),
            temporary(None, Some(now() - Duration::hours(1))),
            RoleAssignment::builtin("member", "p"),
        ];

        let slugs: Vec<_> = active_assignments(&rows, now())
            .map(|r| r.role_slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["viewer", "member"]);
    }
}
