use chrono::{DateTime, Utc};

use crate::ability::{Ability, DomainAbility, DomainRule, decode_rules};
use crate::assignment::RoleAssignment;
use crate::catalog::rules_for;
use crate::domain::Domain;

use super::temporal::active_assignments;

/// Rules contributed by one assignment row. A custom row whose blob is
/// missing or undecodable contributes nothing.
pub fn rules_for_assignment<D: Domain>(row: &RoleAssignment) -> Vec<DomainRule<D>> {
    if !row.is_custom() {
        return rules_for::<D>(&row.role_slug).to_vec();
    }

    let Some(blob) = &row.permissions else {
        tracing::error!(
            scope_kind = %D::SCOPE,
            scope_id = %row.scope_id,
            "custom role assignment carries no permissions, skipping"
        );
        return Vec::new();
    };

    match decode_rules(blob) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!(
                error = %e,
                scope_kind = %D::SCOPE,
                scope_id = %row.scope_id,
                "failed to decode custom role permissions, skipping"
            );
            Vec::new()
        }
    }
}

/// Concatenates the rules of every row active at `now`, in row order.
pub fn build_ability<D: Domain>(rows: &[RoleAssignment], now: DateTime<Utc>) -> DomainAbility<D> {
    let mut builder = Ability::builder();
    for row in active_assignments(rows, now) {
        builder.extend(rules_for_assignment::<D>(row));
    }
    builder.build()
}
