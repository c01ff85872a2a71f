use warden_core::assignment::ScopeRef;
use warden_core::domain::ScopeKind;
use warden_core::engine::BoundaryResult;

pub fn audit_boundary_check(
    scope_kind: ScopeKind,
    requestor_rules: usize,
    target_rules: usize,
    enforced: bool,
    result: &BoundaryResult,
) {
    let missing = result.missing_permissions.join(",");
    if result.is_valid {
        tracing::info!(
            target: "audit",
            event = "boundary_check",
            scope_kind = %scope_kind,
            requestor_rules = requestor_rules,
            target_rules = target_rules,
            enforced = enforced,
            is_valid = true,
            "privilege change permitted"
        );
    } else {
        tracing::warn!(
            target: "audit",
            event = "boundary_check",
            scope_kind = %scope_kind,
            requestor_rules = requestor_rules,
            target_rules = target_rules,
            enforced = enforced,
            is_valid = false,
            missing_permissions = %missing,
            "privilege change refused"
        );
    }
}

pub fn audit_store_failure(scope: &ScopeRef, reason: &str) {
    tracing::error!(
        target: "audit",
        event = "store_failure",
        scope = %scope,
        reason = reason,
        "permission resolution failed"
    );
}

pub fn audit_cache_invalidation(kind: &str, key: &str, evicted: usize) {
    tracing::info!(
        target: "audit",
        event = "cache_invalidation",
        kind = kind,
        key = key,
        evicted = evicted,
        "assignment cache invalidated"
    );
}
