use std::collections::HashMap;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;

use warden_core::ability::{Conditions, ProjectAbility, ProjectRule, decode_rules, encode_rules};
use warden_core::assignment::{ActorRef, CustomRole, RoleAssignment, ScopeRef};
use warden_core::catalog::rules_for;
use warden_core::domain::{ProjectAction, ProjectDomain, ProjectSubject};
use warden_core::engine::{AssignmentReader, PermissionResolver, ResolveError, check_boundary};

struct TestStore {
    rows: HashMap<ActorRef, Vec<RoleAssignment>>,
}

impl AssignmentReader for TestStore {
    async fn read_assignments(
        &self,
        actor: &ActorRef,
        _scope: &ScopeRef,
    ) -> Result<Vec<RoleAssignment>, ResolveError> {
        Ok(self.rows.get(actor).cloned().unwrap_or_default())
    }

    async fn read_custom_role(
        &self,
        _scope: &ScopeRef,
        _slug: &str,
    ) -> Result<Option<CustomRole>, ResolveError> {
        Ok(None)
    }

    async fn read_service_token_project(
        &self,
        _token_id: &str,
    ) -> Result<Option<String>, ResolveError> {
        Ok(None)
    }
}

fn builtin(slug: &str) -> ProjectAbility {
    ProjectAbility::new(rules_for::<ProjectDomain>(slug).to_vec())
}

fn conditional_rules(count: usize) -> Vec<ProjectRule> {
    (0..count)
        .map(|i| {
            ProjectRule::allow([ProjectAction::ReadValue], [ProjectSubject::Secrets])
                .unwrap()
                .with_conditions(
                    Conditions::parse(&json!({
                        "environment": format!("env-{i}"),
                        "secretPath": { "$glob": format!("/team-{i}/**") }
                    }))
                    .unwrap(),
                )
        })
        .collect()
}

fn bench_can_admin_last_subject(c: &mut Criterion) {
    let admin = builtin("admin");

    c.bench_function("can_admin_last_subject", |b| {
        b.iter(|| admin.can(ProjectAction::Read, ProjectSubject::ApprovalRequestGrants))
    });
}

fn bench_can_denied_full_scan(c: &mut Criterion) {
    let admin = builtin("admin");

    c.bench_function("can_denied_full_scan", |b| {
        b.iter(|| admin.can(ProjectAction::Review, ProjectSubject::Secrets))
    });
}

fn bench_can_on_conditional_100(c: &mut Criterion) {
    let ability = ProjectAbility::new(conditional_rules(100));
    let instance = json!({ "environment": "env-0", "secretPath": "/team-0/db/password" });

    c.bench_function("can_on_conditional_100", |b| {
        b.iter(|| ability.can_on(ProjectAction::ReadValue, ProjectSubject::Secrets, &instance))
    });
}

fn bench_decode_packed_100(c: &mut Criterion) {
    let blob = encode_rules(&conditional_rules(100));

    c.bench_function("decode_packed_100", |b| {
        b.iter(|| decode_rules::<ProjectAction, ProjectSubject>(&blob).unwrap())
    });
}

fn bench_boundary_admin_vs_member(c: &mut Criterion) {
    let admin = builtin("admin");
    let member = builtin("member");

    c.bench_function("boundary_admin_vs_member", |b| {
        b.iter(|| check_boundary(&admin, &member, true))
    });
}

fn bench_resolve_three_roles(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let actor = ActorRef::user("alice");
    let custom = encode_rules(&conditional_rules(10));
    let rows = vec![
        RoleAssignment::builtin("member", "proj-1"),
        RoleAssignment::builtin("cryptographic-operator", "proj-1"),
        RoleAssignment::custom("proj-1", custom),
    ];
    let resolver = PermissionResolver::new(Arc::new(TestStore {
        rows: HashMap::from([(actor.clone(), rows)]),
    }));

    c.bench_function("resolve_three_roles", |b| {
        b.to_async(&rt)
            .iter(|| async { resolver.resolve_project(&actor, "proj-1").await.unwrap() });
    });
}

criterion_group!(
    benches,
    bench_can_admin_last_subject,
    bench_can_denied_full_scan,
    bench_can_on_conditional_100,
    bench_decode_packed_100,
    bench_boundary_admin_vs_member,
    bench_resolve_three_roles,
);
criterion_main!(benches);
