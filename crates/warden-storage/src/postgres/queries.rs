use chrono::{DateTime, Utc};
use serde_json::Value;

use warden_core::assignment::{ActorRef, CustomRole, RoleAssignment, ScopeRef};
use warden_core::domain::ScopeKind;

use crate::traits::{RoleGrant, StorageError};

/// Table layout for one scope kind. Names are constants, never user input.
struct Tables {
    scope_column: &'static str,
    roles: &'static str,
    memberships: &'static str,
    membership_roles: &'static str,
}

const PROJECT_TABLES: Tables = Tables {
    scope_column: "project_id",
    roles: "project_roles",
    memberships: "project_memberships",
    membership_roles: "project_membership_roles",
};

const ORG_TABLES: Tables = Tables {
    scope_column: "org_id",
    roles: "org_roles",
    memberships: "org_memberships",
    membership_roles: "org_membership_roles",
};

fn tables(kind: ScopeKind) -> &'static Tables {
    match kind {
        ScopeKind::Project => &PROJECT_TABLES,
        ScopeKind::Organization => &ORG_TABLES,
    }
}

pub(super) fn to_storage_error(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StorageError::Unavailable(e.to_string())
        }
        other => StorageError::Internal(other.to_string()),
    }
}

type AssignmentRow = (
    String,
    Option<Value>,
    bool,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

pub async fn read_assignments<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    actor: &ActorRef,
    scope: &ScopeRef,
) -> Result<Vec<RoleAssignment>, StorageError> {
    let t = tables(scope.kind);
    let active_filter = match scope.kind {
        ScopeKind::Organization => " AND m.is_active",
        ScopeKind::Project => "",
    };
    let query = format!(
        r#"
        SELECT r.role, cr.permissions, r.is_temporary,
               r.temporary_access_start_time, r.temporary_access_end_time
        FROM {memberships} m
        JOIN {membership_roles} r ON r.membership_id = m.id
        LEFT JOIN {roles} cr
            ON cr.id = r.custom_role_id AND cr.{col} = m.{col}
        WHERE m.{col} = $1 AND m.actor_type = $2 AND m.actor_id = $3{active_filter}
        ORDER BY r.created_at, r.id
        "#,
        memberships = t.memberships,
        membership_roles = t.membership_roles,
        roles = t.roles,
        col = t.scope_column,
    );

    let rows: Vec<AssignmentRow> = sqlx::query_as(&query)
        .bind(&scope.id)
        .bind(actor.actor_type.as_str())
        .bind(&actor.actor_id)
        .fetch_all(executor)
        .await
        .map_err(to_storage_error)?;

    Ok(rows
        .into_iter()
        .map(|(role, permissions, is_temporary, start, end)| RoleAssignment {
            role_slug: role,
            scope_id: scope.id.clone(),
            permissions,
            is_temporary,
            temporary_access_start_time: start,
            temporary_access_end_time: end,
        })
        .collect())
}

pub async fn find_role<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    scope: &ScopeRef,
    slug: &str,
) -> Result<Option<CustomRole>, StorageError> {
    let t = tables(scope.kind);
    let query = format!(
        "SELECT id::text, name, slug, permissions FROM {roles} WHERE {col} = $1 AND slug = $2",
        roles = t.roles,
        col = t.scope_column,
    );

    let row: Option<(String, String, String, Option<Value>)> = sqlx::query_as(&query)
        .bind(&scope.id)
        .bind(slug)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;

    Ok(row.map(|(id, name, slug, permissions)| CustomRole {
        id,
        name,
        slug,
        permissions,
    }))
}

pub async fn upsert_role<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    scope: &ScopeRef,
    name: &str,
    slug: &str,
    permissions: Option<&Value>,
) -> Result<String, StorageError> {
    let t = tables(scope.kind);
    let query = format!(
        r#"
        INSERT INTO {roles} ({col}, name, slug, permissions)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT ({col}, slug) DO UPDATE
            SET name = EXCLUDED.name, permissions = EXCLUDED.permissions
        RETURNING id::text
        "#,
        roles = t.roles,
        col = t.scope_column,
    );

    let row: (String,) = sqlx::query_as(&query)
        .bind(&scope.id)
        .bind(name)
        .bind(slug)
        .bind(permissions)
        .fetch_one(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.0)
}

pub async fn ensure_membership<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    actor: &ActorRef,
    scope: &ScopeRef,
) -> Result<String, StorageError> {
    let t = tables(scope.kind);
    // The no-op update makes RETURNING yield the existing row on conflict.
    let query = format!(
        r#"
        INSERT INTO {memberships} ({col}, actor_type, actor_id)
        VALUES ($1, $2, $3)
        ON CONFLICT ({col}, actor_type, actor_id) DO UPDATE SET actor_id = EXCLUDED.actor_id
        RETURNING id::text
        "#,
        memberships = t.memberships,
        col = t.scope_column,
    );

    let row: (String,) = sqlx::query_as(&query)
        .bind(&scope.id)
        .bind(actor.actor_type.as_str())
        .bind(&actor.actor_id)
        .fetch_one(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.0)
}

pub async fn insert_membership_role<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    kind: ScopeKind,
    membership_id: &str,
    grant: &RoleGrant,
    custom_role_id: Option<&str>,
) -> Result<(), StorageError> {
    let t = tables(kind);
    let query = format!(
        r#"
        INSERT INTO {membership_roles}
            (membership_id, role, custom_role_id, is_temporary,
             temporary_access_start_time, temporary_access_end_time)
        VALUES ($1::uuid, $2, $3::uuid, $4, $5, $6)
        "#,
        membership_roles = t.membership_roles,
    );

    sqlx::query(&query)
        .bind(membership_id)
        .bind(&grant.role)
        .bind(custom_role_id)
        .bind(grant.is_temporary)
        .bind(grant.temporary_access_start_time)
        .bind(grant.temporary_access_end_time)
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(())
}

pub async fn set_org_membership_active<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    actor: &ActorRef,
    org_id: &str,
    active: bool,
) -> Result<u64, StorageError> {
    let result = sqlx::query(
        "UPDATE org_memberships SET is_active = $1 WHERE org_id = $2 AND actor_type = $3 AND actor_id = $4",
    )
    .bind(active)
    .bind(org_id)
    .bind(actor.actor_type.as_str())
    .bind(&actor.actor_id)
    .execute(executor)
    .await
    .map_err(to_storage_error)?;
    Ok(result.rows_affected())
}

pub async fn upsert_service_token<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    token_id: &str,
    project_id: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO service_tokens (id, project_id) VALUES ($1, $2) \
         ON CONFLICT (id) DO UPDATE SET project_id = EXCLUDED.project_id",
    )
    .bind(token_id)
    .bind(project_id)
    .execute(executor)
    .await
    .map_err(to_storage_error)?;
    Ok(())
}

pub async fn service_token_project<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    token_id: &str,
) -> Result<Option<String>, StorageError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT project_id FROM service_tokens WHERE id = $1")
        .bind(token_id)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(|r| r.0))
}
