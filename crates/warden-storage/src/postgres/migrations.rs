use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS project_roles (
        id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        project_id  TEXT NOT NULL,
        name        TEXT NOT NULL,
        slug        TEXT NOT NULL,
        permissions JSONB,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (project_id, slug)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS org_roles (
        id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        org_id      TEXT NOT NULL,
        name        TEXT NOT NULL,
        slug        TEXT NOT NULL,
        permissions JSONB,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (org_id, slug)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS project_memberships (
        id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        project_id  TEXT NOT NULL,
        actor_type  TEXT NOT NULL CHECK (actor_type IN ('user', 'identity')),
        actor_id    TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (project_id, actor_type, actor_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS project_membership_roles (
        id                          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        membership_id               UUID NOT NULL REFERENCES project_memberships(id) ON DELETE CASCADE,
        role                        TEXT NOT NULL,
        custom_role_id              UUID REFERENCES project_roles(id) ON DELETE SET NULL,
        is_temporary                BOOLEAN NOT NULL DEFAULT false,
        temporary_access_start_time TIMESTAMPTZ,
        temporary_access_end_time   TIMESTAMPTZ,
        created_at                  TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS org_memberships (
        id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        org_id      TEXT NOT NULL,
        actor_type  TEXT NOT NULL CHECK (actor_type IN ('user', 'identity')),
        actor_id    TEXT NOT NULL,
        is_active   BOOLEAN NOT NULL DEFAULT true,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (org_id, actor_type, actor_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS org_membership_roles (
        id                          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        membership_id               UUID NOT NULL REFERENCES org_memberships(id) ON DELETE CASCADE,
        role                        TEXT NOT NULL,
        custom_role_id              UUID REFERENCES org_roles(id) ON DELETE SET NULL,
        is_temporary                BOOLEAN NOT NULL DEFAULT false,
        temporary_access_start_time TIMESTAMPTZ,
        temporary_access_end_time   TIMESTAMPTZ,
        created_at                  TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS service_tokens (
        id          TEXT PRIMARY KEY,
        project_id  TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_project_membership_roles_membership ON project_membership_roles (membership_id)",
    "CREATE INDEX IF NOT EXISTS idx_org_membership_roles_membership ON org_membership_roles (membership_id)",
];

/// Creates the membership, role and service token tables. Idempotent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
