use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use warden_core::assignment::{ActorRef, CustomRole, RoleAssignment, ScopeRef};
use warden_core::engine::{AssignmentReader, ResolveError};

use crate::audit;
use crate::config::CacheSettings;
use crate::metrics::Metrics;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    actor: ActorRef,
    scope: ScopeRef,
    scope_generation: u64,
    actor_generation: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    rows: Vec<RoleAssignment>,
    inserted_at: Instant,
}

/// Read-through cache of raw assignment rows, never of abilities; the
/// temporal filter still runs on every resolution.
///
/// Entries live for at most the TTL. Invalidating a scope or an actor bumps
/// its generation; rows fetched under an older generation are never stored
/// or served.
pub struct CachingReader<R> {
    inner: R,
    enabled: bool,
    ttl: Duration,
    max_entries: usize,
    entries: DashMap<CacheKey, CacheEntry>,
    scope_generations: DashMap<ScopeRef, u64>,
    actor_generations: DashMap<ActorRef, u64>,
    metrics: Option<Arc<Metrics>>,
}

impl<R: AssignmentReader> CachingReader<R> {
    pub fn new(inner: R, settings: &CacheSettings) -> Self {
        Self {
            inner,
            enabled: settings.enabled,
            ttl: settings.ttl(),
            max_entries: settings.max_entries,
            entries: DashMap::new(),
            scope_generations: DashMap::new(),
            actor_generations: DashMap::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached row of the scope. Returns how many entries went.
    pub fn invalidate_scope(&self, scope: &ScopeRef) -> usize {
        *self.scope_generations.entry(scope.clone()).or_insert(0) += 1;
        let before = self.entries.len();
        self.entries.retain(|key, _| key.scope != *scope);
        let evicted = before.saturating_sub(self.entries.len());
        audit::audit_cache_invalidation("scope", &scope.to_string(), evicted);
        evicted
    }

    /// Drops every cached row of the actor, in all scopes.
    pub fn invalidate_actor(&self, actor: &ActorRef) -> usize {
        *self.actor_generations.entry(actor.clone()).or_insert(0) += 1;
        let before = self.entries.len();
        self.entries.retain(|key, _| key.actor != *actor);
        let evicted = before.saturating_sub(self.entries.len());
        audit::audit_cache_invalidation("actor", &actor.to_string(), evicted);
        evicted
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn key(&self, actor: &ActorRef, scope: &ScopeRef) -> CacheKey {
        CacheKey {
            actor: actor.clone(),
            scope: scope.clone(),
            scope_generation: self.scope_generations.get(scope).map_or(0, |g| *g),
            actor_generation: self.actor_generations.get(actor).map_or(0, |g| *g),
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<Vec<RoleAssignment>> {
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            return Some(entry.rows.clone());
        }
        drop(entry);
        self.entries.remove(key);
        None
    }

    fn store(&self, key: CacheKey, rows: &[RoleAssignment]) {
        if self.key(&key.actor, &key.scope) != key {
            tracing::debug!(
                actor = %key.actor,
                scope = %key.scope,
                "assignments invalidated while fetching, skipping insert"
            );
            return;
        }
        if self.entries.len() >= self.max_entries {
            let ttl = self.ttl;
            self.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        }
        if self.entries.len() >= self.max_entries {
            tracing::debug!(
                max_entries = self.max_entries,
                "assignment cache full, skipping insert"
            );
            return;
        }
        self.entries.insert(
            key,
            CacheEntry {
                rows: rows.to_vec(),
                inserted_at: Instant::now(),
            },
        );
    }

    fn record_hit(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_hit();
        }
    }

    fn record_miss(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_miss();
        }
    }
}

impl<R: AssignmentReader> AssignmentReader for CachingReader<R> {
    async fn read_assignments(
        &self,
        actor: &ActorRef,
        scope: &ScopeRef,
    ) -> Result<Vec<RoleAssignment>, ResolveError> {
        if !self.enabled {
            return self.inner.read_assignments(actor, scope).await;
        }

        let key = self.key(actor, scope);

        if let Some(rows) = self.lookup(&key) {
            self.record_hit();
            return Ok(rows);
        }
        self.record_miss();

        let rows = self.inner.read_assignments(actor, scope).await?;
        self.store(key, &rows);
        Ok(rows)
    }

    async fn read_custom_role(
        &self,
        scope: &ScopeRef,
        slug: &str,
    ) -> Result<Option<CustomRole>, ResolveError> {
        self.inner.read_custom_role(scope, slug).await
    }

    async fn read_service_token_project(
        &self,
        token_id: &str,
    ) -> Result<Option<String>, ResolveError> {
        self.inner.read_service_token_project(token_id).await
    }
}
