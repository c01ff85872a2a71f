use serde_json::Value;

use crate::domain::{PermissionAction, PermissionSubject};

use super::condition::Conditions;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("rule must name at least one action")]
    EmptyActions,

    #[error("rule must name at least one subject")]
    EmptySubjects,
}

/// A single allow or deny statement over a set of actions and subjects.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule<A, S> {
    actions: Vec<A>,
    subjects: Vec<S>,
    conditions: Option<Conditions>,
    inverted: bool,
}

impl<A: PermissionAction, S: PermissionSubject> Rule<A, S> {
    pub fn new(
        actions: impl IntoIterator<Item = A>,
        subjects: impl IntoIterator<Item = S>,
        conditions: Option<Conditions>,
        inverted: bool,
    ) -> Result<Self, RuleError> {
        let actions = dedup(actions);
        if actions.is_empty() {
            return Err(RuleError::EmptyActions);
        }
        let subjects = dedup(subjects);
        if subjects.is_empty() {
            return Err(RuleError::EmptySubjects);
        }

        Ok(Self {
            actions,
            subjects,
            conditions: conditions.filter(|c| !c.is_empty()),
            inverted,
        })
    }

    pub fn allow(
        actions: impl IntoIterator<Item = A>,
        subjects: impl IntoIterator<Item = S>,
    ) -> Result<Self, RuleError> {
        Self::new(actions, subjects, None, false)
    }

    pub fn deny(
        actions: impl IntoIterator<Item = A>,
        subjects: impl IntoIterator<Item = S>,
    ) -> Result<Self, RuleError> {
        Self::new(actions, subjects, None, true)
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions).filter(|c| !c.is_empty());
        self
    }

    /// Allow rule over static, non-empty tables.
    pub(crate) fn grant(actions: &[A], subjects: &[S]) -> Self {
        debug_assert!(!actions.is_empty() && !subjects.is_empty());
        Self {
            actions: dedup(actions.iter().copied()),
            subjects: dedup(subjects.iter().copied()),
            conditions: None,
            inverted: false,
        }
    }

    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    pub fn subjects(&self) -> &[S] {
        &self.subjects
    }

    pub fn conditions(&self) -> Option<&Conditions> {
        self.conditions.as_ref()
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn is_conditional(&self) -> bool {
        self.conditions.is_some()
    }

    /// Whether the rule speaks about `action` on `subject`, ignoring conditions.
    pub fn applies_to(&self, action: A, subject: S) -> bool {
        self.actions.contains(&action)
            && self
                .subjects
                .iter()
                .any(|s| *s == subject || s.is_wildcard())
    }

    /// Condition check for one query.
    ///
    /// Without an instance a conditional allow counts as a match (the actor
    /// can act on some instance) and a conditional deny is skipped. A
    /// condition that fails to evaluate never matches.
    pub fn matches_instance(&self, instance: Option<&Value>) -> bool {
        let Some(conditions) = &self.conditions else {
            return true;
        };
        let Some(instance) = instance else {
            return !self.inverted;
        };

        match conditions.matches(instance) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::debug!(error = %e, "condition evaluation failed, treating as non-match");
                false
            }
        }
    }

    /// Every `(action, subject)` pair the rule covers.
    pub fn pairs(&self) -> impl Iterator<Item = (A, S)> + '_ {
        self.actions
            .iter()
            .flat_map(move |a| self.subjects.iter().map(move |s| (*a, *s)))
    }
}

fn dedup<T: PartialEq>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProjectAction, ProjectSubject};
    use serde_json::json;

    type ProjectRule = Rule<ProjectAction, ProjectSubject>;

    #[test]
    fn empty_actions_are_rejected() {
        let err = ProjectRule::allow([], [ProjectSubject::Secrets]).unwrap_err();
        assert_eq!(err, RuleError::EmptyActions);
    }

    #[test]
    fn empty_subjects_are_rejected() {
        let err = ProjectRule::allow([ProjectAction::Read], []).unwrap_err();
        assert_eq!(err, RuleError::EmptySubjects);
    }

    #[test]
    fn duplicates_collapse_in_first_seen_order() {
        let rule = ProjectRule::allow(
            [ProjectAction::Edit, ProjectAction::Read, ProjectAction::Edit],
            [ProjectSubject::Tags],
        )
        .unwrap();

        assert_eq!(rule.actions(), &[ProjectAction::Edit, ProjectAction::Read]);
    }

    #[test]
    fn wildcard_subject_applies_to_every_subject() {
        let rule = ProjectRule::allow([ProjectAction::Read], [ProjectSubject::All]).unwrap();

        assert!(rule.applies_to(ProjectAction::Read, ProjectSubject::Secrets));
        assert!(rule.applies_to(ProjectAction::Read, ProjectSubject::All));
        assert!(!rule.applies_to(ProjectAction::Edit, ProjectSubject::Secrets));
    }

    #[test]
    fn concrete_subject_does_not_cover_wildcard_query() {
        let rule = ProjectRule::allow([ProjectAction::Read], [ProjectSubject::Secrets]).unwrap();
        assert!(!rule.applies_to(ProjectAction::Read, ProjectSubject::All));
    }

    #[test]
    fn empty_conditions_normalize_to_none() {
        let rule = ProjectRule::allow([ProjectAction::Read], [ProjectSubject::Secrets])
            .unwrap()
            .with_conditions(Conditions::parse(&json!({})).unwrap());

        assert!(!rule.is_conditional());
    }

    #[test]
    fn conditional_rules_without_instance() {
        let conditions = Conditions::parse(&json!({ "environment": "prod" })).unwrap();
        let allow = ProjectRule::allow([ProjectAction::Read], [ProjectSubject::Secrets])
            .unwrap()
            .with_conditions(conditions.clone());
        let deny = ProjectRule::deny([ProjectAction::Read], [ProjectSubject::Secrets])
            .unwrap()
            .with_conditions(conditions);

        assert!(allow.matches_instance(None));
        assert!(!deny.matches_instance(None));
    }

    #[test]
    fn condition_errors_do_not_match() {
        let rule = ProjectRule::allow([ProjectAction::Read], [ProjectSubject::Secrets])
            .unwrap()
            .with_conditions(Conditions::parse(&json!({ "environment": "prod" })).unwrap());

        assert!(!rule.matches_instance(Some(&json!(["not", "an", "object"]))));
        assert!(rule.matches_instance(Some(&json!({ "environment": "prod" }))));
    }

    #[test]
    fn pairs_expand_cartesian_product() {
        let rule = ProjectRule::allow(
            [ProjectAction::Read, ProjectAction::Create],
            [ProjectSubject::Tags, ProjectSubject::Webhooks],
        )
        .unwrap();

        let pairs: Vec<_> = rule.pairs().collect();
        assert_eq!(pairs.len(), 4);
        assert!(pairs.contains(&(ProjectAction::Create, ProjectSubject::Webhooks)));
    }
}
