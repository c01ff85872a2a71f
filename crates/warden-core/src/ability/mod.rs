mod condition;
mod packed;
mod rule;

pub use condition::{ConditionError, Conditions, GlobPattern, Predicate};
pub use packed::{DecodeError, decode_rules, encode_rule_records, encode_rules};
pub use rule::{Rule, RuleError};

use serde_json::Value;

use crate::domain::{
    Domain, OrgAction, OrgSubject, PermissionAction, PermissionSubject, ProjectAction,
    ProjectSubject,
};

pub type ProjectRule = Rule<ProjectAction, ProjectSubject>;
pub type OrgRule = Rule<OrgAction, OrgSubject>;
pub type ProjectAbility = Ability<ProjectAction, ProjectSubject>;
pub type OrgAbility = Ability<OrgAction, OrgSubject>;
pub type DomainRule<D> = Rule<<D as Domain>::Action, <D as Domain>::Subject>;
pub type DomainAbility<D> = Ability<<D as Domain>::Action, <D as Domain>::Subject>;

/// Ordered rule list for one actor in one scope.
///
/// Queries resolve with last-match-wins: the final rule that applies to the
/// `(action, subject)` pair and whose conditions hold decides the outcome.
/// No applicable rule means deny.
#[derive(Debug, Clone, PartialEq)]
pub struct Ability<A, S> {
    rules: Vec<Rule<A, S>>,
}

impl<A, S> Default for Ability<A, S> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<A: PermissionAction, S: PermissionSubject> Ability<A, S> {
    pub fn new(rules: Vec<Rule<A, S>>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> AbilityBuilder<A, S> {
        AbilityBuilder::default()
    }

    pub fn rules(&self) -> &[Rule<A, S>] {
        &self.rules
    }

    pub fn into_rules(self) -> Vec<Rule<A, S>> {
        self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// The rule that decides the query, if any.
    pub fn relevant_rule(
        &self,
        action: A,
        subject: S,
        instance: Option<&Value>,
    ) -> Option<&Rule<A, S>> {
        self.rules
            .iter()
            .rev()
            .find(|r| r.applies_to(action, subject) && r.matches_instance(instance))
    }

    pub fn check(&self, action: A, subject: S, instance: Option<&Value>) -> bool {
        self.relevant_rule(action, subject, instance)
            .is_some_and(|r| !r.is_inverted())
    }

    /// Type-level check: can the actor perform `action` on some `subject`.
    pub fn can(&self, action: A, subject: S) -> bool {
        self.check(action, subject, None)
    }

    /// Instance-level check against a concrete JSON object.
    pub fn can_on(&self, action: A, subject: S, instance: &Value) -> bool {
        self.check(action, subject, Some(instance))
    }

    pub fn cannot(&self, action: A, subject: S) -> bool {
        !self.can(action, subject)
    }
}

impl<A, S> FromIterator<Rule<A, S>> for Ability<A, S> {
    fn from_iter<I: IntoIterator<Item = Rule<A, S>>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Accumulates rules in insertion order.
#[derive(Debug)]
pub struct AbilityBuilder<A, S> {
    rules: Vec<Rule<A, S>>,
}

impl<A, S> Default for AbilityBuilder<A, S> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<A: PermissionAction, S: PermissionSubject> AbilityBuilder<A, S> {
    pub fn push(&mut self, rule: Rule<A, S>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn extend(&mut self, rules: impl IntoIterator<Item = Rule<A, S>>) -> &mut Self {
        self.rules.extend(rules);
        self
    }

    pub fn allow(&mut self, actions: &[A], subjects: &[S]) -> Result<&mut Self, RuleError> {
        let rule = Rule::allow(actions.iter().copied(), subjects.iter().copied())?;
        Ok(self.push(rule))
    }

    pub fn deny(&mut self, actions: &[A], subjects: &[S]) -> Result<&mut Self, RuleError> {
        let rule = Rule::deny(actions.iter().copied(), subjects.iter().copied())?;
        Ok(self.push(rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn build(self) -> Ability<A, S> {
        Ability { rules: self.rules }
    }
}
