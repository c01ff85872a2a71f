use globset::{GlobBuilder, GlobMatcher};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("conditions must be a JSON object")]
    NotAnObject,

    #[error("condition field path must not be empty")]
    EmptyPath,

    #[error("unsupported condition operator '{0}'")]
    UnsupportedOperator(String),

    #[error("condition on '{0}' mixes operators with plain keys")]
    MixedOperatorObject(String),

    #[error("operator '{operator}' on '{field}' expects an array operand")]
    ExpectedArray { field: String, operator: String },

    #[error("operator '$glob' on '{0}' expects a string pattern")]
    ExpectedPattern(String),

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("instance must be a JSON object")]
    MalformedInstance,

    #[error("field '{0}' must be a string to match a glob")]
    NotAString(String),
}

/// A compiled `$glob` operand. `*` stays within one path segment, `**`
/// crosses segments.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    matcher: GlobMatcher,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, ConditionError> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ConditionError::InvalidGlob {
                pattern: pattern.to_string(),
                reason: e.kind().to_string(),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.matcher.is_match(candidate)
    }
}

impl PartialEq for GlobPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Glob(GlobPattern),
}

impl Predicate {
    fn operator(&self) -> &'static str {
        match self {
            Predicate::Eq(_) => "$eq",
            Predicate::Ne(_) => "$ne",
            Predicate::In(_) => "$in",
            Predicate::Nin(_) => "$nin",
            Predicate::Glob(_) => "$glob",
        }
    }

    fn operand(&self) -> Value {
        match self {
            Predicate::Eq(v) | Predicate::Ne(v) => v.clone(),
            Predicate::In(vs) | Predicate::Nin(vs) => Value::Array(vs.clone()),
            Predicate::Glob(pattern) => Value::String(pattern.as_str().to_string()),
        }
    }

    fn evaluate(&self, path: &str, field: Option<&Value>) -> Result<bool, ConditionError> {
        match self {
            Predicate::Eq(expected) => Ok(field.is_some_and(|v| value_matches(v, expected))),
            Predicate::Ne(expected) => Ok(!field.is_some_and(|v| value_matches(v, expected))),
            Predicate::In(candidates) => Ok(field
                .is_some_and(|v| candidates.iter().any(|c| value_matches(v, c)))),
            Predicate::Nin(candidates) => Ok(!field
                .is_some_and(|v| candidates.iter().any(|c| value_matches(v, c)))),
            Predicate::Glob(pattern) => match field {
                None | Some(Value::Null) => Ok(false),
                Some(Value::String(s)) => Ok(pattern.is_match(s)),
                Some(_) => Err(ConditionError::NotAString(path.to_string())),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    path: String,
    predicates: Vec<Predicate>,
}

/// Field predicates attached to a rule; every clause must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditions {
    clauses: Vec<Clause>,
}

impl Conditions {
    pub fn parse(value: &Value) -> Result<Self, ConditionError> {
        let Value::Object(fields) = value else {
            return Err(ConditionError::NotAnObject);
        };

        let mut clauses = Vec::with_capacity(fields.len());
        for (path, spec) in fields {
            if path.is_empty() || path.split('.').any(str::is_empty) {
                return Err(ConditionError::EmptyPath);
            }
            // `$or`, `$and` and friends are rejected, not read as field names.
            if let Some(segment) = path.split('.').find(|s| s.starts_with('$')) {
                return Err(ConditionError::UnsupportedOperator(segment.to_string()));
            }
            clauses.push(Clause {
                path: path.clone(),
                predicates: parse_predicates(path, spec)?,
            });
        }

        Ok(Self { clauses })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(|c| c.path.as_str())
    }

    pub fn matches(&self, instance: &Value) -> Result<bool, ConditionError> {
        if !instance.is_object() {
            return Err(ConditionError::MalformedInstance);
        }

        for clause in &self.clauses {
            let field = lookup(instance, &clause.path);
            for predicate in &clause.predicates {
                if !predicate.evaluate(&clause.path, field)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        for clause in &self.clauses {
            let spec = match clause.predicates.as_slice() {
                [Predicate::Eq(v)] if !is_operator_object(v) => v.clone(),
                predicates => Value::Object(
                    predicates
                        .iter()
                        .map(|p| (p.operator().to_string(), p.operand()))
                        .collect(),
                ),
            };
            out.insert(clause.path.clone(), spec);
        }
        Value::Object(out)
    }
}

fn parse_predicates(path: &str, spec: &Value) -> Result<Vec<Predicate>, ConditionError> {
    let Value::Object(ops) = spec else {
        return Ok(vec![Predicate::Eq(spec.clone())]);
    };

    let operator_keys = ops.keys().filter(|k| k.starts_with('$')).count();
    if operator_keys == 0 {
        return Ok(vec![Predicate::Eq(spec.clone())]);
    }
    if operator_keys != ops.len() {
        return Err(ConditionError::MixedOperatorObject(path.to_string()));
    }

    ops.iter()
        .map(|(op, operand)| match op.as_str() {
            "$eq" => Ok(Predicate::Eq(operand.clone())),
            "$ne" => Ok(Predicate::Ne(operand.clone())),
            "$in" => array_operand(path, op, operand).map(Predicate::In),
            "$nin" => array_operand(path, op, operand).map(Predicate::Nin),
            "$glob" => match operand {
                Value::String(pattern) => GlobPattern::new(pattern).map(Predicate::Glob),
                _ => Err(ConditionError::ExpectedPattern(path.to_string())),
            },
            other => Err(ConditionError::UnsupportedOperator(other.to_string())),
        })
        .collect()
}

fn array_operand(path: &str, op: &str, operand: &Value) -> Result<Vec<Value>, ConditionError> {
    match operand {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(ConditionError::ExpectedArray {
            field: path.to_string(),
            operator: op.to_string(),
        }),
    }
}

fn is_operator_object(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|m| m.keys().any(|k| k.starts_with('$')))
}

/// Equality with array containment: a field holding an array matches a
/// scalar operand when any element equals it.
fn value_matches(field: &Value, expected: &Value) -> bool {
    if field == expected {
        return true;
    }
    match field {
        Value::Array(items) if !expected.is_array() => items.iter().any(|item| item == expected),
        _ => false,
    }
}

fn lookup<'a>(instance: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(instance, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conditions(value: Value) -> Conditions {
        Conditions::parse(&value).unwrap()
    }

    #[test]
    fn plain_value_is_equality() {
        let c = conditions(json!({ "environment": "prod" }));

        assert!(c.matches(&json!({ "environment": "prod" })).unwrap());
        assert!(!c.matches(&json!({ "environment": "dev" })).unwrap());
        assert!(!c.matches(&json!({})).unwrap());
    }

    #[test]
    fn equality_matches_array_members() {
        let c = conditions(json!({ "tags": "billing" }));

        assert!(c.matches(&json!({ "tags": ["infra", "billing"] })).unwrap());
        assert!(!c.matches(&json!({ "tags": ["infra"] })).unwrap());
    }

    #[test]
    fn in_operator_accepts_any_listed_value() {
        let c = conditions(json!({ "environment": { "$in": ["dev", "staging"] } }));

        assert!(c.matches(&json!({ "environment": "staging" })).unwrap());
        assert!(!c.matches(&json!({ "environment": "prod" })).unwrap());
        assert!(!c.matches(&json!({})).unwrap());
    }

    #[test]
    fn negated_operators_match_missing_fields() {
        let ne = conditions(json!({ "environment": { "$ne": "prod" } }));
        let nin = conditions(json!({ "environment": { "$nin": ["prod"] } }));

        assert!(ne.matches(&json!({})).unwrap());
        assert!(nin.matches(&json!({})).unwrap());
        assert!(!ne.matches(&json!({ "environment": "prod" })).unwrap());
        assert!(!nin.matches(&json!({ "environment": "prod" })).unwrap());
    }

    #[test]
    fn dot_path_reaches_nested_fields() {
        let c = conditions(json!({ "metadata.owner.team": "platform" }));

        let instance = json!({ "metadata": { "owner": { "team": "platform" } } });
        assert!(c.matches(&instance).unwrap());

        let other = json!({ "metadata": { "owner": "platform" } });
        assert!(!c.matches(&other).unwrap());
    }

    #[test]
    fn dot_path_indexes_arrays() {
        let c = conditions(json!({ "approvers.0": "alice" }));

        assert!(c.matches(&json!({ "approvers": ["alice", "bob"] })).unwrap());
        assert!(!c.matches(&json!({ "approvers": ["bob", "alice"] })).unwrap());
    }

    #[test]
    fn glob_single_star_stays_in_segment() {
        let c = conditions(json!({ "secretPath": { "$glob": "/app/*" } }));

        assert!(c.matches(&json!({ "secretPath": "/app/db" })).unwrap());
        assert!(!c.matches(&json!({ "secretPath": "/app/db/nested" })).unwrap());
    }

    #[test]
    fn glob_double_star_crosses_segments() {
        let c = conditions(json!({ "secretPath": { "$glob": "/app/**" } }));

        assert!(c.matches(&json!({ "secretPath": "/app/db/nested" })).unwrap());
        assert!(!c.matches(&json!({ "secretPath": "/other/db" })).unwrap());
    }

    #[test]
    fn glob_on_non_string_field_is_an_evaluation_error() {
        let c = conditions(json!({ "secretPath": { "$glob": "/app/*" } }));

        let err = c.matches(&json!({ "secretPath": 42 })).unwrap_err();
        assert_eq!(err, ConditionError::NotAString("secretPath".to_string()));
    }

    #[test]
    fn multiple_operators_are_conjunctive() {
        let c = conditions(json!({
            "secretPath": { "$glob": "/app/**", "$ne": "/app/root" }
        }));

        assert!(c.matches(&json!({ "secretPath": "/app/db" })).unwrap());
        assert!(!c.matches(&json!({ "secretPath": "/app/root" })).unwrap());
    }

    #[test]
    fn all_clauses_must_hold() {
        let c = conditions(json!({
            "environment": "prod",
            "secretPath": { "$glob": "/app/**" }
        }));

        assert!(c.matches(&json!({ "environment": "prod", "secretPath": "/app/x" })).unwrap());
        assert!(!c.matches(&json!({ "environment": "dev", "secretPath": "/app/x" })).unwrap());
    }

    #[test]
    fn non_object_instance_is_rejected() {
        let c = conditions(json!({ "environment": "prod" }));

        assert_eq!(
            c.matches(&json!("prod")).unwrap_err(),
            ConditionError::MalformedInstance
        );
    }

    #[test]
    fn unsupported_operator_fails_parsing() {
        let err = Conditions::parse(&json!({ "size": { "$gt": 3 } })).unwrap_err();
        assert_eq!(err, ConditionError::UnsupportedOperator("$gt".to_string()));
    }

    #[test]
    fn logical_operator_keys_fail_parsing() {
        let or = Conditions::parse(&json!({
            "$or": [{ "environment": "prod" }, { "environment": "staging" }]
        }))
        .unwrap_err();
        let nested = Conditions::parse(&json!({ "metadata.$not": { "team": "x" } })).unwrap_err();

        assert_eq!(or, ConditionError::UnsupportedOperator("$or".to_string()));
        assert_eq!(nested, ConditionError::UnsupportedOperator("$not".to_string()));
    }

    #[test]
    fn mixed_operator_object_fails_parsing() {
        let err = Conditions::parse(&json!({ "env": { "$eq": "a", "name": "b" } })).unwrap_err();
        assert_eq!(err, ConditionError::MixedOperatorObject("env".to_string()));
    }

    #[test]
    fn in_operand_must_be_array() {
        let err = Conditions::parse(&json!({ "env": { "$in": "prod" } })).unwrap_err();
        assert!(matches!(err, ConditionError::ExpectedArray { .. }));
    }

    #[test]
    fn empty_path_segment_fails_parsing() {
        let err = Conditions::parse(&json!({ "metadata..team": "x" })).unwrap_err();
        assert_eq!(err, ConditionError::EmptyPath);
    }

    #[test]
    fn to_value_reproduces_parsed_form() {
        let original = json!({
            "environment": "prod",
            "secretPath": { "$glob": "/app/**" },
            "tags": { "$in": ["a", "b"] }
        });

        let c = conditions(original.clone());
        assert_eq!(c.to_value(), original);
    }
}
