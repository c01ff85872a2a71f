//! Serialized custom-role rule blobs.
//!
//! Two layouts are accepted. The packed layout is a JSON array of rule
//! arrays `[actions, subjects, conditions, inverted, fields, reason]` where
//! `actions` and `subjects` are comma-joined strings (or string arrays),
//! absent conditions are `0`, `inverted` is `1`/`0`, and trailing entries may
//! be omitted. The record layout is
//! `{"version": 2, "rules": [{"actions", "subjects", "conditions", "inverted"}]}`.
//! Either may arrive wrapped in a JSON string.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::domain::{PermissionAction, PermissionSubject, UnknownVariant};

use super::condition::{ConditionError, Conditions};
use super::rule::{Rule, RuleError};

const RECORDS_VERSION: u64 = 2;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed rule blob: {0}")]
    Malformed(String),

    #[error("unsupported rule blob version {0}")]
    UnsupportedVersion(String),

    #[error("rule {index}: {source}")]
    InvalidRule { index: usize, source: RuleError },

    #[error("rule {index}: {source}")]
    UnknownName { index: usize, source: UnknownVariant },

    #[error("rule {index}: {source}")]
    Condition {
        index: usize,
        source: ConditionError,
    },

    #[error("rule {index} restricts fields, which is not supported")]
    FieldRestricted { index: usize },
}

pub fn decode_rules<A, S>(blob: &Value) -> Result<Vec<Rule<A, S>>, DecodeError>
where
    A: PermissionAction,
    S: PermissionSubject,
{
    match blob {
        Value::String(text) => {
            let inner: Value = serde_json::from_str(text)
                .map_err(|e| DecodeError::Malformed(format!("invalid JSON text: {e}")))?;
            if inner.is_string() {
                return Err(DecodeError::Malformed(
                    "rule blob is wrapped in more than one string".to_string(),
                ));
            }
            decode_rules(&inner)
        }
        Value::Array(entries) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| decode_packed_entry(index, entry))
            .collect(),
        Value::Object(fields) => decode_records(fields),
        other => Err(DecodeError::Malformed(format!(
            "expected array or object, found {}",
            type_name(other)
        ))),
    }
}

/// Encodes rules in the packed layout.
pub fn encode_rules<A, S>(rules: &[Rule<A, S>]) -> Value
where
    A: PermissionAction,
    S: PermissionSubject,
{
    Value::Array(
        rules
            .iter()
            .map(|rule| {
                let mut entry = vec![
                    Value::String(join(rule.actions())),
                    Value::String(join(rule.subjects())),
                ];
                if rule.is_conditional() || rule.is_inverted() {
                    entry.push(rule.conditions().map_or(json!(0), Conditions::to_value));
                }
                if rule.is_inverted() {
                    entry.push(json!(1));
                }
                Value::Array(entry)
            })
            .collect(),
    )
}

/// Encodes rules in the versioned record layout.
pub fn encode_rule_records<A, S>(rules: &[Rule<A, S>]) -> Value
where
    A: PermissionAction,
    S: PermissionSubject,
{
    let records: Vec<Value> = rules
        .iter()
        .map(|rule| {
            let mut record = Map::new();
            record.insert("actions".into(), json!(names(rule.actions())));
            record.insert("subjects".into(), json!(names(rule.subjects())));
            if let Some(conditions) = rule.conditions() {
                record.insert("conditions".into(), conditions.to_value());
            }
            if rule.is_inverted() {
                record.insert("inverted".into(), Value::Bool(true));
            }
            Value::Object(record)
        })
        .collect();

    json!({ "version": RECORDS_VERSION, "rules": records })
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleRecord {
    actions: Vec<String>,
    subjects: Vec<String>,
    #[serde(default)]
    conditions: Option<Value>,
    #[serde(default)]
    inverted: bool,
}

fn decode_records<A, S>(fields: &Map<String, Value>) -> Result<Vec<Rule<A, S>>, DecodeError>
where
    A: PermissionAction,
    S: PermissionSubject,
{
    match fields.get("version") {
        Some(Value::Number(n)) if n.as_u64() == Some(RECORDS_VERSION) => {}
        Some(other) => return Err(DecodeError::UnsupportedVersion(other.to_string())),
        None => {
            return Err(DecodeError::Malformed(
                "rule record blob has no version".to_string(),
            ));
        }
    }

    let Some(Value::Array(records)) = fields.get("rules") else {
        return Err(DecodeError::Malformed(
            "rule record blob has no rules array".to_string(),
        ));
    };

    records
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let record = RuleRecord::deserialize(raw)
                .map_err(|e| DecodeError::Malformed(format!("rule {index}: {e}")))?;
            build_rule(
                index,
                record.actions.iter().map(String::as_str),
                record.subjects.iter().map(String::as_str),
                record.conditions.as_ref(),
                record.inverted,
            )
        })
        .collect()
}

fn decode_packed_entry<A, S>(index: usize, entry: &Value) -> Result<Rule<A, S>, DecodeError>
where
    A: PermissionAction,
    S: PermissionSubject,
{
    let Value::Array(parts) = entry else {
        return Err(DecodeError::Malformed(format!(
            "rule {index}: expected array, found {}",
            type_name(entry)
        )));
    };
    if parts.len() < 2 || parts.len() > 6 {
        return Err(DecodeError::Malformed(format!(
            "rule {index}: expected 2 to 6 elements, found {}",
            parts.len()
        )));
    }

    let actions = name_list(index, "actions", &parts[0])?;
    let subjects = name_list(index, "subjects", &parts[1])?;

    let conditions = match parts.get(2) {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) if n.as_u64() == Some(0) => None,
        Some(value @ Value::Object(_)) => Some(value),
        Some(other) => {
            return Err(DecodeError::Malformed(format!(
                "rule {index}: conditions must be an object or 0, found {}",
                type_name(other)
            )));
        }
    };

    let inverted = match parts.get(3) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) if n.as_u64() == Some(0) => false,
        Some(Value::Number(n)) if n.as_u64() == Some(1) => true,
        Some(other) => {
            return Err(DecodeError::Malformed(format!(
                "rule {index}: inverted must be 0, 1 or a boolean, found {other}"
            )));
        }
    };

    if let Some(fields) = parts.get(4)
        && !is_unset(fields)
    {
        return Err(DecodeError::FieldRestricted { index });
    }

    build_rule(
        index,
        actions.iter().copied(),
        subjects.iter().copied(),
        conditions,
        inverted,
    )
}

fn build_rule<'a, A, S>(
    index: usize,
    actions: impl Iterator<Item = &'a str>,
    subjects: impl Iterator<Item = &'a str>,
    conditions: Option<&Value>,
    inverted: bool,
) -> Result<Rule<A, S>, DecodeError>
where
    A: PermissionAction,
    S: PermissionSubject,
{
    let actions = actions
        .map(str::parse)
        .collect::<Result<Vec<A>, _>>()
        .map_err(|source| DecodeError::UnknownName { index, source })?;
    let subjects = subjects
        .map(str::parse)
        .collect::<Result<Vec<S>, _>>()
        .map_err(|source| DecodeError::UnknownName { index, source })?;
    let conditions = conditions
        .map(Conditions::parse)
        .transpose()
        .map_err(|source| DecodeError::Condition { index, source })?;

    Rule::new(actions, subjects, conditions, inverted)
        .map_err(|source| DecodeError::InvalidRule { index, source })
}

fn name_list<'a>(index: usize, what: &str, value: &'a Value) -> Result<Vec<&'a str>, DecodeError> {
    match value {
        Value::String(joined) => Ok(joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    DecodeError::Malformed(format!("rule {index}: {what} must be strings"))
                })
            })
            .collect(),
        other => Err(DecodeError::Malformed(format!(
            "rule {index}: {what} must be a string or array, found {}",
            type_name(other)
        ))),
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Number(n) => n.as_u64() == Some(0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn names<T: std::fmt::Display>(items: &[T]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::{OrgRule, ProjectAbility, ProjectRule};
    use crate::domain::{OrgAction, OrgSubject, ProjectAction as A, ProjectSubject as S};

    fn decode(blob: Value) -> Result<Vec<ProjectRule>, DecodeError> {
        decode_rules(&blob)
    }

    #[test]
    fn decodes_packed_rules_with_trailing_entries_omitted() {
        let rules = decode(json!([
            ["read,create", "secrets"],
            ["delete", "secrets,secret-folders", 0, 1],
        ]))
        .unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].actions(), &[A::Read, A::Create]);
        assert!(!rules[0].is_inverted());
        assert_eq!(rules[1].subjects(), &[S::Secrets, S::SecretFolders]);
        assert!(rules[1].is_inverted());
    }

    #[test]
    fn decodes_packed_array_names_and_boolean_inverted() {
        let rules = decode(json!([[["readValue"], ["secrets"], 0, true]])).unwrap();

        assert_eq!(rules[0].actions(), &[A::ReadValue]);
        assert!(rules[0].is_inverted());
    }

    #[test]
    fn decodes_packed_conditions() {
        let rules = decode(json!([
            ["readValue", "secrets", { "environment": { "$in": ["dev", "staging"] } }]
        ]))
        .unwrap();

        let ability = ProjectAbility::new(rules);
        assert!(ability.can_on(A::ReadValue, S::Secrets, &json!({ "environment": "dev" })));
        assert!(!ability.can_on(A::ReadValue, S::Secrets, &json!({ "environment": "prod" })));
    }

    #[test]
    fn decodes_blob_wrapped_in_json_string() {
        let rules = decode(json!("[[\"read\",\"tags\"]]")).unwrap();
        assert_eq!(rules[0].subjects(), &[S::Tags]);
    }

    #[test]
    fn rejects_doubly_wrapped_blob() {
        let err = decode(json!("\"[[\\\"read\\\",\\\"tags\\\"]]\"")).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn reason_is_ignored() {
        let rules = decode(json!([["read", "tags", 0, 0, 0, "legacy grant"]])).unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn field_restricted_rule_fails_whole_blob() {
        let err = decode(json!([
            ["read", "tags"],
            ["read", "secrets", 0, 0, ["secretValue"]],
        ]))
        .unwrap_err();

        assert!(matches!(err, DecodeError::FieldRestricted { index: 1 }));
    }

    #[test]
    fn unknown_action_is_reported_with_index() {
        let err = decode(json!([["read", "tags"], ["teleport", "tags"]])).unwrap_err();

        match err {
            DecodeError::UnknownName { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(source.value, "teleport");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_action_list_is_invalid() {
        let err = decode(json!([["", "tags"]])).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidRule {
                index: 0,
                source: RuleError::EmptyActions
            }
        ));
    }

    #[test]
    fn unsupported_operator_is_a_decode_error() {
        let err = decode(json!([["read", "secrets", { "size": { "$gt": 1 } }]])).unwrap_err();
        assert!(matches!(err, DecodeError::Condition { index: 0, .. }));
    }

    #[test]
    fn deny_with_logical_operator_fails_whole_blob() {
        let err = decode(json!([
            ["readValue", "secrets"],
            ["readValue", "secrets", { "$or": [{ "environment": "prod" }, { "environment": "staging" }] }, 1]
        ]))
        .unwrap_err();

        assert!(matches!(
            err,
            DecodeError::Condition {
                index: 1,
                source: ConditionError::UnsupportedOperator(_)
            }
        ));
    }

    #[test]
    fn scalar_blob_is_malformed() {
        assert!(matches!(decode(json!(42)), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(json!("not json")), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn decodes_records_layout() {
        let rules = decode(json!({
            "version": 2,
            "rules": [
                { "actions": ["read"], "subjects": ["secrets"] },
                { "actions": ["read"], "subjects": ["secrets"], "inverted": true,
                  "conditions": { "secretPath": { "$glob": "/prod/**" } } }
            ]
        }))
        .unwrap();

        let ability = ProjectAbility::new(rules);
        assert!(ability.can_on(A::Read, S::Secrets, &json!({ "secretPath": "/dev/db" })));
        assert!(!ability.can_on(A::Read, S::Secrets, &json!({ "secretPath": "/prod/db" })));
    }

    #[test]
    fn rejects_unknown_records_version() {
        let err = decode(json!({ "version": 3, "rules": [] })).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion(v) if v == "3"));
    }

    #[test]
    fn rejects_unknown_record_fields() {
        let err = decode(json!({
            "version": 2,
            "rules": [{ "actions": ["read"], "subjects": ["tags"], "fields": ["name"] }]
        }))
        .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn project_blob_does_not_decode_into_org_rules() {
        let blob = json!([["readValue", "secrets"]]);
        let result: Result<Vec<OrgRule>, _> = decode_rules(&blob);
        assert!(matches!(result, Err(DecodeError::UnknownName { .. })));
    }

    #[test]
    fn encoded_rules_answer_queries_identically() {
        let original = vec![
            ProjectRule::allow([A::Read, A::DescribeSecret], [S::Secrets]).unwrap(),
            ProjectRule::allow([A::ReadValue], [S::Secrets])
                .unwrap()
                .with_conditions(
                    Conditions::parse(&json!({
                        "environment": "dev",
                        "secretPath": { "$glob": "/app/**" }
                    }))
                    .unwrap(),
                ),
            ProjectRule::deny([A::Delete], [S::SecretFolders]).unwrap(),
            ProjectRule::allow([A::Read], [S::All]).unwrap(),
        ];

        let queries = [
            (A::Read, S::Secrets, None),
            (A::ReadValue, S::Secrets, Some(json!({ "environment": "dev", "secretPath": "/app/x" }))),
            (A::ReadValue, S::Secrets, Some(json!({ "environment": "prod", "secretPath": "/app/x" }))),
            (A::ReadValue, S::Secrets, Some(json!({ "environment": "dev", "secretPath": "/ops/x" }))),
            (A::Delete, S::SecretFolders, None),
            (A::Read, S::Tags, None),
            (A::Edit, S::Tags, None),
        ];

        let expected = ProjectAbility::new(original.clone());
        for encoded in [encode_rules(&original), encode_rule_records(&original)] {
            let decoded = ProjectAbility::new(decode(encoded).unwrap());
            for (action, subject, instance) in &queries {
                assert_eq!(
                    decoded.check(*action, *subject, instance.as_ref()),
                    expected.check(*action, *subject, instance.as_ref()),
                    "{action} {subject} {instance:?}"
                );
            }
        }
    }

    #[test]
    fn packed_encoding_omits_default_trailing_entries() {
        let rules = vec![
            OrgRule::allow([OrgAction::Read], [OrgSubject::Member]).unwrap(),
            OrgRule::deny([OrgAction::Delete], [OrgSubject::Member]).unwrap(),
        ];

        assert_eq!(
            encode_rules(&rules),
            json!([["read", "member"], ["delete", "member", 0, 1]])
        );
    }
}
