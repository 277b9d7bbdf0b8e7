//! Parsing of structured LLM output into apps and criteria.

use apprank_store::NewCriterion;
use apprank_utils::types::ResponseFields;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::AppRankError;

/// Apps in rank order (duplicates removed) and the criteria the model used.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedResponse {
    pub apps: Vec<String>,
    pub criteria: Vec<NewCriterion>,
}

/// Parse one completion.
///
/// A JSON string whose content is itself JSON is unwrapped exactly once.
/// Missing or `null` app and criteria lists count as empty. Criteria fields
/// that are missing or not strings fall back to "Unnamed Criterion" and "".
///
/// # Errors
///
/// Returns `AppRankError::InvalidResponse` when the content (after the one
/// unwrap) is not a JSON object or its lists hold unexpected values.
pub fn parse_response(content: &str, fields: &ResponseFields) -> Result<ParsedResponse, AppRankError> {
    let mut value: Value = serde_json::from_str(content)
        .map_err(|e| AppRankError::InvalidResponse(e.to_string()))?;
    if let Value::String(inner) = &value {
        debug!("Unwrapping double-encoded response");
        value = serde_json::from_str(inner)
            .map_err(|e| AppRankError::InvalidResponse(e.to_string()))?;
    }

    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(AppRankError::InvalidResponse(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            )));
        }
    };

    Ok(ParsedResponse {
        apps: parse_apps(&object, &fields.apps)?,
        criteria: parse_criteria(&object, fields)?,
    })
}

fn parse_apps(object: &Map<String, Value>, key: &str) -> Result<Vec<String>, AppRankError> {
    let items = list(object, key)?;
    if items.is_empty() {
        warn!(field = key, "Response contains no apps");
    }

    let mut apps: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Value::String(name) = item else {
            return Err(AppRankError::InvalidResponse(format!(
                "'{key}' must hold strings, got {}",
                type_name(item)
            )));
        };
        if !apps.contains(name) {
            apps.push(name.clone());
        }
    }
    Ok(apps)
}

fn parse_criteria(
    object: &Map<String, Value>,
    fields: &ResponseFields,
) -> Result<Vec<NewCriterion>, AppRankError> {
    list(object, &fields.criteria)?
        .iter()
        .map(|item| {
            let Value::Object(criterion) = item else {
                return Err(AppRankError::InvalidResponse(format!(
                    "'{}' must hold objects, got {}",
                    fields.criteria,
                    type_name(item)
                )));
            };
            let defaults = NewCriterion::default();
            Ok(NewCriterion {
                name: string_field(criterion, &fields.criterion_name).unwrap_or(defaults.name),
                description: string_field(criterion, &fields.criterion_description)
                    .unwrap_or(defaults.description),
            })
        })
        .collect()
}

fn list<'v>(object: &'v Map<String, Value>, key: &str) -> Result<&'v [Value], AppRankError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(&[][..]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(AppRankError::InvalidResponse(format!(
            "'{key}' must be an array, got {}",
            type_name(other)
        ))),
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apprank_utils::test_support::ranking_response;

    fn parse(content: &str) -> Result<ParsedResponse, AppRankError> {
        parse_response(content, &ResponseFields::default())
    }

    #[test]
    fn duplicates_collapse_to_first_appearance() {
        let parsed = parse(&ranking_response(&["A", "B", "A", "C"], &[])).unwrap();
        assert_eq!(parsed.apps, vec!["A", "B", "C"]);
        assert!(parsed.criteria.is_empty());
    }

    #[test]
    fn criterion_defaults() {
        let content = ranking_response(
            &["A"],
            &[(Some("Price"), Some("Cost to user")), (None, None), (Some("Ads"), None)],
        );
        let parsed = parse(&content).unwrap();
        assert_eq!(
            parsed.criteria,
            vec![
                NewCriterion {
                    name: "Price".to_string(),
                    description: "Cost to user".to_string()
                },
                NewCriterion {
                    name: "Unnamed Criterion".to_string(),
                    description: String::new()
                },
                NewCriterion {
                    name: "Ads".to_string(),
                    description: String::new()
                },
            ]
        );
    }

    #[test]
    fn double_encoded_json_is_unwrapped_once() {
        let inner = ranking_response(&["Maps"], &[]);
        let outer = serde_json::to_string(&inner).unwrap();
        assert_eq!(parse(&outer).unwrap().apps, vec!["Maps"]);

        // A third level is not unwrapped.
        let triple = serde_json::to_string(&outer).unwrap();
        assert!(matches!(parse(&triple), Err(AppRankError::InvalidResponse(_))));
    }

    #[test]
    fn unwrapped_string_must_be_json() {
        let err = parse(r#""not json at all""#).unwrap_err();
        assert!(matches!(err, AppRankError::InvalidResponse(_)));
    }

    #[test]
    fn missing_lists_are_empty() {
        assert_eq!(parse("{}").unwrap(), ParsedResponse::default());
        assert_eq!(
            parse(r#"{"apps": null, "criteria": null}"#).unwrap(),
            ParsedResponse::default()
        );
    }

    #[test]
    fn malformed_json_is_invalid_response() {
        let err = parse("{\"apps\": [").unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON response from LLM"));
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        assert!(parse("[1, 2]").is_err());
        assert!(parse(r#"{"apps": "Maps"}"#).is_err());
        assert!(parse(r#"{"apps": [1]}"#).is_err());
        assert!(parse(r#"{"apps": [], "criteria": ["Price"]}"#).is_err());
    }

    #[test]
    fn minimal_response_shape_is_ranked_by_default() {
        let parsed = parse(r#"{"apps": ["A", "B", "A", "C"], "criteria": []}"#).unwrap();
        assert_eq!(parsed.apps, vec!["A", "B", "C"]);
        assert!(parsed.criteria.is_empty());
    }

    #[test]
    fn abbreviated_field_names() {
        let content = r#"{"a": ["Maps"], "c": [{"n": "Speed", "d": "Fast"}]}"#;
        let parsed = parse_response(content, &ResponseFields::abbreviated()).unwrap();
        assert_eq!(parsed.apps, vec!["Maps"]);
        assert_eq!(parsed.criteria[0].name, "Speed");
        assert_eq!(parsed.criteria[0].description, "Fast");

        // Full keys mean nothing under the abbreviated mapping.
        let parsed =
            parse_response(&ranking_response(&["Maps"], &[]), &ResponseFields::abbreviated())
                .unwrap();
        assert!(parsed.apps.is_empty());
    }
}
