use serde_json::{Value, json};

/// Deterministic base64 key (bytes 0..32) for tests that need a cipher.
pub const TEST_ENCRYPTION_KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

/// Build an LLM response body using the default wire keys.
///
/// Each criterion is `(name, description)`; pass `None` to leave a field out.
pub fn ranking_response(apps: &[&str], criteria: &[(Option<&str>, Option<&str>)]) -> String {
    let criteria: Vec<Value> = criteria
        .iter()
        .map(|(name, description)| {
            let mut obj = serde_json::Map::new();
            if let Some(name) = name {
                obj.insert("name".to_string(), json!(name));
            }
            if let Some(description) = description {
                obj.insert("description".to_string(), json!(description));
            }
            Value::Object(obj)
        })
        .collect();
    json!({ "apps": apps, "criteria": criteria }).to_string()
}

/// Minimal structured-output schema matching [`ranking_response`].
pub fn ranking_schema() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "app_ranking",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "apps": { "type": "array", "items": { "type": "string" } },
                    "criteria": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "description": { "type": "string" }
                            },
                            "required": ["name", "description"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["apps", "criteria"],
                "additionalProperties": false
            }
        }
    })
}
