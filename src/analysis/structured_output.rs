use serde_json::Value;

#[derive(Debug, Clone)]
pub struct StructuredOutputValidationResult {
    pub value: Option<Value>,
    pub error: Option<String>,
    pub errors: Vec<String>,
}

impl StructuredOutputValidationResult {
    pub fn is_valid(&self) -> bool {
        self.value.is_some() && self.error.is_none()
    }

    pub fn describe(&self) -> String {
        let headline = self.error.clone().unwrap_or_else(|| "Structured output is valid.".to_string());
        if self.errors.is_empty() {
            headline
        } else {
            format!("{} {}", headline, self.errors.join("; "))
        }
    }
}

/// Parses model output as JSON, tolerating a surrounding markdown fence.
pub fn parse_structured_output(raw: Option<&str>) -> Option<Value> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(strip_code_fence(trimmed)).ok()
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn validate_structured_output(value: Option<Value>, schema: &Value) -> StructuredOutputValidationResult {
    let Some(value) = value else {
        return StructuredOutputValidationResult {
            value: None,
            error: Some("Structured output is missing or invalid JSON.".to_string()),
            errors: vec![],
        };
    };

    let compiled = match jsonschema::JSONSchema::compile(schema) {
        Ok(compiled) => compiled,
        Err(error) => {
            return StructuredOutputValidationResult {
                value: Some(value),
                error: Some(format!("Failed to validate structured output schema: {}", error)),
                errors: vec![],
            }
        }
    };

    let errors: Vec<String> = compiled
        .validate(&value)
        .err()
        .map(|errors| {
            errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if errors.is_empty() {
        StructuredOutputValidationResult {
            value: Some(value),
            error: None,
            errors,
        }
    } else {
        StructuredOutputValidationResult {
            value: Some(value),
            error: Some("Structured output did not match schema.".to_string()),
            errors,
        }
    }
}
