use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use super::entity::Entity;

/// Field name -> first failing rule message
pub type ValidationErrors = HashMap<String, String>;

/// Validation collaborator; runs after before-save observers and before any write
pub trait Validator: Send + Sync {
    fn validate(&self, data: &Map<String, Value>, entity: &Entity) -> Result<(), ValidationErrors>;
}

/// Validator that accepts every input
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn validate(&self, _data: &Map<String, Value>, _entity: &Entity) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Pipe-delimited rule sets per field: `required|string|max:255`
///
/// Rules are checked against the entity's current fields overlaid with the
/// incoming data, so partial updates validate against the merged state.
/// Supported rules: `required`, `string`, `numeric`, `integer`, `boolean`,
/// `min:N`, `max:N` (string length or numeric value).
#[derive(Debug, Default, Clone)]
pub struct FieldRules {
    rules: BTreeMap<String, Vec<String>>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, field: impl Into<String>, spec: &str) -> Self {
        let parts = spec
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self.rules.insert(field.into(), parts);
        self
    }

    fn check(rule: &str, value: Option<&Value>) -> Option<String> {
        let (name, arg) = match rule.split_once(':') {
            Some((n, a)) => (n, Some(a)),
            None => (rule, None),
        };

        let present = match value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };

        if name == "required" {
            return (!present).then(|| "This field is required".to_string());
        }
        // Remaining rules only constrain values that were supplied
        let value = match value {
            Some(v) if present => v,
            _ => return None,
        };

        match name {
            "string" => (!value.is_string()).then(|| "Must be a string".to_string()),
            "numeric" => (!is_numeric(value)).then(|| "Must be numeric".to_string()),
            "integer" => {
                let ok = value.is_i64()
                    || value.is_u64()
                    || value.as_str().map(|s| s.parse::<i64>().is_ok()).unwrap_or(false);
                (!ok).then(|| "Must be an integer".to_string())
            }
            "boolean" => {
                let ok = value.is_boolean()
                    || matches!(value.as_str(), Some("0" | "1" | "true" | "false"))
                    || matches!(value.as_i64(), Some(0 | 1));
                (!ok).then(|| "Must be a boolean".to_string())
            }
            "min" | "max" => {
                let limit: f64 = arg.and_then(|a| a.parse().ok())?;
                let measured = match value {
                    Value::String(s) => s.chars().count() as f64,
                    Value::Array(a) => a.len() as f64,
                    other => other.as_f64()?,
                };
                if name == "min" && measured < limit {
                    Some(format!("Must be at least {}", limit))
                } else if name == "max" && measured > limit {
                    Some(format!("May not be greater than {}", limit))
                } else {
                    None
                }
            }
            other => {
                tracing::debug!("Unknown validation rule '{}' ignored", other);
                None
            }
        }
    }
}

fn is_numeric(value: &Value) -> bool {
    value.is_number()
        || value
            .as_str()
            .map(|s| s.trim().parse::<f64>().is_ok())
            .unwrap_or(false)
}

impl Validator for FieldRules {
    fn validate(&self, data: &Map<String, Value>, entity: &Entity) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, rules) in &self.rules {
            let value = data.get(field).or_else(|| entity.get(field));
            if let Some(message) = rules.iter().find_map(|rule| Self::check(rule, value)) {
                errors.insert(field.clone(), message);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
