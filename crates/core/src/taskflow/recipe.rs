//! Recipe file format

use std::collections::HashSet;

use actionarc_domain::{ActionArcError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Required unless a default is given.
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    /// `"<agent>.<actionName>"`
    pub action: String,
    #[serde(default = "empty_object")]
    pub parameters: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    pub steps: Vec<Step>,
}

impl Recipe {
    /// Structural checks done once at load time.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ActionArcError::InvalidInput(msg));

        if self.name.trim().is_empty() {
            return invalid("recipe name is empty".to_string());
        }
        if self.steps.is_empty() {
            return invalid(format!("recipe '{}' has no steps", self.name));
        }

        let mut params = HashSet::new();
        for param in &self.parameters {
            if !params.insert(param.name.as_str()) {
                return invalid(format!("recipe '{}' repeats parameter '{}'", self.name, param.name));
            }
        }

        let mut steps = HashSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() || step.name.contains('.') {
                return invalid(format!("recipe '{}' has an invalid step name '{}'", self.name, step.name));
            }
            if !steps.insert(step.name.as_str()) {
                return invalid(format!("recipe '{}' repeats step '{}'", self.name, step.name));
            }
            match step.action.split_once('.') {
                Some((agent, action)) if !agent.is_empty() && !action.is_empty() => {}
                _ => {
                    return invalid(format!(
                        "step '{}' action must look like <agent>.<actionName>, got '{}'",
                        step.name, step.action
                    ))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn recipe(steps: Value) -> Recipe {
        serde_json::from_value(json!({ "name": "morning", "steps": steps })).unwrap()
    }

    #[test]
    fn parses_minimal_recipe() {
        let r = recipe(json!([{ "name": "today", "action": "calendar.findTodaysEvents" }]));
        assert!(r.validate().is_ok());
        assert_eq!(r.steps[0].parameters, json!({}));
    }

    #[test]
    fn rejects_bad_structure() {
        assert!(recipe(json!([])).validate().is_err());
        assert!(recipe(json!([{ "name": "a", "action": "calendar" }])).validate().is_err());
        assert!(recipe(json!([
            { "name": "a", "action": "player.pause" },
            { "name": "a", "action": "player.resume" }
        ]))
        .validate()
        .is_err());
        assert!(recipe(json!([{ "name": "a.b", "action": "player.pause" }])).validate().is_err());
    }
}
