//! `${...}` placeholder expansion over JSON step parameters
//!
//! Forms:
//! - `${name}`: a recipe parameter
//! - `${step.text}`: the text of an earlier step's result
//! - `${step.data}` / `${step.data.a.b}`: its structured data, or a field of it
//!
//! A string that is exactly one placeholder is replaced by the referenced
//! JSON value as-is; placeholders embedded in longer strings are rendered as
//! text.

use std::collections::HashMap;

use actionarc_domain::{ActionArcError, ActionResult, Result};
use serde_json::{Map, Value};

/// Values visible to placeholders while running a recipe.
#[derive(Debug, Default, Clone)]
pub struct Scope {
    params: Map<String, Value>,
    steps: HashMap<String, ActionResult>,
}

impl Scope {
    pub fn new(params: Map<String, Value>) -> Self {
        Self { params, steps: HashMap::new() }
    }

    pub fn record(&mut self, step: impl Into<String>, result: ActionResult) {
        self.steps.insert(step.into(), result);
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    fn resolve(&self, reference: &str) -> Result<Value> {
        let unknown = || ActionArcError::InvalidInput(format!("unknown placeholder '${{{reference}}}'"));

        let mut parts = reference.split('.');
        let head = parts.next().unwrap_or_default().trim();

        if let Some(value) = self.params.get(head) {
            if parts.next().is_some() {
                return Err(unknown());
            }
            return Ok(value.clone());
        }

        let result = self.steps.get(head).ok_or_else(unknown)?;
        match parts.next() {
            Some("text") if parts.clone().next().is_none() => Ok(Value::String(result.text.clone())),
            Some("data") => {
                let mut current = result.data.as_ref().ok_or_else(unknown)?;
                for field in parts {
                    current = match current {
                        Value::Object(map) => map.get(field),
                        Value::Array(items) => field.parse::<usize>().ok().and_then(|i| items.get(i)),
                        _ => None,
                    }
                    .ok_or_else(unknown)?;
                }
                Ok(current.clone())
            }
            _ => Err(unknown()),
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn expand_string(input: &str, scope: &Scope) -> Result<Value> {
    let trimmed = input.trim();
    if let Some(inner) = trimmed.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        if !inner.contains("${") && !inner.contains('}') {
            return scope.resolve(inner);
        }
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            ActionArcError::InvalidInput(format!("unterminated placeholder in '{input}'"))
        })?;
        out.push_str(&render(&scope.resolve(&after[..end])?));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(Value::String(out))
}

/// Expands every placeholder inside `value`, recursing through arrays and
/// objects. Object keys are left untouched.
pub fn substitute(value: &Value, scope: &Scope) -> Result<Value> {
    Ok(match value {
        Value::String(s) => expand_string(s, scope)?,
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| substitute(v, scope)).collect::<Result<_>>()?)
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), substitute(v, scope)?)))
                .collect::<Result<_>>()?,
        ),
        other => other.clone(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn scope() -> Scope {
        let params = json!({ "who": "alice@example.com", "minutes": 45 });
        let mut scope = Scope::new(params.as_object().cloned().unwrap());
        scope.record(
            "lookup",
            ActionResult::with_data(
                "Found 2 events",
                json!({
                    "events": [{ "id": "e1", "subject": "Standup" }, { "id": "e2" }],
                    "count": 2
                }),
            ),
        );
        scope
    }

    #[test]
    fn whole_string_placeholder_keeps_json_type() {
        let out = substitute(&json!({ "duration": "${minutes}" }), &scope()).unwrap();
        assert_eq!(out, json!({ "duration": 45 }));
    }

    #[test]
    fn embedded_placeholders_render_as_text() {
        let out = substitute(
            &json!("Invite ${who} for ${minutes} min: ${lookup.text}"),
            &scope(),
        )
        .unwrap();
        assert_eq!(out, json!("Invite alice@example.com for 45 min: Found 2 events"));
    }

    #[test]
    fn data_paths_walk_objects_and_arrays() {
        let s = scope();
        assert_eq!(substitute(&json!("${lookup.data.count}"), &s).unwrap(), json!(2));
        assert_eq!(substitute(&json!("${lookup.data.events.0.id}"), &s).unwrap(), json!("e1"));
        assert_eq!(
            substitute(&json!(["${lookup.data.events.1}"]), &s).unwrap(),
            json!([{ "id": "e2" }])
        );
    }

    #[test]
    fn unknown_references_are_errors() {
        let s = scope();
        for bad in ["${nobody}", "${lookup.data.missing}", "${lookup.body}", "${who.x}", "x ${open"] {
            let err = substitute(&json!(bad), &s).unwrap_err();
            assert!(matches!(err, ActionArcError::InvalidInput(_)), "{bad}");
        }
    }

    #[test]
    fn non_strings_pass_through() {
        let value = json!({ "on": true, "n": 3, "none": null });
        assert_eq!(substitute(&value, &scope()).unwrap(), value);
    }
}
