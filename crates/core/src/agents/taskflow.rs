//! TaskFlow agent: runs named recipes through a step executor

use std::collections::BTreeMap;
use std::sync::Arc;

use actionarc_domain::{parse_action, ActionArcError, ActionResult, Result, TaskFlowAction};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use super::Agent;
use crate::taskflow::{Interpreter, Recipe, StepExecutor};

pub const TASKFLOW_AGENT: &str = "taskflow";

const ACTIONS: &[&str] = &["runRecipe", "listRecipes"];

pub struct TaskFlowAgent {
    recipes: BTreeMap<String, Recipe>,
    executor: Arc<dyn StepExecutor>,
    interpreter: Interpreter,
}

impl TaskFlowAgent {
    /// `executor` must not route back into this agent; recipes that call
    /// `taskflow.*` are rejected before running.
    pub fn new(recipes: Vec<Recipe>, executor: Arc<dyn StepExecutor>) -> Self {
        let recipes = recipes.into_iter().map(|r| (r.name.clone(), r)).collect();
        Self { recipes, executor, interpreter: Interpreter::new() }
    }

    pub fn recipe(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name).or_else(|| {
            self.recipes.values().find(|r| crate::matching::same_name(&r.name, name))
        })
    }

    pub fn recipe_names(&self) -> Vec<&str> {
        self.recipes.keys().map(String::as_str).collect()
    }

    async fn run_recipe(&self, name: &str, arguments: Map<String, Value>) -> Result<ActionResult> {
        let recipe = self
            .recipe(name)
            .ok_or_else(|| ActionArcError::NotFound(format!("no recipe named '{name}'")))?;

        let prefix = format!("{TASKFLOW_AGENT}.");
        if let Some(step) = recipe.steps.iter().find(|s| s.action.starts_with(&prefix)) {
            return Err(ActionArcError::InvalidInput(format!(
                "recipe '{}' step '{}' cannot call another recipe",
                recipe.name, step.name
            )));
        }

        let run = self.interpreter.run(recipe, &arguments, self.executor.as_ref()).await?;
        info!(recipe = %recipe.name, succeeded = run.succeeded(), steps = run.steps.len(), "recipe finished");

        let data = serde_json::to_value(&run)
            .map_err(|e| ActionArcError::Internal(format!("failed to encode recipe run: {e}")))?;
        Ok(ActionResult::with_data(run.summary(), data))
    }

    fn list_recipes(&self) -> ActionResult {
        if self.recipes.is_empty() {
            return ActionResult::with_data("No recipes installed.", json!({ "recipes": [] }));
        }
        let text = self
            .recipes
            .values()
            .map(|r| {
                let params: Vec<&str> = r.parameters.iter().map(|p| p.name.as_str()).collect();
                let mut line = format!("- {}", r.name);
                if !params.is_empty() {
                    line.push_str(&format!("({})", params.join(", ")));
                }
                if !r.description.is_empty() {
                    line.push_str(&format!(": {}", r.description));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n");
        let recipes: Vec<&Recipe> = self.recipes.values().collect();
        ActionResult::with_data(text, json!({ "recipes": recipes }))
    }
}

#[async_trait]
impl Agent for TaskFlowAgent {
    fn name(&self) -> &'static str {
        TASKFLOW_AGENT
    }

    fn action_names(&self) -> &'static [&'static str] {
        ACTIONS
    }

    async fn execute(&self, action: Value) -> Result<ActionResult> {
        match parse_action::<TaskFlowAction>(action)? {
            TaskFlowAction::RunRecipe { name, arguments } => self.run_recipe(&name, arguments).await,
            TaskFlowAction::ListRecipes {} => Ok(self.list_recipes()),
        }
    }
}
