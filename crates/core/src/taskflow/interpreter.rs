//! Sequential recipe execution

use actionarc_domain::{ActionArcError, ActionResult, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::recipe::Recipe;
use super::substitute::{substitute, Scope};

/// Runs one `"<agent>.<actionName>"` call on behalf of a recipe step.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute_step(&self, action: &str, parameters: Value) -> Result<ActionResult>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub step: String,
    pub action: String,
    pub result: ActionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepFailure {
    pub step: String,
    pub action: String,
    pub error: String,
}

/// Transcript of one recipe run. Steps after a failure are never attempted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeRun {
    pub recipe: String,
    pub steps: Vec<StepOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

impl RecipeRun {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// One line per completed step, plus the failure if any.
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> =
            self.steps.iter().map(|s| format!("[{}] {}", s.step, s.result.text)).collect();
        match &self.failure {
            Some(f) => lines.push(format!("Recipe '{}' failed at step '{}': {}", self.recipe, f.step, f.error)),
            None => lines.push(format!("Recipe '{}' completed ({} steps)", self.recipe, self.steps.len())),
        }
        lines.join("\n")
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    /// Binds `args` against the recipe's parameter list.
    ///
    /// Missing required parameters and arguments the recipe does not declare
    /// are rejected; optional parameters fall back to their defaults.
    pub fn bind_arguments(recipe: &Recipe, args: &Map<String, Value>) -> Result<Map<String, Value>> {
        if let Some(unknown) = args.keys().find(|k| !recipe.parameters.iter().any(|p| &p.name == *k)) {
            return Err(ActionArcError::InvalidInput(format!(
                "recipe '{}' has no parameter '{unknown}'",
                recipe.name
            )));
        }

        let mut bound = Map::new();
        for param in &recipe.parameters {
            match args.get(&param.name).or(param.default.as_ref()) {
                Some(value) => {
                    bound.insert(param.name.clone(), value.clone());
                }
                None if param.required => {
                    return Err(ActionArcError::InvalidInput(format!(
                        "recipe '{}' requires parameter '{}'",
                        recipe.name, param.name
                    )));
                }
                None => {
                    bound.insert(param.name.clone(), Value::Null);
                }
            }
        }
        Ok(bound)
    }

    /// Executes the recipe's steps in order and stops at the first failure.
    ///
    /// Argument binding errors are returned as `Err`; step failures are
    /// reported in the transcript.
    pub async fn run<E>(&self, recipe: &Recipe, args: &Map<String, Value>, executor: &E) -> Result<RecipeRun>
    where
        E: StepExecutor + ?Sized,
    {
        recipe.validate()?;
        let mut scope = Scope::new(Self::bind_arguments(recipe, args)?);
        let mut run = RecipeRun { recipe: recipe.name.clone(), steps: Vec::new(), failure: None };

        info!(recipe = %recipe.name, steps = recipe.steps.len(), "running recipe");

        for step in &recipe.steps {
            let outcome = match substitute(&step.parameters, &scope) {
                Ok(parameters) => {
                    debug!(recipe = %recipe.name, step = %step.name, action = %step.action, "executing step");
                    executor.execute_step(&step.action, parameters).await
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(result) => {
                    scope.record(step.name.clone(), result.clone());
                    run.steps.push(StepOutcome {
                        step: step.name.clone(),
                        action: step.action.clone(),
                        result,
                    });
                }
                Err(e) => {
                    warn!(recipe = %recipe.name, step = %step.name, error = %e, "recipe step failed");
                    run.failure = Some(StepFailure {
                        step: step.name.clone(),
                        action: step.action.clone(),
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        Ok(run)
    }
}
