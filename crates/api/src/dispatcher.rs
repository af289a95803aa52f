//! Action routing
//!
//! Every action arrives as `"<agent>.<actionName>"` plus a JSON parameter
//! object and is handed to the agent registered under that prefix.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

use actionarc_core::agents::taskflow::TASKFLOW_AGENT;
use actionarc_core::{Agent, Recipe, StepExecutor, TaskFlowAgent};
use actionarc_domain::{ActionArcError, ActionRequest, ActionResult, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::utils::logging::log_action_execution;

/// Registry of agents keyed by routing prefix.
pub struct ActionDispatcher {
    agents: BTreeMap<&'static str, Arc<dyn Agent>>,
}

impl ActionDispatcher {
    pub fn new(agents: Vec<Arc<dyn Agent>>) -> Arc<Self> {
        Arc::new(Self { agents: Self::index(agents) })
    }

    /// Registers `agents` plus a TaskFlow agent whose recipe steps are routed
    /// back through this dispatcher.
    pub fn with_recipes(agents: Vec<Arc<dyn Agent>>, recipes: Vec<Recipe>) -> Arc<Self> {
        Arc::new_cyclic(|dispatcher| {
            let steps = Arc::new(RecipeSteps(dispatcher.clone()));
            let taskflow: Arc<dyn Agent> = Arc::new(TaskFlowAgent::new(recipes, steps));

            let mut agents = agents;
            agents.push(taskflow);
            Self { agents: Self::index(agents) }
        })
    }

    fn index(agents: Vec<Arc<dyn Agent>>) -> BTreeMap<&'static str, Arc<dyn Agent>> {
        let mut map = BTreeMap::new();
        for agent in agents {
            if let Some(previous) = map.insert(agent.name(), agent) {
                warn!(agent = previous.name(), "agent registered twice; keeping the later one");
            }
        }
        map
    }

    pub fn agent_names(&self) -> Vec<&'static str> {
        self.agents.keys().copied().collect()
    }

    pub fn has_agent(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// `"<agent>.<actionName>"` for every action the registered agents list.
    pub fn action_targets(&self) -> Vec<String> {
        self.agents
            .values()
            .flat_map(|agent| agent.action_names().iter().map(move |action| format!("{}.{action}", agent.name())))
            .collect()
    }

    /// Routes one action.
    ///
    /// `parameters` must be a JSON object; `null` is treated as `{}`.
    pub async fn dispatch(&self, target: &str, parameters: Value) -> Result<ActionResult> {
        let parameters = match parameters {
            Value::Null => Value::Object(Map::new()),
            Value::Object(map) => Value::Object(map),
            other => {
                return Err(ActionArcError::InvalidInput(format!(
                    "parameters for {target} must be a JSON object, got {other}"
                )))
            }
        };
        self.dispatch_request(ActionRequest::from_qualified(target.trim(), parameters)?).await
    }

    pub async fn dispatch_request(&self, request: ActionRequest) -> Result<ActionResult> {
        let agent = self.agents.get(request.agent.as_str()).ok_or_else(|| {
            ActionArcError::NotFound(format!(
                "no agent named '{}' (available: {})",
                request.agent,
                self.agent_names().join(", ")
            ))
        })?;

        let target = format!("{}.{}", request.agent, request.action_name().unwrap_or_default());
        debug!(action = %target, "dispatching action");
        let started = Instant::now();
        let result = agent.execute(request.action).await;
        log_action_execution(&target, started.elapsed(), result.as_ref().err());
        result
    }
}

#[async_trait]
impl StepExecutor for ActionDispatcher {
    /// Recipe steps may call any agent except TaskFlow itself.
    async fn execute_step(&self, action: &str, parameters: Value) -> Result<ActionResult> {
        let request = ActionRequest::from_qualified(action.trim(), parameters)?;
        if request.agent == TASKFLOW_AGENT {
            return Err(ActionArcError::InvalidInput(format!("recipes cannot call '{action}'")));
        }
        self.dispatch_request(request).await
    }
}

/// Non-owning handle the TaskFlow agent uses to reach the dispatcher that
/// owns it.
struct RecipeSteps(Weak<ActionDispatcher>);

#[async_trait]
impl StepExecutor for RecipeSteps {
    async fn execute_step(&self, action: &str, parameters: Value) -> Result<ActionResult> {
        let dispatcher = self
            .0
            .upgrade()
            .ok_or_else(|| ActionArcError::Internal("action dispatcher has shut down".into()))?;
        dispatcher.execute_step(action, parameters).await
    }
}
