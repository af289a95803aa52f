//! Recipes driving real agents through a small in-test registry

mod support;

use std::sync::{Arc, Mutex};

use actionarc_core::{
    shared_cache, Agent, CalendarAgent, EmailAgent, MontageAgent, MontageHost, Recipe, StepExecutor,
    TaskFlowAgent,
};
use actionarc_domain::{ActionArcError, ActionRequest, ActionResult, MontageAction, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use support::calendar::MockCalendarProvider;
use support::email::{MailCall, MockEmailProvider};
use support::{fixed_clock, utc};

struct Registry {
    agents: Vec<Arc<dyn Agent>>,
}

#[async_trait]
impl StepExecutor for Registry {
    async fn execute_step(&self, action: &str, parameters: Value) -> Result<ActionResult> {
        let request = ActionRequest::from_qualified(action, parameters)?;
        let agent = self
            .agents
            .iter()
            .find(|a| a.name() == request.agent)
            .ok_or_else(|| ActionArcError::NotFound(format!("no agent '{}'", request.agent)))?;
        agent.execute(request.action).await
    }
}

#[derive(Default)]
struct RecordingHost {
    sent: Mutex<Vec<MontageAction>>,
}

#[async_trait]
impl MontageHost for RecordingHost {
    async fn send(&self, action: &MontageAction) -> Result<ActionResult> {
        self.sent.lock().unwrap().push(action.clone());
        Ok(ActionResult::text("ok"))
    }
}

fn recipe(value: Value) -> Recipe {
    serde_json::from_value(value).unwrap()
}

fn meeting_recipe() -> Recipe {
    recipe(json!({
        "name": "schedule-and-notify",
        "description": "Book a meeting and mail the invitee",
        "parameters": [
            { "name": "who" },
            { "name": "topic" },
            { "name": "minutes", "required": false, "default": 45 }
        ],
        "steps": [
            { "name": "book", "action": "calendar.addEvent", "parameters": {
                "subject": "${topic}",
                "start": "2025-05-08T10:00:00Z",
                "durationMinutes": "${minutes}",
                "attendees": ["${who}"]
            }},
            { "name": "notify", "action": "email.sendEmail", "parameters": {
                "to": ["${who}"],
                "subject": "Invitation: ${topic}",
                "body": "${book.text}"
            }}
        ]
    }))
}

fn setup() -> (TaskFlowAgent, MockCalendarProvider, MockEmailProvider, Arc<RecordingHost>) {
    let calendar = MockCalendarProvider::default();
    let email = MockEmailProvider::default();
    let host = Arc::new(RecordingHost::default());

    let agents: Vec<Arc<dyn Agent>> = vec![
        Arc::new(
            CalendarAgent::new(Arc::new(calendar.clone()), shared_cache())
                .with_clock(fixed_clock(utc(2025, 5, 7, 9, 0))),
        ),
        Arc::new(EmailAgent::new(Arc::new(email.clone()))),
        Arc::new(MontageAgent::new(host.clone())),
    ];
    let recipes = vec![
        meeting_recipe(),
        recipe(json!({
            "name": "nested",
            "steps": [{ "name": "again", "action": "taskflow.runRecipe", "parameters": { "name": "nested" } }]
        })),
        recipe(json!({
            "name": "bad-montage",
            "steps": [
                { "name": "make", "action": "montage.createMontage", "parameters": { "title": "Trip" } },
                { "name": "broken", "action": "montage.removePhotos", "parameters": { "title": "Trip", "files": [] } },
                { "name": "never", "action": "montage.showMontage", "parameters": { "title": "Trip" } }
            ]
        })),
    ];
    let agent = TaskFlowAgent::new(recipes, Arc::new(Registry { agents }));
    (agent, calendar, email, host)
}

#[tokio::test]
async fn recipe_threads_results_between_agents() {
    let (agent, calendar, email, _) = setup();

    let result = agent
        .execute(json!({
            "actionName": "runRecipe",
            "parameters": {
                "name": "schedule-and-notify",
                "arguments": { "who": "ada@example.com", "topic": "Roadmap" }
            }
        }))
        .await
        .unwrap();
    assert!(result.text.ends_with("Recipe 'schedule-and-notify' completed (2 steps)"));

    let created = calendar.created.lock().unwrap()[0].clone();
    assert_eq!(created.end, utc(2025, 5, 8, 10, 45));

    match &email.calls()[0] {
        MailCall::Send(sent) => {
            assert_eq!(sent.subject, "Invitation: Roadmap");
            assert!(sent.body.starts_with("Created event: 2025-05-08 10:00-10:45 UTC Roadmap"));
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn failing_step_stops_the_recipe() {
    let (agent, _, _, host) = setup();

    let result = agent
        .execute(json!({ "actionName": "runRecipe", "parameters": { "name": "bad-montage" } }))
        .await
        .unwrap();

    assert!(result.text.contains("failed at step 'broken'"));
    assert_eq!(result.data.unwrap()["failure"]["step"], "broken");
    assert_eq!(host.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn recipes_cannot_call_taskflow() {
    let (agent, _, _, _) = setup();
    let err = agent
        .execute(json!({ "actionName": "runRecipe", "parameters": { "name": "nested" } }))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionArcError::InvalidInput(_)));
}

#[tokio::test]
async fn missing_arguments_and_unknown_recipes_are_errors() {
    let (agent, _, email, _) = setup();

    let err = agent
        .execute(json!({
            "actionName": "runRecipe",
            "parameters": { "name": "schedule-and-notify", "arguments": { "who": "ada@example.com" } }
        }))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("topic"));
    assert!(email.calls().is_empty());

    let err = agent
        .execute(json!({ "actionName": "runRecipe", "parameters": { "name": "nope" } }))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionArcError::NotFound(_)));
}

#[tokio::test]
async fn list_recipes_shows_parameters() {
    let (agent, _, _, _) = setup();
    let result = agent.execute(json!({ "actionName": "listRecipes" })).await.unwrap();
    assert!(result
        .text
        .contains("- schedule-and-notify(who, topic, minutes): Book a meeting and mail the invitee"));
    assert_eq!(agent.recipe_names(), vec!["bad-montage", "nested", "schedule-and-notify"]);
}
