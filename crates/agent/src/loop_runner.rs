//! The orchestration loop.
//!
//! Each round sends the conversation to the model, decodes the reply as a
//! step envelope, and acts on it:
//!
//! - `plan` / `observe`: report progress, record the reply, continue
//! - `action`: record the reply, invoke the tool, feed the result back as an
//!   observation (or a correction when the tool does not exist)
//! - `finish`: the content is the answer
//! - undecodable replies get a correction; unknown steps are recorded and
//!   otherwise ignored
//!
//! The loop stops on `finish`, on a failed model call, or when the round
//! budget runs out. It never returns an error; every ending is a
//! [`LoopOutcome`].

use std::sync::Arc;

use serde::Serialize;
use stepwise_config::AppConfig;
use stepwise_core::envelope::{Step, StepEnvelope, observation_json};
use stepwise_core::message::{Conversation, Message};
use stepwise_core::provider::{Provider, ProviderRequest};
use stepwise_tools::{CreatedFiles, ToolRegistry, ToolSettings};
use tracing::{debug, error, info, warn};

use crate::events::{EventSink, StepEvent};
use crate::prompt::{SYSTEM_PROMPT, build_system_prompt};

/// Answer returned when the round budget runs out before `finish`.
pub const INCOMPLETE_ANSWER: &str = "I wasn't able to finish this request within the step limit. Please try rephrasing or breaking it into smaller steps.";

/// Answer returned when the model call fails.
pub const FAILURE_ANSWER: &str = "An error occurred while processing your request.";

/// Correction fed back after a reply that is not a usable envelope.
pub const MALFORMED_CORRECTION: &str = "Error: Invalid JSON format. Please output valid JSON only.";

const DEFAULT_MAX_ROUNDS: u32 = 15;
const DEFAULT_MAX_TOKENS: u32 = 2000;

/// How a loop run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// The model finished; carries the final answer.
    Finished(String),
    /// The round budget ran out.
    Incomplete,
    /// The model call failed; carries the reason.
    Failed(String),
}

impl LoopOutcome {
    /// The text to show the user.
    pub fn answer(&self) -> &str {
        match self {
            LoopOutcome::Finished(answer) => answer,
            LoopOutcome::Incomplete => INCOMPLETE_ANSWER,
            LoopOutcome::Failed(_) => FAILURE_ANSWER,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoopOutcome::Finished(_) => "finished",
            LoopOutcome::Incomplete => "incomplete",
            LoopOutcome::Failed(_) => "failed",
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct LoopReport {
    pub outcome: LoopOutcome,

    /// Model rounds used (1-based; equals the budget when incomplete)
    pub rounds: u32,

    /// Successful tool invocations
    pub tool_calls: u32,

    /// The conversation as it stood when the loop ended
    pub history: Conversation,
}

/// The core agent loop that drives the model and the tools.
pub struct AgentLoop {
    /// The model provider
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Full system instruction, tool list included
    system_prompt: String,

    /// Maximum model rounds per query
    max_rounds: u32,

    /// Response-length ceiling per model call
    max_tokens: u32,

    /// Sampling temperature; provider default when unset
    temperature: Option<f32>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let system_prompt = build_system_prompt(SYSTEM_PROMPT, &tools);
        Self {
            provider,
            model: model.into(),
            tools,
            system_prompt,
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    /// Build a loop from configuration, with every built-in tool enabled.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        let tools = Arc::new(ToolRegistry::new(ToolSettings::from(&config.tools)));
        let mut agent = Self::new(provider, config.model.clone(), tools)
            .with_max_rounds(config.agent.max_rounds)
            .with_max_tokens(config.max_tokens);
        agent.temperature = config.temperature;
        agent
    }

    /// Set the maximum number of model rounds.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    /// Set the max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Replace the base instruction. The tool list is still appended.
    pub fn with_system_prompt(mut self, base: &str) -> Self {
        self.system_prompt = build_system_prompt(base, &self.tools);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Run one query to completion.
    ///
    /// Tools record created files into `files`. Progress goes to `events`.
    pub async fn run(&self, query: &str, files: &mut CreatedFiles, events: &EventSink) -> LoopReport {
        let mut history = Conversation::new();
        history.push(Message::user(query));
        let mut tool_calls = 0u32;

        info!(
            conversation_id = %history.id,
            model = %self.model,
            max_rounds = self.max_rounds,
            "Starting agent loop"
        );

        for round in 1..=self.max_rounds {
            debug!(conversation_id = %history.id, round, "Agent loop round");

            let request = ProviderRequest {
                model: self.model.clone(),
                system: self.system_prompt.clone(),
                messages: history.messages.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };

            let raw = match self.provider.complete(request).await {
                Ok(response) => response.text,
                Err(e) => {
                    error!(conversation_id = %history.id, round, error = %e, "Model call failed");
                    events.send(StepEvent::Error {
                        message: e.to_string(),
                    });
                    return LoopReport {
                        outcome: LoopOutcome::Failed(e.to_string()),
                        rounds: round,
                        tool_calls,
                        history,
                    };
                }
            };

            let envelope = match StepEnvelope::decode(&raw) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(round, error = %e, "Model reply is not a step envelope");
                    events.send(StepEvent::Warning {
                        message: "Invalid JSON received, retrying...".into(),
                    });
                    history.push(Message::assistant(raw));
                    history.push(Message::user(MALFORMED_CORRECTION));
                    continue;
                }
            };

            debug!(round, step = envelope.step.as_str(), "Decoded model reply");

            match envelope.step {
                Step::Plan => {
                    events.send(StepEvent::Plan {
                        content: envelope.content,
                    });
                    history.push(Message::assistant(raw));
                }
                Step::Observe => {
                    events.send(StepEvent::Observe {
                        content: envelope.content,
                    });
                    history.push(Message::assistant(raw));
                }
                Step::Action => {
                    let function = envelope.function.filter(|f| !f.trim().is_empty());
                    events.send(StepEvent::Action {
                        tool: function.clone().unwrap_or_else(|| "unknown".into()),
                    });
                    history.push(Message::assistant(raw));

                    let Some(name) = function else {
                        warn!(round, "Action step named no tool");
                        history.push(Message::user(self.unknown_tool_message("<missing>")));
                        continue;
                    };

                    let input = envelope.input.unwrap_or_default();
                    match self.tools.invoke(&name, &input, files).await {
                        Ok(result) => {
                            tool_calls += 1;
                            debug!(round, tool = %name, result_len = result.len(), "Tool returned");
                            history.push(Message::user(observation_json(&result)));
                        }
                        Err(e) => {
                            warn!(round, tool = %name, error = %e, "Model requested an unknown tool");
                            history.push(Message::user(self.unknown_tool_message(&name)));
                        }
                    }
                }
                Step::Finish => {
                    history.push(Message::assistant(raw));
                    info!(
                        conversation_id = %history.id,
                        rounds = round,
                        tool_calls,
                        "Agent loop finished"
                    );
                    return LoopReport {
                        outcome: LoopOutcome::Finished(envelope.content),
                        rounds: round,
                        tool_calls,
                        history,
                    };
                }
                Step::Other(step) => {
                    // TODO: escalate after repeated unknown steps instead of burning the whole budget.
                    warn!(round, step = %step, "Unrecognized step, continuing");
                    history.push(Message::assistant(raw));
                }
            }
        }

        warn!(
            conversation_id = %history.id,
            max_rounds = self.max_rounds,
            "Round budget exhausted without a finish step"
        );

        LoopReport {
            outcome: LoopOutcome::Incomplete,
            rounds: self.max_rounds,
            tool_calls,
            history,
        }
    }

    fn unknown_tool_message(&self, name: &str) -> String {
        format!(
            "Error: Tool '{name}' not found. Available tools: [{}]",
            self.tools.names().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use stepwise_core::error::ProviderError;
    use stepwise_core::message::Role;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tools_in(dir: &std::path::Path) -> Arc<ToolRegistry> {
        Arc::new(ToolRegistry::new(ToolSettings {
            workspace_dir: dir.to_path_buf(),
            ..ToolSettings::default()
        }))
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<StepEvent>) -> Vec<StepEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn direct_finish_takes_one_round() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[
            r#"{"step":"finish","content":"def add(a, b):\n    return a + b"}"#,
        ]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", tools_in(dir.path()));
        let mut files = CreatedFiles::new();

        let report = agent
            .run("write code to add two numbers", &mut files, &EventSink::disabled())
            .await;

        assert_eq!(
            report.outcome,
            LoopOutcome::Finished("def add(a, b):\n    return a + b".into())
        );
        assert_eq!(report.rounds, 1);
        assert_eq!(report.tool_calls, 0);
        assert!(files.is_empty());
        assert_eq!(report.history.len(), 2);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].content, "write code to add two numbers");
        assert_eq!(requests[0].max_tokens, 2000);
        assert!(requests[0].system.contains("Available tools:"));
    }

    #[tokio::test]
    async fn weather_action_then_finish() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Paris"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Sunny +18°C"))
            .mount(&server)
            .await;

        let tools = Arc::new(ToolRegistry::new(ToolSettings {
            weather_url: server.uri(),
            ..ToolSettings::default()
        }));
        let provider = Arc::new(ScriptedProvider::new(&[
            r#"{"step":"action","function":"get_weather","input":"Paris"}"#,
            r#"{"step":"finish","content":"It's currently Sunny +18°C in Paris."}"#,
        ]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", tools);
        let (sink, mut rx) = EventSink::channel();
        let mut files = CreatedFiles::new();

        let report = agent
            .run("what's the weather in Paris?", &mut files, &sink)
            .await;

        assert_eq!(report.outcome.answer(), "It's currently Sunny +18°C in Paris.");
        assert_eq!(report.rounds, 2);
        assert_eq!(report.tool_calls, 1);

        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 3);
        let observation = &second.messages[2];
        assert_eq!(observation.role, Role::User);
        let value: serde_json::Value = serde_json::from_str(&observation.content).unwrap();
        assert_eq!(value["step"], "observe");
        assert_eq!(value["content"], "The weather in Paris is Sunny +18°C.");

        assert_eq!(
            drain(&mut rx),
            vec![StepEvent::Action {
                tool: "get_weather".into()
            }]
        );
    }

    #[tokio::test]
    async fn unknown_tool_gets_one_correction_and_loop_continues() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[
            r#"{"step":"action","function":"delete_everything","input":"/"}"#,
            r#"{"step":"finish","content":"I can't do that."}"#,
        ]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", tools_in(dir.path()));
        let mut files = CreatedFiles::new();

        let report = agent
            .run("clean up my disk", &mut files, &EventSink::disabled())
            .await;

        assert_eq!(report.outcome, LoopOutcome::Finished("I can't do that.".into()));
        assert_eq!(report.rounds, 2);
        assert_eq!(report.tool_calls, 0);

        let messages = &report.history.messages;
        assert_eq!(messages.len(), 4);
        let corrections: Vec<_> = messages
            .iter()
            .filter(|m| m.content.starts_with("Error: Tool"))
            .collect();
        assert_eq!(corrections.len(), 1);
        assert_eq!(
            corrections[0].content,
            "Error: Tool 'delete_everything' not found. Available tools: [get_weather, create_file]"
        );
        assert_eq!(corrections[0].role, Role::User);
    }

    #[tokio::test]
    async fn action_without_function_is_corrected() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[
            r#"{"step":"action","input":"Paris"}"#,
            r#"{"step":"finish","content":"done"}"#,
        ]));
        let agent = AgentLoop::new(provider, "mock-model", tools_in(dir.path()));
        let (sink, mut rx) = EventSink::channel();
        let mut files = CreatedFiles::new();

        let report = agent.run("weather?", &mut files, &sink).await;

        assert_eq!(report.rounds, 2);
        assert!(report.history.messages[2].content.contains("'<missing>'"));
        assert_eq!(
            drain(&mut rx),
            vec![StepEvent::Action {
                tool: "unknown".into()
            }]
        );
    }

    #[tokio::test]
    async fn malformed_replies_exhaust_budget() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::repeating("Sure! Here you go."));
        let agent = AgentLoop::new(provider.clone(), "mock-model", tools_in(dir.path()))
            .with_max_rounds(15);
        let (sink, mut rx) = EventSink::channel();
        let mut files = CreatedFiles::new();

        let report = agent.run("hello", &mut files, &sink).await;

        assert_eq!(report.outcome, LoopOutcome::Incomplete);
        assert_eq!(report.outcome.answer(), INCOMPLETE_ANSWER);
        assert_eq!(report.rounds, 15);
        assert_eq!(provider.call_count(), 15);
        // query + (reply, correction) per round
        assert_eq!(report.history.len(), 31);
        assert_eq!(report.history.messages[2].content, MALFORMED_CORRECTION);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 15);
        assert!(events.iter().all(|e| e.event_type() == "warning"));
    }

    #[tokio::test]
    async fn unknown_tools_exhaust_budget() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::repeating(
            r#"{"step":"action","function":"launch_rockets","input":"now"}"#,
        ));
        let agent = AgentLoop::new(provider.clone(), "mock-model", tools_in(dir.path()))
            .with_max_rounds(4);
        let mut files = CreatedFiles::new();

        let report = agent.run("go", &mut files, &EventSink::disabled()).await;

        assert_eq!(report.outcome, LoopOutcome::Incomplete);
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn transport_failure_ends_loop() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Network(
            "connection reset".into(),
        )));
        let agent = AgentLoop::new(provider.clone(), "mock-model", tools_in(dir.path()));
        let (sink, mut rx) = EventSink::channel();
        let mut files = CreatedFiles::new();

        let report = agent.run("hello", &mut files, &sink).await;

        assert!(matches!(report.outcome, LoopOutcome::Failed(ref reason) if reason.contains("connection reset")));
        assert_eq!(report.outcome.answer(), FAILURE_ANSWER);
        assert_eq!(report.rounds, 1);
        assert_eq!(provider.call_count(), 1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "error");
    }

    #[tokio::test]
    async fn fenced_replies_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[
            "```json\n{\"step\":\"plan\",\"content\":\"thinking\"}\n```",
            "```\n{\"step\":\"finish\",\"content\":\"hi\"}\n```",
        ]));
        let agent = AgentLoop::new(provider, "mock-model", tools_in(dir.path()));
        let (sink, mut rx) = EventSink::channel();
        let mut files = CreatedFiles::new();

        let report = agent.run("hi", &mut files, &sink).await;

        assert_eq!(report.outcome, LoopOutcome::Finished("hi".into()));
        assert_eq!(
            drain(&mut rx),
            vec![StepEvent::Plan {
                content: "thinking".into()
            }]
        );
        // raw replies are kept verbatim, fences included
        assert!(report.history.messages[1].content.starts_with("```json"));
    }

    #[tokio::test]
    async fn observe_and_unknown_steps_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[
            r#"{"step":"observe","content":"noted"}"#,
            r#"{"step":"reflect","content":"hmm"}"#,
            r#"{"content":"no step at all"}"#,
            r#"{"step":"finish","content":"ok"}"#,
        ]));
        let agent = AgentLoop::new(provider, "mock-model", tools_in(dir.path()));
        let (sink, mut rx) = EventSink::channel();
        let mut files = CreatedFiles::new();

        let report = agent.run("q", &mut files, &sink).await;

        assert_eq!(report.rounds, 4);
        assert_eq!(report.history.len(), 5);
        assert!(
            report.history.messages[1..]
                .iter()
                .all(|m| m.role == Role::Assistant)
        );
        assert_eq!(
            drain(&mut rx),
            vec![StepEvent::Observe {
                content: "noted".into()
            }]
        );
    }

    #[tokio::test]
    async fn create_file_action_records_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[
            r#"{"step":"action","function":"create_file","input":"index.html|<h1>Hi</h1>"}"#,
            r#"{"step":"finish","content":"Created index.html"}"#,
        ]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", tools_in(dir.path()));
        let mut files = CreatedFiles::new();

        let report = agent
            .run("Create a simple HTML page", &mut files, &EventSink::disabled())
            .await;

        assert_eq!(report.tool_calls, 1);
        assert_eq!(files.len(), 1);
        assert_eq!(files.get("index.html").unwrap().content, "<h1>Hi</h1>");
        assert!(dir.path().join("index.html").exists());

        let observation = &provider.requests()[1].messages[2].content;
        assert!(observation.contains("Successfully created file: index.html"));
    }

    #[tokio::test]
    async fn builders_reach_the_request() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&[r#"{"step":"finish","content":"x"}"#]));
        let agent = AgentLoop::new(provider.clone(), "claude-test", tools_in(dir.path()))
            .with_max_tokens(512)
            .with_temperature(0.2)
            .with_system_prompt("Be terse.");

        agent
            .run("q", &mut CreatedFiles::new(), &EventSink::disabled())
            .await;

        let request = &provider.requests()[0];
        assert_eq!(request.model, "claude-test");
        assert_eq!(request.max_tokens, 512);
        assert_eq!(request.temperature, Some(0.2));
        assert!(request.system.starts_with("Be terse."));
        assert!(request.system.contains("- create_file:"));
    }

    #[test]
    fn from_config_applies_settings() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let mut config = AppConfig::default();
        config.agent.max_rounds = 3;
        config.max_tokens = 100;
        let agent = AgentLoop::from_config(provider, &config);
        assert_eq!(agent.max_rounds(), 3);
        assert_eq!(agent.model(), "claude-haiku-4-5-20251001");
        assert_eq!(agent.tools().names(), vec!["get_weather", "create_file"]);
    }
}
