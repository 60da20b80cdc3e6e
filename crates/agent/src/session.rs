//! Chat session: the state a presentation layer keeps between queries.
//!
//! The transcript and the created-file ledger live here, outside the loop.
//! Whoever owns the session owns the right to run a query against it, so
//! only one loop ever writes to the ledger at a time.

use serde::{Deserialize, Serialize};
use stepwise_core::message::Role;
use stepwise_tools::{CreatedFile, CreatedFiles};
use tracing::info;

use crate::events::EventSink;
use crate::loop_runner::{AgentLoop, LoopOutcome};

/// Canned prompts offered as one-click examples.
pub const EXAMPLE_QUERIES: [&str; 4] = [
    "What's the weather in Tokyo?",
    "Write Python code to add two numbers",
    "Create a simple HTML page with a gradient",
    "Build a working todo list app",
];

/// One visible chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    pub transcript: Vec<TranscriptEntry>,
    pub created_files: CreatedFiles,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the transcript and every created file.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.created_files.clear();
    }
}

/// The result of one query, as the user sees it.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub outcome: LoopOutcome,
    pub rounds: u32,
    pub tool_calls: u32,

    /// Files created while answering this query
    pub new_files: Vec<CreatedFile>,
}

impl AgentLoop {
    /// Run `query` against `session`, recording both turns in its transcript.
    pub async fn ask(&self, session: &mut ChatSession, query: &str, events: &EventSink) -> Answer {
        session.transcript.push(TranscriptEntry {
            role: Role::User,
            content: query.to_string(),
        });

        let before = session.created_files.len();
        let report = self.run(query, &mut session.created_files, events).await;
        let new_files = session.created_files.since(before).to_vec();

        let text = report.outcome.answer().to_string();
        session.transcript.push(TranscriptEntry {
            role: Role::Assistant,
            content: text.clone(),
        });

        if !new_files.is_empty() {
            info!(count = new_files.len(), "Files created for query");
        }

        Answer {
            text,
            outcome: report.outcome,
            rounds: report.rounds,
            tool_calls: report.tool_calls,
            new_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use std::sync::Arc;
    use stepwise_tools::{ToolRegistry, ToolSettings};

    fn agent_with(replies: &[&str], dir: &std::path::Path) -> AgentLoop {
        let tools = Arc::new(ToolRegistry::new(ToolSettings {
            workspace_dir: dir.to_path_buf(),
            ..ToolSettings::default()
        }));
        AgentLoop::new(Arc::new(ScriptedProvider::new(replies)), "mock-model", tools)
    }

    #[tokio::test]
    async fn ask_records_both_turns() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent_with(&[r#"{"step":"finish","content":"4"}"#], dir.path());
        let mut session = ChatSession::new();

        let answer = agent
            .ask(&mut session, "What is 2+2?", &EventSink::disabled())
            .await;

        assert_eq!(answer.text, "4");
        assert!(answer.new_files.is_empty());
        assert_eq!(
            session.transcript,
            vec![
                TranscriptEntry {
                    role: Role::User,
                    content: "What is 2+2?".into()
                },
                TranscriptEntry {
                    role: Role::Assistant,
                    content: "4".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn new_files_are_only_this_querys() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent_with(
            &[
                r#"{"step":"action","function":"create_file","input":"a.txt|one"}"#,
                r#"{"step":"finish","content":"made a"}"#,
                r#"{"step":"action","function":"create_file","input":"b.txt|two"}"#,
                r#"{"step":"finish","content":"made b"}"#,
            ],
            dir.path(),
        );
        let mut session = ChatSession::new();

        let first = agent.ask(&mut session, "make a", &EventSink::disabled()).await;
        let second = agent.ask(&mut session, "make b", &EventSink::disabled()).await;

        assert_eq!(first.new_files.len(), 1);
        assert_eq!(second.new_files.len(), 1);
        assert_eq!(second.new_files[0].name, "b.txt");
        assert_eq!(session.created_files.len(), 2);
        assert_eq!(session.transcript.len(), 4);
    }

    #[tokio::test]
    async fn failed_query_leaves_session_usable() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent_with(&[], dir.path());
        let mut session = ChatSession::new();

        let answer = agent.ask(&mut session, "hello", &EventSink::disabled()).await;

        assert_eq!(answer.outcome.label(), "failed");
        assert_eq!(session.transcript[1].content, crate::FAILURE_ANSWER);
    }

    #[test]
    fn clear_empties_everything() {
        let mut session = ChatSession::new();
        session.transcript.push(TranscriptEntry {
            role: Role::User,
            content: "hi".into(),
        });
        session.created_files.push(CreatedFile::new("x.txt", "x"));

        session.clear();

        assert!(session.transcript.is_empty());
        assert!(session.created_files.is_empty());
    }

    #[test]
    fn four_examples() {
        assert_eq!(EXAMPLE_QUERIES.len(), 4);
        assert!(EXAMPLE_QUERIES.contains(&"Build a working todo list app"));
    }
}
