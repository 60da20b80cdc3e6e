//! Shared test helpers for loop and session tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use stepwise_core::error::ProviderError;
use stepwise_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// A mock provider that replays scripted replies and records every request.
///
/// Once the script runs out it repeats the `repeat` reply if one was set,
/// otherwise it fails the call.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    repeat: Option<String>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `reply`.
    pub fn repeating(reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            repeat: Some(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail the first call with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);

        let next = self.replies.lock().unwrap().pop_front();
        let text = match (next, &self.repeat) {
            (Some(reply), _) => reply?,
            (None, Some(repeat)) => repeat.clone(),
            (None, None) => {
                return Err(ProviderError::InvalidResponse(
                    "ScriptedProvider: no more replies".into(),
                ));
            }
        };

        Ok(ProviderResponse {
            text,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
            stop_reason: Some("end_turn".into()),
        })
    }
}
