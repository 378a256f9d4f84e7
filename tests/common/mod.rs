//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use agent_relay::model::{BoxError, ModelClient, ModelRequest, ModelResponse};
use agent_relay::types::{ResponseItem, Usage};
use async_trait::async_trait;
use serde_json::Value;

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Model that replays a fixed script, then repeats `fallback` if one is set.
pub struct ScriptedModel {
    script: Mutex<VecDeque<ModelResponse>>,
    fallback: Option<ModelResponse>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<ModelResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn repeating(response: ModelResponse) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, BoxError> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| "script exhausted".into())
    }
}

pub fn say(content: &str) -> ModelResponse {
    ModelResponse::new(vec![ResponseItem::assistant(content)]).with_usage(Usage::new(12, 3))
}

pub fn invoke(calls: Vec<ResponseItem>) -> ModelResponse {
    ModelResponse::new(calls).with_usage(Usage::new(12, 3))
}

pub fn call(call_id: &str, name: &str, arguments: Value) -> ResponseItem {
    ResponseItem::function_call(call_id, name, arguments.to_string())
}
