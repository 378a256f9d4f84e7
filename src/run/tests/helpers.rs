//! Scripted model and tools for run loop tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::model::{BoxError, ModelClient, ModelRequest, ModelResponse};
use crate::run::RunContext;
use crate::tools::{FunctionTool, Tool};
use crate::types::{ResponseItem, ToolOutput, Usage};

/// Replays queued responses, then `fallback` forever if set.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<ModelResponse>>,
    fallback: Option<ModelResponse>,
    delay: Option<Duration>,
    pub requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ModelResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            fallback: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn repeating(response: ModelResponse) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            delay: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(delay: Duration, response: ModelResponse) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            delay: Some(delay),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> ModelRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, BoxError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| "script exhausted".into())
    }
}

pub fn text(content: &str) -> ModelResponse {
    ModelResponse::new(vec![ResponseItem::assistant(content)]).with_usage(Usage::new(10, 2))
}

pub fn calls(items: Vec<ResponseItem>) -> ModelResponse {
    ModelResponse::new(items).with_usage(Usage::new(10, 2))
}

pub fn call(call_id: &str, name: &str, arguments: Value) -> ResponseItem {
    ResponseItem::function_call(call_id, name, arguments.to_string())
}

pub fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Tool returning `output` and counting its invocations.
pub fn counting<C: Send + Sync + 'static>(
    name: &str,
    output: Value,
    counter: Arc<AtomicUsize>,
) -> Arc<dyn Tool<C>> {
    Arc::new(FunctionTool::raw(
        name,
        "counting tool",
        empty_schema(),
        move |_ctx: RunContext<C>, _input| {
            let output = output.clone();
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ToolOutput::Success(output)
            }
        },
    ))
}

/// Tool that sleeps for `delay`, tracking how many calls overlap.
pub fn sleeper(
    name: &'static str,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
) -> Arc<dyn Tool> {
    Arc::new(FunctionTool::raw(
        name,
        "sleeps",
        empty_schema(),
        move |_ctx: RunContext, _input| {
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                name
            }
        },
    ))
}
