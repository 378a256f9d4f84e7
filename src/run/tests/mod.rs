//! Run loop tests.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use self::helpers::{ScriptedModel, call, calls, counting, empty_schema, sleeper, text};
use super::turn::process_response;
use super::{RunConfig, RunContext, RunStatus, Runner};
use crate::agent::{Agent, AgentGraph};
use crate::hooks::{FnHook, HookEvent, HookManager, HookOutput};
use crate::tools::{FunctionTool, InProcessProvider};
use crate::types::{ResponseItem, RunItemKind, ToolError};
use crate::{Error, ToolUseBehavior};

fn single(agent: Agent) -> AgentGraph {
    AgentGraph::new([agent]).unwrap()
}

fn outputs(items: &[crate::RunItem]) -> Vec<(String, serde_json::Value, bool)> {
    items
        .iter()
        .filter_map(|item| match &item.kind {
            RunItemKind::ToolCallOutput {
                raw,
                output,
                is_error,
            } => Some((
                raw.call_id().unwrap_or_default().to_string(),
                output.clone(),
                *is_error,
            )),
            _ => None,
        })
        .collect()
}

#[test]
fn test_process_response_splits_calls() {
    let agent: Agent = Agent::builder("Triage")
        .handoff("Billing")
        .handoff("Support")
        .build()
        .unwrap();
    let output = vec![
        ResponseItem::assistant("Let me check"),
        call("c1", "lookup", json!({})),
        call("c2", "transfer_to_billing", json!({})),
        call("c3", "transfer_to_support", json!({})),
    ];

    let processed = process_response(&agent, &output);
    assert_eq!(processed.items.len(), 4);
    assert_eq!(processed.tools.len(), 1);
    assert_eq!(processed.tools[0].name, "lookup");
    let handoff = processed.handoff.as_ref().unwrap();
    assert_eq!(handoff.edge.target(), "Billing");
    assert_eq!(handoff.call_id, "c2");
    assert_eq!(processed.ignored_handoffs, vec!["c3".to_string()]);
    assert_eq!(processed.message.as_deref(), Some("Let me check"));
    assert!(processed.has_calls());
}

#[test]
fn test_process_response_plain_message() {
    let agent: Agent = Agent::builder("Solo").build().unwrap();
    let processed = process_response(&agent, &[ResponseItem::assistant("done")]);
    assert!(!processed.has_calls());
    assert!(processed.handoff.is_none());
}

#[tokio::test]
async fn test_plain_message_is_final() {
    let model = ScriptedModel::new(vec![text("Hello there")]);
    let graph = single(
        Agent::builder("Greeter")
            .instructions("Greet the user.")
            .build()
            .unwrap(),
    );
    let ctx = RunContext::new(());

    let result = Runner::new(model.clone())
        .run(&graph, "Greeter", vec![ResponseItem::user("hi")], &ctx, RunConfig::default())
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.final_output, Some(json!("Hello there")));
    assert_eq!(result.last_agent, "Greeter");
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.metrics.turns, 1);
    assert!(result.trace_id.starts_with("trace_"));

    let request = model.request(0);
    assert_eq!(request.instructions.as_deref(), Some("Greet the user."));
    assert_eq!(request.input, vec![ResponseItem::user("hi")]);
    assert_eq!(ctx.usage().requests, 1);
}

#[tokio::test]
async fn test_tool_results_are_sent_back_by_default() {
    let counter = Arc::new(AtomicUsize::new(0));
    let model = ScriptedModel::new(vec![
        calls(vec![call("c1", "lookup", json!({}))]),
        text("Your order shipped"),
    ]);
    let graph = single(
        Agent::builder("Support")
            .tool_arc(counting("lookup", json!({"status": "shipped"}), counter.clone()))
            .build()
            .unwrap(),
    );

    let result = Runner::new(model.clone())
        .run(&graph, "Support", vec![ResponseItem::user("where is it?")], &RunContext::new(()), RunConfig::default())
        .await
        .unwrap();

    assert_eq!(model.calls(), 2);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(result.final_output, Some(json!("Your order shipped")));

    let second = model.request(1);
    assert_eq!(
        second.input.last(),
        Some(&ResponseItem::function_call_output("c1", r#"{"status":"shipped"}"#))
    );
    assert_eq!(result.metrics.tool_calls, 1);
    assert_eq!(result.metrics.model_calls, 2);
}

#[tokio::test]
async fn test_concurrent_tools_keep_request_order() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let model = ScriptedModel::new(vec![
        calls(vec![
            call("c1", "slow", json!({})),
            call("c2", "fast", json!({})),
        ]),
        text("done"),
    ]);
    let graph = single(
        Agent::builder("Worker")
            .tool_arc(sleeper("slow", Duration::from_millis(60), in_flight.clone(), max_in_flight.clone()))
            .tool_arc(sleeper("fast", Duration::from_millis(5), in_flight.clone(), max_in_flight.clone()))
            .build()
            .unwrap(),
    );

    let result = Runner::new(model)
        .run(&graph, "Worker", Vec::new(), &RunContext::new(()), RunConfig::default())
        .await
        .unwrap();

    let logged = outputs(&result.items);
    assert_eq!(logged[0], ("c1".into(), json!("slow"), false));
    assert_eq!(logged[1], ("c2".into(), json!("fast"), false));
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_tool_failures_become_outputs() {
    let model = ScriptedModel::new(vec![
        calls(vec![
            call("c1", "missing", json!({})),
            call("c2", "add", json!({"a": "one"})),
            call("c3", "broken", json!({})),
        ]),
        text("sorry"),
    ]);
    let add = FunctionTool::raw(
        "add",
        "Add",
        json!({"type": "object", "properties": {"a": {"type": "integer"}}, "required": ["a"]}),
        |_ctx: RunContext, input: serde_json::Value| async move { input["a"].clone() },
    );
    let broken = FunctionTool::raw("broken", "Fails", empty_schema(), |_ctx: RunContext, _input| async {
        Err::<String, _>("disk full")
    });
    let graph = single(
        Agent::builder("Calc")
            .tool(add)
            .tool(broken)
            .build()
            .unwrap(),
    );

    let result = Runner::new(model)
        .run(&graph, "Calc", Vec::new(), &RunContext::new(()), RunConfig::default())
        .await
        .unwrap();

    let logged = outputs(&result.items);
    assert_eq!(logged.len(), 3);
    assert!(logged.iter().all(|(_, _, is_error)| *is_error));
    assert_eq!(logged[0].1, json!("tool `missing` not found in agent `Calc`"));
    assert!(logged[1].1.as_str().unwrap().starts_with("invalid input for `add`"));
    assert_eq!(logged[2].1, json!("execution failed: disk full"));
    assert_eq!(result.metrics.tool_errors, 3);
    assert_eq!(result.final_output, Some(json!("sorry")));
}

#[tokio::test]
async fn test_fail_fast_aborts_on_first_failure() {
    let counter = Arc::new(AtomicUsize::new(0));
    let model = ScriptedModel::new(vec![calls(vec![
        call("c1", "ok", json!({})),
        call("c2", "missing", json!({})),
    ])]);
    let graph = single(
        Agent::builder("Strict")
            .tool_arc(counting("ok", json!("fine"), counter.clone()))
            .build()
            .unwrap(),
    );

    let err = Runner::new(model.clone())
        .run(&graph, "Strict", Vec::new(), &RunContext::new(()), RunConfig::default().with_fail_fast(true))
        .await
        .unwrap_err();

    assert!(matches!(
        err.error,
        Error::Tool(ToolError::UnknownTool { ref name, .. }) if name == "missing"
    ));
    assert_eq!(err.last_agent, "Strict");
    assert_eq!(err.turns, 1);
    assert_eq!(model.calls(), 1);
    // call items plus the output of the call that succeeded before the failure
    assert_eq!(err.items.len(), 3);
}

#[tokio::test]
async fn test_tool_timeout() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let model = ScriptedModel::new(vec![calls(vec![call("c1", "slow", json!({}))]), text("gave up")]);
    let graph = single(
        Agent::builder("Impatient")
            .tool_arc(sleeper("slow", Duration::from_millis(200), in_flight.clone(), in_flight))
            .build()
            .unwrap(),
    );

    let result = Runner::new(model)
        .run(
            &graph,
            "Impatient",
            Vec::new(),
            &RunContext::new(()),
            RunConfig::default().with_tool_timeout(Duration::from_millis(10)),
        )
        .await
        .unwrap();

    let logged = outputs(&result.items);
    assert!(logged[0].2);
    assert_eq!(logged[0].1, json!("`slow` timed out after 10ms"));
}

#[tokio::test]
async fn test_pre_tool_hook_blocks_and_rewrites() {
    let counter = Arc::new(AtomicUsize::new(0));
    let model = ScriptedModel::new(vec![
        calls(vec![
            call("c1", "refund", json!({})),
            call("c2", "echo", json!({"text": "original"})),
        ]),
        text("ok"),
    ]);
    let echo = FunctionTool::raw(
        "echo",
        "Echo",
        json!({"type": "object", "properties": {"text": {"type": "string"}}}),
        |_ctx: RunContext, input: serde_json::Value| async move { input["text"].clone() },
    );
    let graph = single(
        Agent::builder("Guarded")
            .tool_arc(counting("refund", json!("refunded"), counter.clone()))
            .tool(echo)
            .build()
            .unwrap(),
    );

    let mut hooks = HookManager::new();
    hooks.register(
        FnHook::new("deny-refunds", vec![HookEvent::PreToolUse], |_input, _ctx| async {
            Ok(HookOutput::block("refunds need approval"))
        })
        .matching("^refund$")
        .unwrap(),
    );
    hooks.register(
        FnHook::new("rewrite-echo", vec![HookEvent::PreToolUse], |_input, _ctx| async {
            Ok(HookOutput::allow().with_updated_input(json!({"text": "rewritten"})))
        })
        .matching("^echo$")
        .unwrap(),
    );

    let result = Runner::new(model)
        .with_hooks(hooks)
        .run(&graph, "Guarded", Vec::new(), &RunContext::new(()), RunConfig::default())
        .await
        .unwrap();

    let logged = outputs(&result.items);
    assert_eq!(logged[0].1, json!("blocked by hook: refunds need approval"));
    assert!(logged[0].2);
    assert_eq!(logged[1].1, json!("rewritten"));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_lifecycle_hooks_fire() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
    let recorder = {
        let seen = seen.clone();
        FnHook::new("recorder", HookEvent::all().to_vec(), move |input, _ctx| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(input.event.to_string());
                Ok(HookOutput::allow())
            }
        })
    };
    let mut hooks = HookManager::new();
    hooks.register(recorder);

    let counter = Arc::new(AtomicUsize::new(0));
    let model = ScriptedModel::new(vec![calls(vec![call("c1", "ping", json!({}))]), text("pong")]);
    let graph = single(
        Agent::builder("Pinger")
            .tool_arc(counting("ping", json!("pong"), counter))
            .build()
            .unwrap(),
    );

    Runner::new(model)
        .with_hooks(hooks)
        .run(&graph, "Pinger", Vec::new(), &RunContext::new(()), RunConfig::default())
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["agent_start", "pre_tool_use", "post_tool_use", "agent_end"]
    );
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let model = ScriptedModel::new(vec![text("never")]);
    let graph = single(Agent::builder("Idle").build().unwrap());
    let token = CancellationToken::new();
    token.cancel();

    let result = Runner::new(model.clone())
        .run(&graph, "Idle", Vec::new(), &RunContext::new(()), RunConfig::default().with_cancellation(token))
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(result.final_output.is_none());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_cancel_abandons_pending_model_call() {
    let model = ScriptedModel::slow(Duration::from_secs(30), text("too late"));
    let graph = single(Agent::builder("Slow").build().unwrap());
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = Runner::new(model)
        .run(&graph, "Slow", Vec::new(), &RunContext::new(()), RunConfig::default().with_cancellation(token))
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(result.final_output.is_none());
}

#[tokio::test]
async fn test_run_timeout() {
    let model = ScriptedModel::slow(Duration::from_secs(30), text("too late"));
    let graph = single(Agent::builder("Slow").build().unwrap());

    let result = Runner::new(model)
        .run(
            &graph,
            "Slow",
            Vec::new(),
            &RunContext::new(()),
            RunConfig::default().with_timeout(Duration::from_millis(20)),
        )
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::TimedOut);
    assert!(result.final_output.is_none());
}

#[tokio::test]
async fn test_cancel_during_tool_calls_lets_tools_finish() {
    let token = CancellationToken::new();
    let finished = Arc::new(AtomicUsize::new(0));
    let stop = {
        let token = token.clone();
        let finished = Arc::clone(&finished);
        FunctionTool::raw(
            "stop",
            "cancels the run, then keeps working",
            empty_schema(),
            move |_ctx: RunContext, _input| {
                let token = token.clone();
                let finished = Arc::clone(&finished);
                async move {
                    token.cancel();
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    "tool_result"
                }
            },
        )
    };
    let model = ScriptedModel::new(vec![calls(vec![call("c1", "stop", json!({}))]), text("never")]);
    let graph = single(
        Agent::builder("Stopper")
            .tool(stop)
            .tool_use_behavior(ToolUseBehavior::StopOnFirstTool)
            .build()
            .unwrap(),
    );

    let result = Runner::new(model.clone())
        .run(&graph, "Stopper", Vec::new(), &RunContext::new(()), RunConfig::default().with_cancellation(token))
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(result.final_output.is_none());
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(
        outputs(&result.items),
        vec![("c1".to_string(), json!("tool_result"), false)]
    );
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_timeout_during_tool_calls_lets_tools_finish() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let model = ScriptedModel::new(vec![calls(vec![call("c1", "nap", json!({}))]), text("never")]);
    let graph = single(
        Agent::builder("Napper")
            .tool_arc(sleeper(
                "nap",
                Duration::from_millis(60),
                Arc::clone(&in_flight),
                Arc::clone(&max_in_flight),
            ))
            .tool_use_behavior(ToolUseBehavior::StopOnFirstTool)
            .build()
            .unwrap(),
    );

    let result = Runner::new(model.clone())
        .run(
            &graph,
            "Napper",
            Vec::new(),
            &RunContext::new(()),
            RunConfig::default().with_timeout(Duration::from_millis(20)),
        )
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::TimedOut);
    assert!(result.final_output.is_none());
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    assert_eq!(outputs(&result.items), vec![("c1".to_string(), json!("nap"), false)]);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_unknown_starting_agent() {
    let model = ScriptedModel::new(vec![]);
    let graph = single(Agent::builder("Known").build().unwrap());

    let err = Runner::new(model)
        .run(&graph, "Unknown", Vec::new(), &RunContext::new(()), RunConfig::default())
        .await
        .unwrap_err();

    assert!(err.error.is_configuration_error());
    assert_eq!(err.turns, 0);
}

#[tokio::test]
async fn test_model_error_is_fatal() {
    let model = ScriptedModel::new(vec![]);
    let graph = single(Agent::builder("Lonely").build().unwrap());

    let err = Runner::new(model)
        .run(&graph, "Lonely", Vec::new(), &RunContext::new(()), RunConfig::default())
        .await
        .unwrap_err();

    assert!(err.error.is_retryable());
    assert_eq!(err.to_string(), "Model call failed: script exhausted (agent `Lonely`, turn 1)");
}

#[tokio::test]
async fn test_provider_tools_are_callable() {
    let provider = InProcessProvider::new("weather").tool(
        "forecast",
        "Weather forecast",
        empty_schema(),
        |_args| async { Ok(json!("sunny")) },
    );
    let model = ScriptedModel::new(vec![calls(vec![call("c1", "forecast", json!({}))])]);
    let graph = single(
        Agent::builder("Forecaster")
            .tool_provider(Arc::new(provider))
            .tool_use_behavior(ToolUseBehavior::StopOnFirstTool)
            .build()
            .unwrap(),
    );

    let result = Runner::new(model.clone())
        .run(&graph, "Forecaster", Vec::new(), &RunContext::new(()), RunConfig::default())
        .await
        .unwrap();

    assert_eq!(result.final_output, Some(json!("sunny")));
    assert_eq!(model.request(0).tools[0].name, "forecast");
}

#[tokio::test]
async fn test_model_override_and_settings() {
    let model = ScriptedModel::new(vec![text("ok")]);
    let graph = single(
        Agent::builder("Tuned")
            .model("agent-model")
            .model_settings(crate::ModelSettings::default().with_temperature(0.2))
            .build()
            .unwrap(),
    );

    Runner::new(model.clone())
        .run(
            &graph,
            "Tuned",
            Vec::new(),
            &RunContext::new(()),
            RunConfig::default()
                .with_model("run-model")
                .with_model_settings(crate::ModelSettings::default().with_max_tokens(64)),
        )
        .await
        .unwrap();

    let request = model.request(0);
    assert_eq!(request.model.as_deref(), Some("run-model"));
    assert_eq!(request.settings.temperature, Some(0.2));
    assert_eq!(request.settings.max_tokens, Some(64));
}
