//! End-to-end tests for the method table.
//!
//! These tests drive [`Dispatcher::dispatch`] with raw JSON messages against
//! both a degraded backend and an in-memory fake cluster.
//!
//! To run these tests:
//! ```bash
//! cargo test --test dispatcher_test
//!
//! # With debug output
//! RUST_LOG=debug cargo test --test dispatcher_test -- --nocapture
//! ```
mod common;

use common::{degraded_dispatcher, live_dispatcher, request, sample_cluster};
use k8s_mcp::mcp::{JsonRpcResponse, RpcId};
use serde_json::{Value, json};

async fn call(dispatcher: &k8s_mcp::mcp::Dispatcher, message: Value) -> JsonRpcResponse {
    dispatcher
        .dispatch(message)
        .await
        .expect("request with id must get a response")
}

#[tokio::test]
async fn test_initialize_descriptor() {
    let dispatcher = degraded_dispatcher();
    let response = call(&dispatcher, request("initialize", json!({}), json!(1))).await;

    assert_eq!(response.id, Some(RpcId::from(1)));
    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "k8s-mcp");
    assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(result["capabilities"]["toolsSupport"], true);
    assert_eq!(result["capabilities"]["workspaceSupport"], false);
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let dispatcher = degraded_dispatcher();
    let first = call(&dispatcher, request("initialize", json!({}), json!(1))).await;
    let second = call(&dispatcher, request("initialize", json!({"x": 1}), json!(1))).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_initialize_does_not_touch_backend() {
    let dispatcher = degraded_dispatcher();
    call(&dispatcher, request("initialize", json!({}), json!(1))).await;
    call(&dispatcher, request("tools/list", json!({}), json!(2))).await;
    assert!(!dispatcher.backend().is_initialized());
}

#[tokio::test]
async fn test_tool_list_aliases_match() {
    let dispatcher = degraded_dispatcher();
    let a = call(&dispatcher, request("tools/list", json!({}), json!(1))).await;
    let b = call(&dispatcher, request("get_tools", json!({"ignored": true}), json!(1))).await;
    let c = call(&dispatcher, json!({"jsonrpc": "2.0", "method": "get_tools", "id": 1})).await;
    assert_eq!(a.result, b.result);
    assert_eq!(a.result, c.result);

    let tools = a.result.unwrap();
    let names: Vec<_> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["get_pod_status", "describe_pod", "get_pod_logs"]);
    assert_eq!(tools[1]["parameters"]["properties"]["pod_name"]["type"], "string");
}

#[tokio::test]
async fn test_unknown_method_exact_bytes() {
    let dispatcher = degraded_dispatcher();
    let response = call(&dispatcher, json!({"jsonrpc": "2.0", "method": "bogus", "id": "a"})).await;
    assert_eq!(
        serde_json::to_string(&response).unwrap(),
        r#"{"jsonrpc":"2.0","id":"a","error":{"code":-32601,"message":"Method not found"}}"#
    );
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let dispatcher = degraded_dispatcher();
    let messages = [
        json!({"jsonrpc": "2.0", "method": "initialize", "id": null}),
        json!({"jsonrpc": "2.0", "method": "bogus", "id": null}),
        json!({"jsonrpc": "2.0", "method": "describe_pod", "params": {}, "id": null}),
    ];
    for message in messages {
        assert!(dispatcher.dispatch(message.clone()).await.is_none(), "{message}");
    }
}

#[tokio::test]
async fn test_malformed_envelopes() {
    let dispatcher = degraded_dispatcher();
    let messages = [
        json!({"jsonrpc": "1.0", "method": "initialize", "id": 1}),
        json!({"method": "initialize", "id": 1}),
        json!({"jsonrpc": "2.0", "id": 1}),
        json!({"jsonrpc": "2.0", "method": "", "id": 1}),
        json!({"jsonrpc": "2.0", "method": "initialize", "id": {"nested": true}}),
        json!({"jsonrpc": "2.0", "method": "initialize"}),
        json!("initialize"),
        json!(null),
    ];
    for message in messages {
        let response = call(&dispatcher, message.clone()).await;
        assert!(response.id.is_none(), "{message}");
        let error = response.error.unwrap();
        assert_eq!(error.code, -32600, "{message}");
        assert_eq!(error.message, "Invalid Request");
    }
}

#[tokio::test]
async fn test_describe_pod_degraded() {
    let dispatcher = degraded_dispatcher();
    let response = call(
        &dispatcher,
        json!({"jsonrpc":"2.0","method":"describe_pod","params":{"pod_name":"x"},"id":1}),
    )
    .await;

    assert_eq!(response.id, Some(RpcId::from(1)));
    assert!(response.error.is_none());
    let pod = response.result.unwrap();
    assert_eq!(pod["metadata"]["name"], "x");
    assert_eq!(pod["metadata"]["namespace"], "default");
    assert_eq!(pod["status"]["phase"], "Running");
}

#[tokio::test]
async fn test_describe_pod_missing_name() {
    let dispatcher = degraded_dispatcher();
    for params in [json!({}), json!({"pod_name": ""}), Value::Null] {
        let response = call(&dispatcher, request("describe_pod", params.clone(), json!(9))).await;
        assert_eq!(response.id, Some(RpcId::from(9)));
        let error = response.error.unwrap();
        assert_eq!(error.code, -32000, "{params}");
        assert_eq!(error.message, "Internal error");
        assert!(error.data.unwrap().as_str().unwrap().contains("pod_name"));
    }
}

#[tokio::test]
async fn test_pod_logs_invalid_param_type() {
    let dispatcher = degraded_dispatcher();
    let response = call(
        &dispatcher,
        request("get_pod_logs", json!({"pod_name": "p", "tail_lines": "ten"}), json!("logs")),
    )
    .await;
    assert_eq!(response.id, Some(RpcId::from("logs")));
    let error = response.error.unwrap();
    assert_eq!(error.code, -32000);
    assert!(error.data.unwrap().as_str().unwrap().contains("get_pod_logs"));
}

#[tokio::test]
async fn test_pod_status_degraded_returns_a_pod() {
    let dispatcher = degraded_dispatcher();
    let response = call(&dispatcher, request("get_pod_status", json!({}), json!(3))).await;
    let items = response.result.unwrap()["items"].as_array().unwrap().clone();
    assert!(!items.is_empty());
    assert_eq!(items[0]["metadata"]["name"], "mock-pod");
}

#[tokio::test]
async fn test_pod_logs_degraded() {
    let dispatcher = degraded_dispatcher();
    let response = call(&dispatcher, request("get_pod_logs", json!({"pod_name": "p"}), json!(4))).await;
    let logs = response.result.unwrap();
    assert!(logs.as_str().unwrap().starts_with("Mock pod logs"));
}

#[tokio::test]
async fn test_live_pod_status_filters() {
    let dispatcher = live_dispatcher(sample_cluster());

    let all = call(&dispatcher, request("get_pod_status", json!({}), json!(1))).await;
    assert_eq!(all.result.unwrap()["items"].as_array().unwrap().len(), 3);

    let prod = call(&dispatcher, request("get_pod_status", json!({"namespace": "prod"}), json!(2))).await;
    assert_eq!(prod.result.unwrap()["items"].as_array().unwrap().len(), 2);

    let workers = call(
        &dispatcher,
        request("get_pod_status", json!({"selector": "app=worker"}), json!(3)),
    )
    .await;
    let items = workers.result.unwrap()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["metadata"]["name"], "worker-0");
}

#[tokio::test]
async fn test_blank_namespace_lists_all_namespaces() {
    let dispatcher = live_dispatcher(sample_cluster());
    for namespace in ["", "  "] {
        let response = call(
            &dispatcher,
            request("get_pod_status", json!({"namespace": namespace}), json!(1)),
        )
        .await;
        let items = response.result.unwrap()["items"].as_array().unwrap().clone();
        assert_eq!(items.len(), 3, "{namespace:?}");
        assert!(items.iter().all(|p| p["metadata"]["name"] != "mock-pod"));
    }
}

#[tokio::test]
async fn test_live_describe_and_logs() {
    let dispatcher = live_dispatcher(sample_cluster());

    let pod = call(
        &dispatcher,
        request("describe_pod", json!({"pod_name": "web-1", "namespace": "prod"}), json!(1)),
    )
    .await;
    assert_eq!(pod.result.unwrap()["spec"]["nodeName"], "node-a");

    let logs = call(
        &dispatcher,
        request("get_pod_logs", json!({"pod_name": "web-1", "namespace": "prod", "tail_lines": 2}), json!(2)),
    )
    .await;
    assert_eq!(logs.result.unwrap(), json!("line two\nline three"));
}

#[tokio::test]
async fn test_live_not_found_falls_back_silently() {
    let dispatcher = live_dispatcher(sample_cluster());
    let response = call(
        &dispatcher,
        request("describe_pod", json!({"pod_name": "ghost", "namespace": "prod"}), json!(1)),
    )
    .await;

    assert!(response.error.is_none());
    let pod = response.result.unwrap();
    assert_eq!(pod["metadata"]["name"], "ghost");
    assert_eq!(pod["spec"]["containers"][0]["name"], "mock-container");
}

#[tokio::test]
async fn test_live_failure_is_per_call() {
    let cluster = sample_cluster();
    let dispatcher = live_dispatcher(cluster.clone());

    cluster.set_failing(true);
    let failed = call(&dispatcher, request("get_pod_status", json!({}), json!(1))).await;
    assert_eq!(failed.result.unwrap()["items"][0]["metadata"]["name"], "mock-pod");

    cluster.set_failing(false);
    let recovered = call(&dispatcher, request("get_pod_status", json!({}), json!(2))).await;
    assert_eq!(recovered.result.unwrap()["items"].as_array().unwrap().len(), 3);
    assert!(!dispatcher.backend().is_degraded().await);
}

#[tokio::test]
async fn test_handler_panic_becomes_internal_error() {
    let cluster = sample_cluster();
    let dispatcher = live_dispatcher(cluster.clone());
    cluster.set_panicking(true);

    let response = call(&dispatcher, request("get_pod_status", json!({}), json!(42))).await;
    assert_eq!(response.id, Some(RpcId::from(42)));
    let error = response.error.unwrap();
    assert_eq!(error.code, -32000);
    assert!(error.data.unwrap().as_str().unwrap().contains("panicked"));

    cluster.set_panicking(false);
    let response = call(&dispatcher, request("get_pod_status", json!({}), json!(43))).await;
    assert!(response.result.is_some());
}
