//! End-to-end tests: JSON-RPC envelopes through the handler, dispatcher and store

use flood_memory::{FloodMemoryServer, NodeStore};
use mcp_common::{serve_lines, McpHandler, SessionState};
use serde_json::{json, Value};

fn handler() -> McpHandler<FloodMemoryServer> {
    McpHandler::new(FloodMemoryServer::new(NodeStore::open_in_memory().unwrap()))
}

async fn ready() -> McpHandler<FloodMemoryServer> {
    let handler = handler();
    let response = rpc(&handler, 0, "initialize", json!({"clientInfo": {"name": "tests"}})).await;
    assert!(response.get("error").is_none());
    assert!(handler
        .handle_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await
        .is_none());
    handler
}

async fn rpc(handler: &McpHandler<FloodMemoryServer>, id: i64, method: &str, params: Value) -> Value {
    let response = handler
        .handle_value(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
        .await
        .expect("requests always get a response");
    serde_json::to_value(response).unwrap()
}

/// Call a tool and return `(isError, parsed payload)`
async fn call(handler: &McpHandler<FloodMemoryServer>, name: &str, arguments: Value) -> (bool, Value) {
    let response = rpc(handler, 1, "tools/call", json!({"name": name, "arguments": arguments})).await;
    let result = &response["result"];
    let text = result["content"][0]["text"].as_str().expect("text content");
    (
        result["isError"].as_bool().unwrap_or(false),
        serde_json::from_str(text).unwrap(),
    )
}

#[tokio::test]
async fn test_initialize_reports_identity() {
    let handler = handler();
    assert_eq!(handler.state(), SessionState::Uninitialized);

    let response = rpc(&handler, 1, "initialize", json!({})).await;
    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(response["result"]["serverInfo"]["name"], "flood-memory");
    assert_eq!(
        response["result"]["serverInfo"]["version"],
        env!("CARGO_PKG_VERSION")
    );
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert_eq!(handler.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_tools_gated_until_initialized() {
    let handler = handler();

    let response = rpc(&handler, 1, "tools/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32600);

    let response = rpc(&handler, 2, "ping", json!({})).await;
    assert_eq!(response["result"], json!({}));
}

#[tokio::test]
async fn test_lists_five_tools() {
    let handler = ready().await;
    let response = rpc(&handler, 1, "tools/list", json!({})).await;

    let names: Vec<&str> = response["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["remember", "recall", "connections", "forget", "update"]);
}

#[tokio::test]
async fn test_memory_lifecycle() {
    let handler = ready().await;

    let (failed, first) = call(
        &handler,
        "remember",
        json!({"content": "The borrow checker enforces aliasing rules", "tags": ["rust"]}),
    )
    .await;
    assert!(!failed);
    let first_id = first["id"].as_str().unwrap().to_string();

    let (_, second) = call(
        &handler,
        "remember",
        json!({
            "content": "Lifetimes annotate how long references live",
            "tags": ["rust", "lifetimes"],
            "links": [first_id, "no-such-node"],
            "source": "session-1"
        }),
    )
    .await;
    let second_id = second["id"].as_str().unwrap().to_string();
    assert_eq!(second["links"], json!([first_id]));
    assert_eq!(second["source"], "session-1");

    // Tag-only recall: superset match, newest first
    let (_, hits) = call(&handler, "recall", json!({"tags": ["rust"]})).await;
    let ids: Vec<&str> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second_id.as_str(), first_id.as_str()]);

    let (_, hits) = call(&handler, "recall", json!({"query": "borrow", "tags": ["rust"]})).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["id"], json!(first_id));

    // Back-link was written on the first node
    let (_, reached) = call(&handler, "connections", json!({"node_id": first_id})).await;
    let reached = reached.as_array().unwrap();
    assert_eq!(reached.len(), 2);
    assert_eq!(reached[0]["distance"], 0);
    assert_eq!(reached[1]["id"], json!(second_id));
    assert_eq!(reached[1]["distance"], 1);

    let (_, updated) = call(
        &handler,
        "update",
        json!({"node_id": second_id, "links": []}),
    )
    .await;
    assert_eq!(updated["links"], json!([]));
    assert_eq!(updated["tags"], json!(["rust", "lifetimes"]));

    let (_, reached) = call(&handler, "connections", json!({"node_id": first_id, "depth": 3})).await;
    assert_eq!(reached.as_array().unwrap().len(), 1);

    let (failed, deleted) = call(&handler, "forget", json!({"node_id": first_id})).await;
    assert!(!failed);
    assert_eq!(deleted, json!({"deleted": first_id}));

    let (failed, body) = call(&handler, "connections", json!({"node_id": first_id})).await;
    assert!(failed);
    assert_eq!(body["error"]["kind"], "not_found");
}

#[tokio::test]
async fn test_tool_failures_and_protocol_errors() {
    let handler = ready().await;

    let (failed, body) = call(&handler, "remember", json!({"content": "   "})).await;
    assert!(failed);
    assert_eq!(body["error"]["kind"], "validation_error");

    let (failed, body) = call(&handler, "update", json!({"node_id": "ghost", "tags": ["x"]})).await;
    assert!(failed);
    assert_eq!(body["error"]["kind"], "not_found");

    let (failed, body) = call(&handler, "connections", json!({"node_id": "x", "depth": -1})).await;
    assert!(failed);
    assert_eq!(body["error"]["kind"], "validation_error");

    let response = rpc(&handler, 9, "tools/call", json!({"name": "teleport", "arguments": {}})).await;
    assert_eq!(response["error"]["code"], -32601);

    let response = rpc(&handler, 10, "resources/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["id"], 10);
}

#[tokio::test]
async fn test_stdio_session() {
    let handler = handler();
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n\n",
        "not json at all\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"remember","arguments":{"content":"piped note"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"recall","arguments":{"query":"piped"}}}"#,
        "\n",
    );

    let mut output = Vec::new();
    serve_lines(&handler, input.as_bytes(), &mut output)
        .await
        .unwrap();

    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let ids: Vec<i64> = responses.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let text = responses[2]["result"]["content"][0]["text"].as_str().unwrap();
    let hits: Value = serde_json::from_str(text).unwrap();
    assert_eq!(hits[0]["content"], "piped note");
    assert_eq!(hits[0]["access_count"], 1);
}
