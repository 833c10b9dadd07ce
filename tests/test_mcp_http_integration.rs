use std::sync::Arc;

use axum::{routing::any_service, Router};
use http_body_util::BodyExt; // for .collect
use hyper::{header, Request, StatusCode};
use serde_json::{json, Value};
use tokio::time::{timeout, Duration};
use tower::ServiceExt; // for .oneshot

use erp_mcp_gateway::clients::erp::ErpClient;
use erp_mcp_gateway::infra::http_app::erp_factory;
use erp_mcp_gateway::infra::runtime::mcp_transport;

fn post(body: Value, session_id: Option<&str>) -> Request<axum::body::Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header(header::ACCEPT, "application/json, text/event-stream")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = session_id {
        builder = builder.header("MCP-Session-Id", id);
    }
    builder.body(axum::body::Body::from(body.to_string())).unwrap()
}

/// First JSON-RPC frame carried in an SSE body.
async fn sse_frame(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let s = String::from_utf8_lossy(&bytes);
    s.lines()
        .find_map(|line| line.strip_prefix("data: ").map(|d| d.to_string()))
        .and_then(|d| serde_json::from_str::<Value>(&d).ok())
        .expect("Did not find an rpcResponse")
}

async fn open_session(app: &Router) -> String {
    let init = json!({
        "jsonrpc":"2.0","id":1,"method":"initialize",
        "params":{ "protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"test","version":"0.1"} }
    });
    let init_res = app.clone().oneshot(post(init, None)).await.unwrap();
    assert!(init_res.status().is_success());
    let session_id = init_res
        .headers()
        .get("MCP-Session-Id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();

    let initialized = json!({"jsonrpc":"2.0","method":"notifications/initialized","params":{}});
    let res = app
        .clone()
        .oneshot(post(initialized, Some(&session_id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    session_id
}

fn app_for(erp_base: String) -> Router {
    let session_mgr = Arc::new(mcp_transport::LocalSessionManager::default());
    let svc = mcp_transport::make_streamable_http_service(
        erp_factory(ErpClient::from_parts(erp_base, "key", "secret")),
        session_mgr,
    );
    Router::new().route_service("/mcp", any_service(svc))
}

#[tokio::test]
async fn initialize_list_and_call_over_streamable_http() {
    let server = httpmock::MockServer::start();
    let erp = server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path("/api/resource/Task")
            .query_param("filters", r#"[["status","=","Open"]]"#)
            .query_param("limit_page_length", "20")
            .header("authorization", "token key:secret");
        then.status(200).json_body(json!({"data": [{"name": "TASK-0001"}, {"name": "TASK-0002"}]}));
    });

    let app = app_for(server.base_url());
    let session_id = open_session(&app).await;

    // tools/list
    let list = json!({"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}});
    let list_res = timeout(Duration::from_secs(20), app.clone().oneshot(post(list, Some(&session_id))))
        .await
        .unwrap()
        .unwrap();
    assert!(list_res.status().is_success());
    let v = sse_frame(list_res).await;
    let tools = v["result"]["tools"].as_array().expect("tools array");
    let filtered = tools
        .iter()
        .find(|t| t["name"] == "get_doctype_list_with_filters")
        .expect("filtered list tool advertised");
    assert_eq!(filtered["inputSchema"]["type"], "object");
    assert!(filtered["inputSchema"]["properties"]["doctype"].is_object());
    assert_eq!(filtered["inputSchema"]["required"], json!(["doctype"]));

    // tools/call
    let call = json!({
        "jsonrpc":"2.0","id":3,"method":"tools/call",
        "params": {"name":"get_doctype_list_with_filters","arguments":{"doctype":"Task","field":"status","value":"Open"}}
    });
    let call_res = app.clone().oneshot(post(call, Some(&session_id))).await.unwrap();
    assert!(call_res.status().is_success());
    let v = sse_frame(call_res).await;
    erp.assert();
    let text = v["result"]["content"][0]["text"].as_str().expect("text content");
    let records: Value = serde_json::from_str(text).unwrap();
    assert_eq!(records, json!([{"name": "TASK-0001"}, {"name": "TASK-0002"}]));
}

#[tokio::test]
async fn upstream_failure_is_a_tool_result_not_a_protocol_error() {
    let server = httpmock::MockServer::start();
    server.mock(|when, then| {
        when.method(httpmock::Method::GET).path("/api/resource/User");
        then.status(403).body(r#"{"exc_type":"PermissionError"}"#);
    });

    let app = app_for(server.base_url());
    let session_id = open_session(&app).await;

    let call = json!({
        "jsonrpc":"2.0","id":2,"method":"tools/call",
        "params": {"name":"list_users","arguments":{}}
    });
    let v = sse_frame(app.clone().oneshot(post(call, Some(&session_id))).await.unwrap()).await;
    assert!(v.get("error").is_none(), "unexpected protocol error: {v}");
    let text = v["result"]["content"][0]["text"].as_str().unwrap();
    let records: Value = serde_json::from_str(text).unwrap();
    assert_eq!(records, json!([{"error": r#"{"exc_type":"PermissionError"}"#}]));
}

#[tokio::test]
async fn missing_required_argument_is_invalid_params() {
    let server = httpmock::MockServer::start();
    let erp = server.mock(|when, then| {
        when.method(httpmock::Method::GET).path_contains("/api/resource");
        then.status(200).json_body(json!({"data": []}));
    });

    let app = app_for(server.base_url());
    let session_id = open_session(&app).await;

    let call = json!({
        "jsonrpc":"2.0","id":2,"method":"tools/call",
        "params": {"name":"get_doctype_list","arguments":{"limit": 5}}
    });
    let v = sse_frame(app.clone().oneshot(post(call, Some(&session_id))).await.unwrap()).await;
    assert_eq!(v["error"]["code"], -32602);
    erp.assert_hits(0);
}
