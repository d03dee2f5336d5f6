//! HTTP transport tests against a live listener on an ephemeral port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use dice_gateway::admission::{AdmissionControl, BucketPolicy};
use dice_gateway::config::Config;
use dice_gateway::dice::SequenceRandom;
use dice_gateway::error::rpc_codes;
use dice_gateway::gateway::{Dispatcher, Gateway};
use dice_gateway::registry::ToolRegistry;

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<dice_gateway::Result<()>>,
}

impl TestServer {
    async fn start(capacity: u32, cost: u32) -> Self {
        let mut config = Config::default();
        config.server.max_body_size = 1024;
        config.server.shutdown_timeout = Duration::from_secs(1);

        let policy = BucketPolicy::new(capacity, 10, Duration::from_secs(60)).unwrap();
        let dispatcher = Dispatcher::new(
            Arc::new(ToolRegistry::dice()),
            Arc::new(AdmissionControl::new(policy)),
            cost,
        )
        .with_random(Arc::new(SequenceRandom::new(vec![5])));
        let gateway = Gateway::with_dispatcher(config, Arc::new(dispatcher));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(gateway.serve(listener, async move {
            let _ = rx.await;
        }));

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

async fn post_raw(client: &reqwest::Client, url: &str, body: &'static str) -> reqwest::Response {
    client
        .post(url)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap()
}

/// Health endpoint reports the catalog size
#[tokio::test]
async fn test_health() {
    let server = TestServer::start(10, 5).await;
    let body: Value = reqwest::get(server.url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["tools"], json!(4));
    assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
    server.stop().await;
}

/// A tool call over HTTP returns the rendered result with status 200
#[tokio::test]
async fn test_tool_call_over_http() {
    let server = TestServer::start(10, 5).await;
    let client = reqwest::Client::new();
    let response = post_raw(
        &client,
        &server.url("/mcp"),
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"roll_d6"}}"#,
    )
    .await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"content": [{"type": "text", "text": "🎲 d6 roll: **5**"}], "isError": false}
        })
    );
    server.stop().await;
}

/// Malformed JSON reaches the dispatcher and gets a parse error envelope
#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = TestServer::start(10, 5).await;
    let client = reqwest::Client::new();
    let response = post_raw(&client, &server.url("/mcp"), "{\"id\":1,").await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], json!(rpc_codes::PARSE_ERROR));
    assert_eq!(body["id"], Value::Null);
    server.stop().await;
}

/// Budget exhaustion answers 429 with Retry-After
#[tokio::test]
async fn test_rate_limited_is_429() {
    let server = TestServer::start(10, 5).await;
    let client = reqwest::Client::new();
    let call = r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"roll_d20"}}"#;

    for _ in 0..2 {
        let ok = post_raw(&client, &server.url("/mcp"), call).await;
        assert_eq!(ok.status(), reqwest::StatusCode::OK);
    }

    let denied = post_raw(&client, &server.url("/mcp"), call).await;
    assert_eq!(denied.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(denied.headers()["retry-after"], "30");
    let body: Value = denied.json().await.unwrap();
    assert_eq!(body["error"]["code"], json!(rpc_codes::RATE_LIMITED));
    assert_eq!(body["id"], json!(7));
    server.stop().await;
}

/// X-Forwarded-For picks the bucket
#[tokio::test]
async fn test_forwarded_for_selects_bucket() {
    let server = TestServer::start(5, 5).await;
    let client = reqwest::Client::new();
    let call = r#"{"id":1,"method":"tools/call","params":{"name":"roll_d6"}}"#;

    let send = |who: &'static str| {
        client
            .post(server.url("/mcp"))
            .header("x-forwarded-for", who)
            .body(call)
            .send()
    };

    assert_eq!(send("198.51.100.1").await.unwrap().status(), reqwest::StatusCode::OK);
    assert_eq!(
        send("198.51.100.1").await.unwrap().status(),
        reqwest::StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(send("198.51.100.2").await.unwrap().status(), reqwest::StatusCode::OK);
    server.stop().await;
}

/// Listing is not charged
#[tokio::test]
async fn test_tools_list_over_http() {
    let server = TestServer::start(5, 5).await;
    let client = reqwest::Client::new();
    for _ in 0..3 {
        let response = post_raw(
            &client,
            &server.url("/mcp"),
            r#"{"jsonrpc":"2.0","id":"x","method":"tools/list"}"#,
        )
        .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 4);
    }
    server.stop().await;
}

/// Oversized bodies are refused before dispatch
#[tokio::test]
async fn test_body_limit() {
    let server = TestServer::start(10, 5).await;
    let client = reqwest::Client::new();
    let response = client
        .post(server.url("/mcp"))
        .body("x".repeat(4096))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
    server.stop().await;
}
