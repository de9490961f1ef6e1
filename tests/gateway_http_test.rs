//! 网关 HTTP 集成测试：本地 axum mock 后端，覆盖三种线协议与非 2xx 错误

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aion::config::{FileConfigSource, LlmSettings};
use aion::core::GatewayError;
use aion::llm::{LlmClient, ModelGateway, ToolSpec};
use aion::memory::Message;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

/// 一次收到的请求：路径参数、查询参数、请求头、请求体
#[derive(Clone, Debug)]
struct Seen {
    path: String,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Value,
}

#[derive(Clone)]
struct Mock {
    seen: Arc<Mutex<Vec<Seen>>>,
    status: StatusCode,
    reply: Value,
}

impl Mock {
    fn new(status: StatusCode, reply: Value) -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
            status,
            reply,
        }
    }

    fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn handle(
    State(mock): State<Mock>,
    path: Option<Path<String>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.seen.lock().unwrap().push(Seen {
        path: path.map(|Path(p)| p).unwrap_or_default(),
        query,
        headers,
        body,
    });
    if mock.status.is_success() {
        (mock.status, Json(mock.reply.clone())).into_response()
    } else {
        (mock.status, mock.reply.as_str().unwrap_or_default().to_string()).into_response()
    }
}

/// 启动 mock 后端，返回 base URL
async fn serve(mock: Mock) -> String {
    let app = Router::new()
        .route("/chat/completions", post(handle))
        .route("/messages", post(handle))
        .route("/models/:action", post(handle))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn settings(provider: &str, api_key: &str, custom_url: &str) -> LlmSettings {
    LlmSettings {
        provider: provider.to_string(),
        api_key: api_key.to_string(),
        custom_url: custom_url.to_string(),
        ..LlmSettings::default()
    }
}

fn gateway(settings: LlmSettings) -> ModelGateway {
    ModelGateway::new(Arc::new(settings))
}

fn manifest() -> Vec<ToolSpec> {
    vec![ToolSpec {
        name: "read_file".to_string(),
        description: "Read a file".to_string(),
        parameters: json!({"type": "object", "properties": {"filePath": {"type": "string"}}}),
    }]
}

#[tokio::test]
async fn test_chat_completions_success() {
    let mock = Mock::new(
        StatusCode::OK,
        json!({"choices": [{"message": {"content": "{\"content\": \"hi there\"}"}}]}),
    );
    let base = serve(mock.clone()).await;
    let gw = gateway(settings("Custom", "", &base));

    let decision = gw
        .infer("You are a test agent.", &[Message::user("hello")], &manifest())
        .await
        .unwrap();
    assert_eq!(decision.content.as_deref(), Some("hi there"));
    assert!(decision.tool_calls.is_empty());

    let seen = mock.requests();
    assert_eq!(seen.len(), 1);
    let body = &seen[0].body;
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["messages"][0]["role"], "system");
    let system = body["messages"][0]["content"].as_str().unwrap();
    assert!(system.starts_with("You are a test agent."));
    assert!(system.contains("## Available tools"));
    assert!(system.contains("\"read_file\""));
    assert_eq!(body["messages"][1], json!({"role": "user", "content": "hello"}));
    // Custom 未配置 Key 时不带 Authorization
    assert!(seen[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_chat_completions_bearer_and_wire_roles() {
    let mock = Mock::new(
        StatusCode::OK,
        json!({"choices": [{"message": {"content": "{\"content\": \"ok\"}"}}]}),
    );
    let base = serve(mock.clone()).await;
    let gw = gateway(settings("OpenAI", "sk-test", &format!("{}/chat/completions", base)));

    let log = vec![
        Message::user("list files"),
        Message::thought("need a listing"),
        Message::tool_result("c1", "a.rs"),
    ];
    gw.infer("sys", &log, &[]).await.unwrap();

    let seen = mock.requests();
    assert_eq!(seen[0].headers["authorization"], "Bearer sk-test");
    let messages = seen[0].body["messages"].as_array().unwrap().clone();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2], json!({"role": "assistant", "content": "[Thought] need a listing"}));
    assert_eq!(messages[3], json!({"role": "user", "content": "Tool Result: a.rs"}));
    assert_eq!(seen[0].body["model"], "gpt-4o");
}

#[tokio::test]
async fn test_non_success_status_carries_status_and_body() {
    let mock = Mock::new(StatusCode::UNAUTHORIZED, json!("invalid api key"));
    let base = serve(mock).await;
    let gw = gateway(settings("OpenAI", "sk-bad", &base));

    let err = gw
        .infer("sys", &[Message::user("hi")], &[])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GatewayError::Status {
            provider: "OpenAI".to_string(),
            status: 401,
            body: "invalid api key".to_string(),
        }
    );
    assert_eq!(err.to_string(), "OpenAI Error: 401 - invalid api key");
}

#[tokio::test]
async fn test_gemini_generate_dialect() {
    let reply = "Sure: {\"thought\": \"look\", \"toolCalls\": [{\"name\": \"read_file\", \"args\": {\"filePath\": \"a.rs\"}}]} done";
    let mock = Mock::new(
        StatusCode::OK,
        json!({"candidates": [{"content": {"parts": [{"text": reply}]}}]}),
    );
    let base = serve(mock.clone()).await;
    let mut s = settings("Gemini", "g-key", &base);
    s.model = "gemini-test".to_string();
    let gw = gateway(s);

    let log = vec![Message::user("read a.rs"), Message::assistant("on it")];
    let decision = gw.infer("sys prompt", &log, &manifest()).await.unwrap();
    assert_eq!(decision.thought.as_deref(), Some("look"));
    assert_eq!(decision.tool_calls.len(), 1);
    assert_eq!(decision.tool_calls[0].name, "read_file");
    assert_eq!(decision.tool_calls[0].args, json!({"filePath": "a.rs"}));

    let seen = mock.requests();
    assert_eq!(seen[0].path, "gemini-test:generateContent");
    assert_eq!(seen[0].query.get("key").map(String::as_str), Some("g-key"));
    let body = &seen[0].body;
    let first = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(first.starts_with("SYSTEM INSTRUCTIONS:\nsys prompt"));
    assert_eq!(body["contents"][1]["role"], "user");
    assert_eq!(body["contents"][2]["role"], "model");
    assert_eq!(body["generationConfig"]["response_mime_type"], "application/json");
}

#[tokio::test]
async fn test_anthropic_messages_dialect() {
    let mock = Mock::new(
        StatusCode::OK,
        json!({"content": [{"type": "text", "text": "plain words, no json"}]}),
    );
    let base = serve(mock.clone()).await;
    let gw = gateway(settings("Anthropic", "a-key", &base));

    let decision = gw
        .infer("sys prompt", &[Message::user("explain")], &[])
        .await
        .unwrap();
    assert_eq!(decision.content.as_deref(), Some("plain words, no json"));

    let seen = mock.requests();
    assert_eq!(seen[0].headers["x-api-key"], "a-key");
    assert_eq!(seen[0].headers["anthropic-version"], "2023-06-01");
    let body = &seen[0].body;
    assert!(body["system"].as_str().unwrap().starts_with("sys prompt"));
    assert_eq!(body["max_tokens"], 4096);
    assert_eq!(body["messages"], json!([{"role": "user", "content": "explain"}]));
}

#[tokio::test]
async fn test_missing_key_is_config_error() {
    let gw = gateway(settings("Anthropic", "", ""));
    let err = gw.infer("sys", &[Message::user("hi")], &[]).await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Config("API key for Anthropic not configured".to_string())
    );

    let gw = gateway(settings("Custom", "", ""));
    let err = gw.infer("sys", &[Message::user("hi")], &[]).await.unwrap_err();
    assert_eq!(err.to_string(), "Custom endpoint URL not configured");
}

#[tokio::test]
async fn test_settings_reread_on_every_call() {
    let mock = Mock::new(
        StatusCode::OK,
        json!({"choices": [{"message": {"content": "{\"content\": \"ok\"}"}}]}),
    );
    let base = serve(mock.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aion.toml");
    let write = |model: &str| {
        std::fs::write(
            &path,
            format!(
                "[llm]\nprovider = \"Custom\"\ncustom_url = \"{}\"\nmodel = \"{}\"\n",
                base, model
            ),
        )
        .unwrap();
    };

    write("first-model");
    let gw = ModelGateway::new(Arc::new(FileConfigSource::new(Some(path.clone()))));
    gw.infer("sys", &[Message::user("a")], &[]).await.unwrap();
    write("second-model");
    gw.infer("sys", &[Message::user("b")], &[]).await.unwrap();

    let models: Vec<Value> = mock
        .requests()
        .into_iter()
        .map(|s| s.body["model"].clone())
        .collect();
    assert_eq!(models, vec![json!("first-model"), json!("second-model")]);
}
