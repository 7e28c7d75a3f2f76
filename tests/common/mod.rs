//! Shared helpers for the integration tests

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use qiita_editor::config::Config;

/// Write `contents` to `config.yaml` in a fresh temp dir
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Configuration pointing both APIs at mock servers
pub fn test_config(openai: &MockServer, qiita: &MockServer) -> Config {
    let mut config = Config::default();
    config.provider.openai.api_base = openai.uri();
    config.provider.openai.api_key = Some("sk-test".to_string());
    config.qiita.api_base = qiita.uri();
    config.qiita.access_token = Some("qiita-test".to_string());
    config.agent.timeout_seconds = 30;
    config
}

/// Chat Completions body with a plain assistant answer
pub fn text_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// Chat Completions body requesting one tool call
pub fn tool_call_completion(id: &str, name: &str, args: Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": args.to_string()}
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// Checker verdict as a completion
pub fn verdict(status: &str, name: &str, comment: &str) -> Value {
    text_completion(&json!({"status": status, "name": name, "comment": comment}).to_string())
}

/// Serve `responses` from `/chat/completions`, one per request, in order
pub async fn script_completions(server: &MockServer, responses: Vec<Value>) {
    for body in responses {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
}

/// Bodies of the requests received by `server`, parsed as JSON
pub async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|r| serde_json::from_slice(&r.body).expect("JSON request body"))
        .collect()
}
