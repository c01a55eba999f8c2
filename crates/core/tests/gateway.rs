use futures_util::StreamExt;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lemonade_manager_core::config::{
    BindConfig, Config, StorageConfig, TimeoutConfig, UpstreamConfig,
};
use lemonade_manager_core::options::LoadParams;
use lemonade_manager_core::{Error, LemonadeClient, ModelOptions, PullRequest};

fn client_for(server: &MockServer, api_key: Option<&str>) -> LemonadeClient {
    let config = Config {
        upstream: UpstreamConfig {
            base_url: server.uri(),
            api_key: api_key.map(String::from),
        },
        bind: BindConfig::default(),
        timeouts: TimeoutConfig {
            load: Duration::from_secs(5),
            light: Duration::from_secs(2),
            pull: Duration::from_secs(5),
        },
        storage: StorageConfig {
            recipe_file: PathBuf::from("recipe_options.json"),
            prefs_file: PathBuf::from("manager_prefs.json"),
        },
    };
    LemonadeClient::new(&config)
}

#[tokio::test]
async fn models_parses_the_data_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "user.phi-4-mini", "recipe": "llamacpp", "downloaded": true},
                {"id": "user.qwen", "recipe": "oga-hybrid"},
            ]
        })))
        .mount(&server)
        .await;

    let models = client_for(&server, None).models().await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, "user.phi-4-mini");
    assert!(models[0].uses_llamacpp());
    assert!(!models[1].uses_llamacpp());
    // `downloaded` defaults to true when the server omits it
    assert!(models[1].downloaded);
}

#[tokio::test]
async fn bearer_credential_is_attached_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .and(header("authorization", "Bearer sekrit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let models = client_for(&server, Some("sekrit")).models().await.unwrap();
    assert!(models.is_empty());
}

#[tokio::test]
async fn health_exposes_the_loaded_id_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_loaded": "user.phi-4-mini",
            "all_models_loaded": [{"model_name": "user.phi-4-mini"}]
        })))
        .mount(&server)
        .await;

    let health = client_for(&server, None).health().await.unwrap();
    assert_eq!(health.model_loaded.as_deref(), Some("user.phi-4-mini"));
    assert!(health.loaded_ids().contains("user.phi-4-mini"));
}

#[tokio::test]
async fn stats_failure_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/stats"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(client_for(&server, None).stats().await.is_none());
}

#[tokio::test]
async fn stats_success_returns_the_raw_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/stats"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"tokens_per_second": 42.5})),
        )
        .mount(&server)
        .await;

    let stats = client_for(&server, None).stats().await.unwrap();
    assert_eq!(stats["tokens_per_second"], 42.5);
}

#[tokio::test]
async fn load_body_contains_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/load"))
        .and(body_json(json!({
            "model_name": "user.phi-4-mini",
            "ctx_size": 4096,
            "llamacpp_backend": "cpu"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let stored = ModelOptions {
        ctx_size: Some(4096),
        llamacpp_args: None,
        llamacpp_backend: Some("vulkan".to_string()),
    };
    let params = LoadParams::with_defaults(&stored, Some("cpu"));
    client_for(&server, None)
        .load("user.phi-4-mini", &params)
        .await
        .unwrap();
}

#[tokio::test]
async fn load_failure_is_an_upstream_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/load"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unknown model"))
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .load("nope", &LoadParams::default())
        .await
        .unwrap_err();
    match err {
        Error::UpstreamRejected { status, body, .. } => {
            assert_eq!(status.as_u16(), 422);
            assert_eq!(body, "unknown model");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unload_all_omits_the_model_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/unload"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server, None).unload(None).await.unwrap();
}

#[tokio::test]
async fn unload_one_names_the_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/unload"))
        .and(body_json(json!({"model_name": "user.qwen"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server, None)
        .unload(Some("user.qwen"))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_posts_the_model_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/delete"))
        .and(body_json(json!({"model_name": "user.qwen"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server, None).delete("user.qwen").await.unwrap();
}

fn pull_request() -> PullRequest {
    PullRequest {
        model_name: "user.phi-4-mini".to_string(),
        checkpoint: "unsloth/Phi-4-mini-instruct-GGUF:Q4_K_M".to_string(),
        recipe: "llamacpp".to_string(),
        mmproj: None,
    }
}

#[tokio::test]
async fn pull_relays_upstream_bytes_unchanged() {
    let server = MockServer::start().await;
    let sse = "data: {\"percent\": 10, \"file_index\": 0}\n\ndata: {\"percent\": 100, \"file_index\": 0}\n\n";
    Mock::given(method("POST"))
        .and(path("/api/v1/pull"))
        .and(body_json(json!({
            "model_name": "user.phi-4-mini",
            "checkpoint": "unsloth/Phi-4-mini-instruct-GGUF:Q4_K_M",
            "recipe": "llamacpp",
            "stream": true
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let chunks: Vec<_> = client.pull(pull_request()).collect().await;
    let body: Vec<u8> = chunks.concat();
    assert_eq!(String::from_utf8(body).unwrap(), sse);
}

#[tokio::test]
async fn pull_rejection_yields_a_single_error_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/pull"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such checkpoint"))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let chunks: Vec<_> = client.pull(pull_request()).collect().await;
    assert_eq!(chunks.len(), 1);

    let text = String::from_utf8(chunks[0].to_vec()).unwrap();
    let data = text.strip_prefix("data: ").unwrap().trim_end();
    let event: serde_json::Value = serde_json::from_str(data).unwrap();
    assert!(event["error"].as_str().unwrap().contains("no such checkpoint"));
}

#[tokio::test]
async fn pull_with_unreachable_upstream_still_emits_an_error_event() {
    // Nothing listens on this port; the connection is refused immediately.
    let config = Config {
        upstream: UpstreamConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
        },
        bind: BindConfig::default(),
        timeouts: TimeoutConfig {
            load: Duration::from_secs(1),
            light: Duration::from_secs(1),
            pull: Duration::from_secs(1),
        },
        storage: StorageConfig {
            recipe_file: PathBuf::from("recipe_options.json"),
            prefs_file: PathBuf::from("manager_prefs.json"),
        },
    };
    let client = LemonadeClient::new(&config);

    let chunks: Vec<_> = client.pull(pull_request()).collect().await;
    assert_eq!(chunks.len(), 1);
    let text = String::from_utf8(chunks[0].to_vec()).unwrap();
    assert!(text.starts_with("data: "));
    assert!(text.contains("error"));
}
