use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, batch_size: u32) -> OllamaConfig {
    let address = server.address();
    OllamaConfig {
        host: address.ip().to_string(),
        port: address.port(),
        embedding_model: "test-embed".to_string(),
        completion_model: "test-chat".to_string(),
        batch_size,
        ..OllamaConfig::default()
    }
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        embedding_model: "test-embed".to_string(),
        completion_model: "test-chat".to_string(),
        batch_size: 128,
        timeout_seconds: 30,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.embedding_model, "test-embed");
    assert_eq!(client.completion_model(), "test-chat");
    assert_eq!(client.model_name(), "test-embed");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);
    assert_eq!(client.retry_attempts, 5);

    let client = client.with_retry_attempts(0);
    assert_eq!(client.retry_attempts, 1);
}

#[test]
fn empty_input_makes_no_request() {
    let client = OllamaClient::new(&OllamaConfig::default()).expect("Failed to create client");
    let embeddings = client
        .generate_embeddings(&[])
        .expect("empty input should succeed");
    assert!(embeddings.is_empty());
}

#[tokio::test]
async fn embeddings_are_batched_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"model": "test-embed", "input": ["a", "b"]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.5, 0.5]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 2)).expect("Failed to create client");
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];

    let embeddings = tokio::task::spawn_blocking(move || client.encode(&texts))
        .await
        .expect("blocking task should join")
        .expect("embedding should succeed");

    assert_eq!(
        embeddings,
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]
    );
}

#[tokio::test]
async fn embedding_count_mismatch_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0]]})),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 16)).expect("Failed to create client");
    let texts = vec!["a".to_string(), "b".to_string()];

    let result = tokio::task::spawn_blocking(move || client.encode(&texts))
        .await
        .expect("blocking task should join");

    assert!(matches!(result, Err(crate::Error::Embedding(_))));
}

#[tokio::test]
async fn completion_returns_response_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "test-chat", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "test-chat",
            "response": "  A stack is LIFO.\n",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 16)).expect("Failed to create client");

    let completion = tokio::task::spawn_blocking(move || client.complete("What is a stack?"))
        .await
        .expect("blocking task should join")
        .expect("completion should succeed");

    assert_eq!(completion, "  A stack is LIFO.\n");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "model not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 16))
        .expect("Failed to create client")
        .with_retry_attempts(3);

    let result = tokio::task::spawn_blocking(move || client.complete("prompt"))
        .await
        .expect("blocking task should join");

    assert!(matches!(result, Err(crate::Error::Completion(_))));
}

#[tokio::test]
async fn health_check_reports_missing_model() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "test-embed", "size": 1, "digest": "abc"}]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 16)).expect("Failed to create client");

    let result = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("blocking task should join");

    let error = result.expect_err("completion model is missing");
    assert!(error.to_string().contains("test-chat"));
}

#[tokio::test]
async fn completion_server_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 16))
        .expect("Failed to create client")
        .with_retry_attempts(3);

    let result = tokio::task::spawn_blocking(move || client.complete("prompt"))
        .await
        .expect("blocking task should join");

    assert!(matches!(result, Err(crate::Error::Completion(_))));
}

#[tokio::test]
async fn embedding_server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server, 16))
        .expect("Failed to create client")
        .with_retry_attempts(2);
    let texts = vec!["a".to_string()];

    let result = tokio::task::spawn_blocking(move || client.encode(&texts))
        .await
        .expect("blocking task should join");

    assert!(matches!(result, Err(crate::Error::Embedding(_))));
}
