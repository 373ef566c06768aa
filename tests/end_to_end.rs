//! Full path: client session -> HTTP endpoint -> model adapter -> mocked provider.

use std::sync::Arc;
use std::time::Duration;

use essay_grader::client::{FileStore, GraderSession, HttpGradeApi};
use essay_grader::protocol::{router, AppState};
use essay_grader::services::ai::{AiConfig, Backoff, ChatCompletionClient, RetryPolicy};
use essay_grader::services::verdict::extract_letter_grade;
use essay_grader::{LetterGrade, Sample};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEEDBACK: &str = "Great effort! ... Grade: B";

async fn spawn_endpoint(provider: &MockServer) -> String {
    let config = AiConfig::default()
        .with_api_key("test-key")
        .with_endpoint(format!("{}/v1/chat/completions", provider.uri()))
        .with_retry(RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(20),
            backoff: Backoff::Fixed,
        });
    let model = ChatCompletionClient::new(config).unwrap();
    let app = router(AppState::new(Arc::new(model)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_sunrise_scenario() {
    let provider = MockServer::start().await;

    // One rate-limit hiccup before the answer; the client must never notice it.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": FEEDBACK } }]
        })))
        .mount(&provider)
        .await;

    let base_url = spawn_endpoint(&provider).await;
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("storage.json");

    let mut session = GraderSession::hydrate(FileStore::new(&store_path));
    session.add_sample().unwrap();
    session.set_sample_text(0, "The sun rose.").unwrap();
    session.set_sample_grade(0, LetterGrade::C).unwrap();
    session.set_essay_prompt("Describe a sunrise.");
    session.set_essay_text("My essay.");

    let api = HttpGradeApi::new(&base_url).unwrap();
    let output = session.grade_essay(&api).await.unwrap().to_string();

    assert_eq!(output, FEEDBACK);
    assert_eq!(session.grading_output(), FEEDBACK);
    assert_eq!(extract_letter_grade(&output), Some(LetterGrade::B));

    let requests = provider.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("Essay prompt: Describe a sunrise."));
    assert!(prompt.contains("Example: The sun rose.\nGrade: C"));
    assert!(prompt.ends_with("My essay."));

    // Samples survive a restart of the client.
    let reloaded = GraderSession::hydrate(FileStore::new(&store_path));
    assert_eq!(
        reloaded.samples(),
        &[Sample::new("The sun rose.", LetterGrade::C)]
    );
}

#[tokio::test]
async fn test_provider_outage_leaves_client_output_alone() {
    let provider = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&provider)
        .await;

    let base_url = spawn_endpoint(&provider).await;
    let dir = tempfile::tempdir().unwrap();

    let mut session = GraderSession::hydrate(FileStore::new(dir.path().join("storage.json")));
    session.set_essay_prompt("Describe a sunrise.");
    session.set_essay_text("My essay.");

    let api = HttpGradeApi::new(&base_url).unwrap();
    assert!(session.grade_essay(&api).await.is_err());
    assert_eq!(session.grading_output(), "");
    assert_eq!(provider.received_requests().await.unwrap().len(), 1);
}
