//! Tests for the HTTP grading endpoint, driven in-process through the router.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use essay_grader::protocol::{router, AppState};
use essay_grader::services::ai::{AiConfig, ChatCompletionClient, CompletionModel};
use essay_grader::{GradeError, GradeResult, GENERIC_GRADING_ERROR};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Model double that answers every prompt the same way and records what it saw.
struct ScriptedModel {
    reply: Box<dyn Fn() -> GradeResult<String> + Send + Sync>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(reply: impl Fn() -> GradeResult<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> GradeResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.reply)()
    }
}

fn valid_body() -> Value {
    json!({
        "samples": [{ "text": "The sun rose.", "grade": "C" }],
        "essayText": "My essay.",
        "essayPrompt": "Describe a sunrise."
    })
}

async fn post_grade(model: Arc<dyn CompletionModel>, body: impl Into<Body>) -> (StatusCode, Value) {
    let app = router(AppState::new(model));
    let request = Request::builder()
        .method("POST")
        .uri("/api/grade")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).expect("response body is JSON");
    (status, value)
}

fn assert_exclusive(body: &Value) {
    let has_grade = body.get("grade").is_some();
    let has_error = body.get("error").is_some();
    assert!(has_grade ^ has_error, "body must be a grade or an error: {body}");
}

#[tokio::test]
async fn test_success_returns_grade() {
    let model = ScriptedModel::new(|| Ok("Great effort! ... Grade: B".into()));

    let (status, body) = post_grade(model.clone(), valid_body().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "grade": "Great effort! ... Grade: B" }));
    assert_exclusive(&body);

    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Essay prompt: Describe a sunrise."));
    assert!(prompts[0].contains("Example: The sun rose.\nGrade: C"));
    assert!(prompts[0].ends_with("My essay."));
}

#[tokio::test]
async fn test_no_completion_is_generic_500() {
    let model = ScriptedModel::new(|| Err(GradeError::NoCompletionReturned));

    let (status, body) = post_grade(model, valid_body().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": GENERIC_GRADING_ERROR }));
    assert_exclusive(&body);
}

#[tokio::test]
async fn test_error_detail_is_not_exposed() {
    let model = ScriptedModel::new(|| {
        Err(GradeError::ProviderCallFailed {
            message: "HTTP 401: Incorrect API key provided: sk-secret".into(),
        })
    });

    let (status, body) = post_grade(model, valid_body().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], GENERIC_GRADING_ERROR);
    assert!(!body.to_string().contains("sk-secret"));
}

#[tokio::test]
async fn test_rate_limit_exceeded_is_generic_500() {
    let model = ScriptedModel::new(|| Err(GradeError::RateLimitExceeded { attempts: 6 }));

    let (status, body) = post_grade(model, valid_body().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], GENERIC_GRADING_ERROR);
}

#[tokio::test]
async fn test_empty_grade_is_generic_500() {
    let model = ScriptedModel::new(|| Ok(String::new()));

    let (status, body) = post_grade(model, valid_body().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], GENERIC_GRADING_ERROR);
}

#[tokio::test]
async fn test_missing_fields_rejected_before_model_call() {
    let model = ScriptedModel::new(|| Ok("unused".into()));

    let body = json!({ "samples": [], "essayPrompt": "Describe a sunrise." });
    let (status, body) = post_grade(model.clone(), body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("essayText"));
    assert_exclusive(&body);
    assert!(model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_essay_rejected() {
    let model = ScriptedModel::new(|| Ok("unused".into()));

    let body = json!({ "essayText": "  \n ", "essayPrompt": "Describe a sunrise." });
    let (status, body) = post_grade(model.clone(), body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_gets_error_response() {
    let model = ScriptedModel::new(|| Ok("unused".into()));

    let (status, body) = post_grade(model, "{ this is not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_exclusive(&body);
}

#[tokio::test]
async fn test_long_essay_is_not_cut_off_by_body_limit() {
    let model = ScriptedModel::new(|| Ok("Grade: B".into()));
    let essay = "The sun rose over the hills. ".repeat(3 * 1024 * 1024 / 29 + 1);
    assert!(essay.len() > 3 * 1024 * 1024);

    let body = json!({ "essayText": essay, "essayPrompt": "Describe a sunrise." });
    let (status, body) = post_grade(model.clone(), body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "grade": "Grade: B" }));
    assert!(model.prompts.lock().unwrap()[0].ends_with(&essay));
}

#[tokio::test]
async fn test_empty_sample_list_is_accepted() {
    let model = ScriptedModel::new(|| Ok("Grade: C".into()));

    let body = json!({ "essayText": "My essay.", "essayPrompt": "Describe a sunrise." });
    let (status, _) = post_grade(model.clone(), body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!model.prompts.lock().unwrap()[0].contains("Example:"));
}

#[tokio::test]
async fn test_provider_whitespace_is_trimmed_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "  B+\n" } }]
        })))
        .mount(&mock_server)
        .await;

    let config = AiConfig::default()
        .with_api_key("test-key")
        .with_endpoint(format!("{}/v1/chat/completions", mock_server.uri()));
    let model = Arc::new(ChatCompletionClient::new(config).unwrap());

    let (status, body) = post_grade(model, valid_body().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "grade": "B+" }));
}

#[tokio::test]
async fn test_provider_zero_choices_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&mock_server)
        .await;

    let config = AiConfig::default()
        .with_api_key("test-key")
        .with_endpoint(format!("{}/v1/chat/completions", mock_server.uri()));
    let model = Arc::new(ChatCompletionClient::new(config).unwrap());

    let (status, body) = post_grade(model, valid_body().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": GENERIC_GRADING_ERROR }));
}

#[tokio::test]
async fn test_health() {
    let model = ScriptedModel::new(|| Ok("unused".into()));
    let app = router(AppState::new(model));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}
