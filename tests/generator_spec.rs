use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use coursegen::generator::{ContentGenerator, GeminiGenerator, GenerationError};
use coursegen::models::*;
use serde_json::{json, Value};
use uuid::Uuid;

/// What the fake backend saw on its last request.
#[derive(Debug, Default, Clone)]
struct Captured {
    call: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Backend {
    status: StatusCode,
    reply: String,
    captured: Arc<Mutex<Captured>>,
}

async fn generate_content(
    State(backend): State<Backend>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    *backend.captured.lock().unwrap() = Captured {
        call,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body,
    };

    let response = json!({
        "candidates": [{ "content": { "parts": [{ "text": backend.reply }] } }]
    });
    (backend.status, Json(response))
}

/// Serve a fake `generateContent` endpoint on an ephemeral port.
async fn spawn_backend(status: StatusCode, reply: &str) -> (String, Arc<Mutex<Captured>>) {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let backend = Backend {
        status,
        reply: reply.to_string(),
        captured: captured.clone(),
    };
    let app = Router::new()
        .route("/v1beta/models/{call}", post(generate_content))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1beta", addr), captured)
}

fn context() -> LessonContext {
    LessonContext {
        lesson_id: Uuid::new_v4(),
        lesson_title: "Intro to Loops".to_string(),
        lesson_description: Some("Repeat work".to_string()),
        module_title: "Control Flow".to_string(),
        course_title: "Python 101".to_string(),
        audience: Some("Beginners".to_string()),
    }
}

mod lessons {
    use super::*;

    #[tokio::test]
    async fn sends_prompt_and_parses_blocks() {
        let reply = r#"```json
[
  {"type": "heading", "content": "Loops"},
  {"type": "code", "content": "for i in range(3): print(i)", "language": "python"},
  {"type": "quiz", "content": "Which keyword?", "options": ["for", "def"], "correctAnswer": "for"}
]
```"#;
        let (base_url, captured) = spawn_backend(StatusCode::OK, reply).await;
        let generator = GeminiGenerator::new("test-key", "gemini-test").with_base_url(base_url);

        let blocks = generator.generate_lesson(&context()).await.unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].kind(), "heading");
        assert!(matches!(
            &blocks[1],
            ContentBlock::Code { language: Some(lang), .. } if lang == "python"
        ));

        let captured = captured.lock().unwrap().clone();
        assert_eq!(captured.call, "gemini-test:generateContent");
        assert_eq!(captured.api_key.as_deref(), Some("test-key"));
        assert_eq!(
            captured.body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        let prompt = captured.body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(prompt.contains("Intro to Loops"));
        assert!(prompt.contains("Python 101"));
    }

    #[tokio::test]
    async fn rejects_an_empty_block_list() {
        let (base_url, _captured) = spawn_backend(StatusCode::OK, "[]").await;
        let generator = GeminiGenerator::new("k", "gemini-test").with_base_url(base_url);

        let err = generator.generate_lesson(&context()).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidContent(_)));
    }

    #[tokio::test]
    async fn surfaces_backend_status() {
        let (base_url, _captured) =
            spawn_backend(StatusCode::TOO_MANY_REQUESTS, "quota exceeded").await;
        let generator = GeminiGenerator::new("k", "gemini-test").with_base_url(base_url);

        let err = generator.generate_lesson(&context()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Backend { status: 429, .. }));
    }
}

mod outlines {
    use super::*;

    #[tokio::test]
    async fn parses_outline() {
        let reply = json!({
            "title": "Rust Basics",
            "description": "Ownership and friends",
            "targetAudience": "Developers",
            "prerequisites": ["Any language"],
            "learningOutcomes": ["Borrow things"],
            "modules": [{
                "title": "Ownership",
                "lessons": [{ "title": "Moves" }, { "title": "Borrows" }]
            }]
        })
        .to_string();
        let (base_url, captured) = spawn_backend(StatusCode::OK, &reply).await;
        let generator = GeminiGenerator::new("k", "gemini-test").with_base_url(base_url);

        let outline = generator.generate_outline("Rust").await.unwrap();

        assert_eq!(outline.title, "Rust Basics");
        assert_eq!(outline.modules.len(), 1);
        assert_eq!(outline.lesson_count(), 2);

        let captured = captured.lock().unwrap().clone();
        let prompt = captured.body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(prompt.contains("Rust"));
    }

    #[tokio::test]
    async fn rejects_outline_without_modules() {
        let reply = json!({ "title": "Empty", "description": "", "modules": [] }).to_string();
        let (base_url, _captured) = spawn_backend(StatusCode::OK, &reply).await;
        let generator = GeminiGenerator::new("k", "gemini-test").with_base_url(base_url);

        let err = generator.generate_outline("Nothing").await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidContent(_)));
    }
}
