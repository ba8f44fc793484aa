use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ask-chatbot", post(ask_chatbot))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

async fn ask_chatbot(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let message = request.message.unwrap_or_default();
    match state.chat.ask(&message, request.session_id).await {
        Ok(reply) => Json(json!({ "reply": reply })).into_response(),
        Err(AppError::MissingInput(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No message provided" })),
        )
            .into_response(),
        Err(e) => (e.status(), Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::tests::sample;
    use crate::chat::UNAVAILABLE_REPLY;
    use crate::routes::tests::{body_text, TestApp};
    use crate::translation::testing::FakeService;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;

    fn chat_post(body: &'static str) -> Request<Body> {
        Request::post("/ask-chatbot")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn reply_is_returned_and_logged_with_session() {
        let service = FakeService::new(|_| Ok("Καλησπέρα!".into()));
        let app = TestApp::new(vec![sample("the-twins")], Some(service.clone())).await;

        let response = app
            .send(chat_post(r#"{"message": "Γεια", "session_id": "abc"}"#))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["reply"], "Καλησπέρα!");

        assert_eq!(service.calls(), 1);
        let entries = app.log.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].session_id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn missing_message_is_rejected() {
        let service = FakeService::new(|_| Ok("unused".into()));
        let app = TestApp::new(vec![], Some(service.clone())).await;

        let response = app.send(chat_post("{}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "No message provided");
        assert_eq!(service.calls(), 0);
        assert!(app.log.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn without_service_the_apology_is_returned() {
        let app = TestApp::new(vec![], None).await;
        let response = app.send(chat_post(r#"{"message": "Γεια"}"#)).await;
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["reply"], UNAVAILABLE_REPLY);
    }
}
