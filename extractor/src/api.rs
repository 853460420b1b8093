use crate::config::Listener as ListenerConfig;
use crate::pipeline::{Extraction, ExtractionError, ExtractionOutcome};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub const EXTRACT_PATH: &str = "/api/extract";

pub fn router(extraction: Extraction) -> Router {
    Router::new()
        .route(EXTRACT_PATH, get(handler).post(handler))
        .with_state(extraction)
}

pub async fn serve(listener: &ListenerConfig, extraction: Extraction) -> std::io::Result<()> {
    let addr = format!("{}:{}", listener.host, listener.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Extraction API listening");
    axum::serve(listener, router(extraction)).await
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum ApiResponse {
    QueueEmpty,
    NoMatches {
        received: usize,
    },
    Archived {
        archive: String,
        matched: usize,
        notification: &'static str,
    },
}

impl From<ExtractionOutcome> for ApiResponse {
    fn from(outcome: ExtractionOutcome) -> Self {
        match outcome {
            ExtractionOutcome::QueueEmpty => ApiResponse::QueueEmpty,
            ExtractionOutcome::NoMatches { received } => ApiResponse::NoMatches { received },
            ExtractionOutcome::Archived {
                record,
                matched,
                notification,
            } => ApiResponse::Archived {
                archive: record.name,
                matched,
                notification: notification.as_str(),
            },
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

impl IntoResponse for ExtractionError {
    fn into_response(self) -> Response {
        let status = match self {
            ExtractionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ExtractionError::Scan(_) | ExtractionError::Archive(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[derive(Deserialize, Debug)]
struct Params {
    #[serde(rename = "correlationId")]
    correlation_id: Option<String>,
}

async fn handler(
    State(extraction): State<Extraction>,
    Query(params): Query<Params>,
) -> Result<ApiResponse, ExtractionError> {
    match extraction.run(params.correlation_id.as_deref()).await {
        Ok(outcome) => Ok(outcome.into()),
        Err(e) => {
            tracing::error!(error = %e, "Extraction failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archiver::Archiver;
    use crate::deferral::DeferralPolicy;
    use crate::queue::{InMemoryQueue, MAX_PAGE_SIZE};
    use crate::scanner::QueueScanner;
    use crate::store::InMemoryStore;
    use crate::testutils::FaultyQueue;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(queue: Arc<FaultyQueue>) -> Router {
        let extraction = Extraction::new(
            QueueScanner::new(queue, DeferralPolicy::default(), MAX_PAGE_SIZE),
            Archiver::new(Arc::new(InMemoryStore::new())),
            None,
        );
        router(extraction)
    }

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_missing_correlation_id() {
        let queue = Arc::new(FaultyQueue::new(InMemoryQueue::new()));

        let (status, body) = call(app(queue.clone()), Method::GET, "/api/extract").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error_message": "correlation id is missing or empty"})
        );

        let (status, _) = call(
            app(queue.clone()),
            Method::POST,
            "/api/extract?correlationId=",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(queue.calls().is_empty());
    }

    #[tokio::test]
    async fn test_outcomes() {
        let queue = Arc::new(FaultyQueue::new(InMemoryQueue::new()));
        let app = app(queue.clone());

        let (status, body) = call(app.clone(), Method::GET, "/api/extract?correlationId=X").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"outcome": "queue_empty"}));

        queue.inner.enqueue(STANDARD.encode("Y,Bob,25"));
        queue.inner.enqueue(STANDARD.encode("X,Alice,30"));
        let (status, body) = call(app.clone(), Method::POST, "/api/extract?correlationId=X").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "archived");
        assert_eq!(body["matched"], 1);
        assert_eq!(body["notification"], "disabled");
        assert!(body["archive"].as_str().unwrap().starts_with("X_"));

        queue.inner.enqueue(STANDARD.encode("Z,Dan,50"));
        let (status, body) = call(app, Method::GET, "/api/extract?correlationId=X").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"outcome": "no_matches", "received": 1}));
    }

    #[tokio::test]
    async fn test_backend_failure() {
        let queue = Arc::new(FaultyQueue::new(InMemoryQueue::new()));
        queue.fail_receive();

        let (status, body) = call(app(queue), Method::GET, "/api/extract?correlationId=X").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body["error_message"]
                .as_str()
                .unwrap()
                .starts_with("could not receive messages")
        );
    }
}
