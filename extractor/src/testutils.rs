use crate::azure::{SharedKeyClient, StorageAccount};
use crate::queue::{InMemoryQueue, MessageQueue, QueueError};
use crate::store::{ObjectStore, StoreError};
use crate::types::{LeaseHandle, QueueMessage};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use metrics::{
    Counter, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
struct CannedResponse {
    status: StatusCode,
    error_code: Option<String>,
    body: String,
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<HashMap<Method, CannedResponse>>>,
}

/// Stand-in for the storage service. Records every request and answers with
/// a canned response per method.
pub struct MockStorageServer {
    addr: SocketAddr,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockStorageServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = MockState::default();
        let app = Router::new().fallback(record).with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockStorageServer {
            addr,
            state,
            handle,
        }
    }

    pub fn respond(&self, method: Method, status: StatusCode, body: &str) {
        self.state.responses.lock().insert(
            method,
            CannedResponse {
                status,
                error_code: None,
                body: body.to_string(),
            },
        );
    }

    pub fn respond_with_code(&self, method: Method, status: StatusCode, error_code: &str) {
        self.state.responses.lock().insert(
            method,
            CannedResponse {
                status,
                error_code: Some(error_code.to_string()),
                body: String::new(),
            },
        );
    }

    /// Client for a development account whose endpoints point at this server.
    pub fn client(&self) -> SharedKeyClient {
        let connection_string = format!(
            "AccountName=devstoreaccount1;AccountKey=c2VjcmV0;\
             QueueEndpoint=http://{0}/devstoreaccount1;BlobEndpoint=http://{0}/devstoreaccount1",
            self.addr
        );
        let account: StorageAccount = connection_string.parse().unwrap();
        SharedKeyClient::new(account)
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{path}", self.addr)).unwrap()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }
}

impl Drop for MockStorageServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record(State(state): State<MockState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    let authorization = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    state.requests.lock().push(RecordedRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        authorization,
        headers: parts.headers,
        body,
    });

    let canned = state.responses.lock().get(&parts.method).cloned();
    match canned {
        Some(canned) => {
            let mut builder = Response::builder().status(canned.status);
            if let Some(code) = canned.error_code {
                builder = builder.header("x-ms-error-code", code);
            }
            builder.body(Body::from(canned.body)).unwrap()
        }
        None => StatusCode::NOT_IMPLEMENTED.into_response(),
    }
}

/// Wraps an [`InMemoryQueue`], recording every call and failing chosen
/// operations.
pub struct FaultyQueue {
    pub inner: InMemoryQueue,
    calls: Mutex<Vec<&'static str>>,
    lose_delete: Mutex<HashSet<String>>,
    lose_update: Mutex<HashSet<String>>,
    fail_receive: Mutex<bool>,
}

impl FaultyQueue {
    pub fn new(inner: InMemoryQueue) -> Self {
        FaultyQueue {
            inner,
            calls: Mutex::new(Vec::new()),
            lose_delete: Mutex::new(HashSet::new()),
            lose_update: Mutex::new(HashSet::new()),
            fail_receive: Mutex::new(false),
        }
    }

    /// The next delete of `id` behaves as if a rival scan deleted it first.
    pub fn lose_delete_race(&self, id: &str) {
        self.lose_delete.lock().insert(id.to_string());
    }

    pub fn lose_update_race(&self, id: &str) {
        self.lose_update.lock().insert(id.to_string());
    }

    pub fn fail_receive(&self) {
        *self.fail_receive.lock() = true;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl MessageQueue for FaultyQueue {
    async fn ensure_exists(&self) -> Result<(), QueueError> {
        self.calls.lock().push("ensure_exists");
        self.inner.ensure_exists().await
    }

    async fn receive_page(&self, max_count: u8) -> Result<Vec<QueueMessage>, QueueError> {
        self.calls.lock().push("receive_page");
        if *self.fail_receive.lock() {
            return Err(QueueError::LeaseLost("receive".to_string()));
        }
        self.inner.receive_page(max_count).await
    }

    async fn delete(&self, handle: LeaseHandle) -> Result<(), QueueError> {
        self.calls.lock().push("delete");
        if self.lose_delete.lock().remove(handle.id()) {
            // The rival's delete succeeds with its own lease.
            let id = handle.id().to_string();
            self.inner.delete(handle).await?;
            return Err(QueueError::LeaseLost(id));
        }
        self.inner.delete(handle).await
    }

    async fn update_visibility(
        &self,
        handle: LeaseHandle,
        delay: Duration,
    ) -> Result<(), QueueError> {
        self.calls.lock().push("update_visibility");
        if self.lose_update.lock().remove(handle.id()) {
            return Err(QueueError::LeaseLost(handle.id().to_string()));
        }
        self.inner.update_visibility(handle, delay).await
    }
}

/// Object store whose writes always fail.
#[derive(Default)]
pub struct FailingStore {
    pub puts: Mutex<usize>,
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn ensure_container_exists(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn put(&self, _name: &str, _body: Bytes, _overwrite: bool) -> Result<(), StoreError> {
        *self.puts.lock() += 1;
        Err(StoreError::Io(io::Error::other("disk full")))
    }
}

/// Metrics recorder that keeps the names of recorded histogram values.
#[derive(Default)]
pub struct HistogramRecorder {
    recorded: Arc<Mutex<Vec<String>>>,
}

impl HistogramRecorder {
    pub fn recorded(&self) -> Vec<String> {
        self.recorded.lock().clone()
    }
}

struct RecordedHistogram {
    name: String,
    recorded: Arc<Mutex<Vec<String>>>,
}

impl HistogramFn for RecordedHistogram {
    fn record(&self, _value: f64) {
        self.recorded.lock().push(self.name.clone());
    }
}

impl Recorder for HistogramRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
        Counter::noop()
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(RecordedHistogram {
            name: key.name().to_string(),
            recorded: self.recorded.clone(),
        }))
    }
}
