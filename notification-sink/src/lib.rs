pub mod config;

use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::admin_service::{AdminService, Readiness};
use shared::http::{make_boxed_error_response, run_http_service, text_body};
use std::pin::Pin;
use tokio::sync::mpsc;

pub const NOTIFICATIONS_PATH: &str = "/api/notifications";

const DEFAULT_MESSAGE: &str = "no message received";

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run(config: config::Config) -> Result<(), SinkError> {
    let readiness = Readiness::new();
    let sink_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        NotificationSink::new(),
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<SinkError>::new(readiness.clone()),
    );

    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        "Notification sink listening"
    );
    readiness.set_ready(true);

    tokio::try_join!(sink_task, admin_task)?;
    Ok(())
}

/// Receives notifications and logs them. Every received message is also
/// forwarded to the observer, if one is attached.
#[derive(Default)]
pub struct NotificationSink {
    observer: Option<mpsc::UnboundedSender<String>>,
}

impl NotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: mpsc::UnboundedSender<String>) -> Self {
        NotificationSink {
            observer: Some(observer),
        }
    }

    fn handle(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
    ) -> Response<BoxBody<Bytes, SinkError>> {
        if path != NOTIFICATIONS_PATH {
            return make_boxed_error_response(StatusCode::NOT_FOUND);
        }
        if method != Method::GET && method != Method::POST {
            return make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
        }

        let message = message_param(query).unwrap_or_else(|| DEFAULT_MESSAGE.to_string());
        tracing::info!(message = %message, "Notification received");

        if let Some(observer) = &self.observer {
            // A dropped receiver only means nobody is watching anymore.
            let _ = observer.send(message);
        }

        Response::new(text_body("ok\n"))
    }
}

fn message_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "message")
        .map(|(_, value)| value.into_owned())
}

impl Service<Request<Incoming>> for NotificationSink {
    type Response = Response<BoxBody<Bytes, Self::Error>>;
    type Error = SinkError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let response = self.handle(req.method(), req.uri().path(), req.uri().query());
        Box::pin(async move { Ok(response) })
    }
}
