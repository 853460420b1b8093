use crate::http::{make_boxed_error_response, text_body};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Readiness flag shared between a service and its admin listener.
/// Starts out not ready.
#[derive(Clone, Debug, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.0.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Serves `/health` and `/ready` for the orchestrator.
pub struct AdminService<E> {
    readiness: Readiness,
    _error: PhantomData<fn() -> E>,
}

impl<E> AdminService<E> {
    pub fn new(readiness: Readiness) -> Self {
        Self {
            readiness,
            _error: PhantomData,
        }
    }
}

impl<E> Service<Request<Incoming>> for AdminService<E>
where
    E: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, E>>;
    type Error = E;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let is_ready = self.readiness.is_ready();

        Box::pin(async move { Ok(admin_response(req.method(), req.uri().path(), is_ready)) })
    }
}

fn admin_response<E: 'static>(
    method: &Method,
    path: &str,
    is_ready: bool,
) -> Response<BoxBody<Bytes, E>> {
    if method != Method::GET && method != Method::HEAD {
        return make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
    }

    match path {
        "/health" => Response::new(text_body("ok\n")),
        "/ready" if is_ready => Response::new(text_body("ok\n")),
        "/ready" => make_boxed_error_response(StatusCode::SERVICE_UNAVAILABLE),
        _ => make_boxed_error_response(StatusCode::NOT_FOUND),
    }
}
