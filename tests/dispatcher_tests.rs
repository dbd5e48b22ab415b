//! Tests for the request dispatcher and coroutine handler system.
//!
//! Covers handler registration and lookup, request routing to the correct
//! handler, typed conversion failures, backend error mapping, and
//! middleware execution.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::Method;
use medigate::backend::{BackendRequest, MockBackend, PredictionBackend};
use medigate::dispatcher::{
    Dispatcher, HandlerRequest, HandlerResponse, HeaderVec, ImagePayload, ParamVec,
};
use medigate::middleware::Middleware;
use medigate::registry::{self, Disease};
use medigate::router::{RouteMatch, Router};
use medigate::Outcome;

mod common;

fn route_for(disease: Disease) -> RouteMatch {
    let router = Router::new(registry::build_routes());
    router
        .route(Method::POST, &disease.path())
        .expect("route must exist")
}

fn dispatch_json(
    dispatcher: &Dispatcher,
    route: RouteMatch,
    body: Option<serde_json::Value>,
) -> Option<HandlerResponse> {
    dispatcher.dispatch(
        route,
        body,
        None,
        ParamVec::new(),
        HeaderVec::new(),
        HeaderVec::new(),
    )
}

#[test]
fn test_dispatcher_routes_to_handler() {
    common::setup_may_runtime();
    let mut dispatcher = Dispatcher::new();
    unsafe {
        dispatcher.register_handler("predict_diabetes", |req: HandlerRequest| {
            let body = req.body.clone().unwrap_or(serde_json::json!(null));
            let _ = req
                .reply_tx
                .send(HandlerResponse::json(200, serde_json::json!({"echo": body})));
        });
    }

    let resp = dispatch_json(
        &dispatcher,
        route_for(Disease::Diabetes),
        Some(serde_json::json!({"age": 45})),
    )
    .expect("handler registered");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["echo"]["age"], 45);
}

#[test]
fn test_unregistered_handler_returns_none() {
    common::setup_may_runtime();
    let dispatcher = Dispatcher::new();
    let resp = dispatch_json(
        &dispatcher,
        route_for(Disease::Diabetes),
        Some(serde_json::json!({})),
    );
    assert!(resp.is_none());
}

#[test]
fn test_typed_handler_missing_body_is_400() {
    common::setup_may_runtime();
    let backend: Arc<dyn PredictionBackend> = Arc::new(MockBackend::new());
    let mut dispatcher = Dispatcher::new();
    unsafe {
        medigate::handlers::register_all(&mut dispatcher, &backend);
    }

    // Dispatching without a body bypasses the service-level check and must
    // still fail safely in the typed conversion.
    let resp = dispatch_json(&dispatcher, route_for(Disease::Diabetes), None)
        .expect("handler registered");
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body["error"], "Invalid request data");
}

#[test]
fn test_image_handler_requires_image_payload() {
    common::setup_may_runtime();
    let backend: Arc<dyn PredictionBackend> = Arc::new(MockBackend::new());
    let mut dispatcher = Dispatcher::new();
    unsafe {
        medigate::handlers::register_all(&mut dispatcher, &backend);
    }

    let resp = dispatch_json(&dispatcher, route_for(Disease::CovidDetection), None)
        .expect("handler registered");
    assert_eq!(resp.status, 400);

    let image = ImagePayload {
        file_name: Some("xray.png".to_string()),
        content_type: Some("image/png".to_string()),
        bytes: vec![1, 2, 3],
    };
    let resp = dispatcher
        .dispatch(
            route_for(Disease::CovidDetection),
            None,
            Some(image),
            ParamVec::new(),
            HeaderVec::new(),
            HeaderVec::new(),
        )
        .expect("handler registered");
    assert_eq!(resp.status, 200);
    let prediction: u8 = serde_json::from_value(resp.body["prediction"].clone()).unwrap();
    assert!(prediction == 0 || prediction == 1);
}

struct FailingBackend;

impl PredictionBackend for FailingBackend {
    fn predict(
        &self,
        _request: BackendRequest<'_>,
    ) -> anyhow::Result<medigate::PredictionResponse> {
        anyhow::bail!("inference service unreachable")
    }
}

#[test]
fn test_backend_failure_maps_to_502() {
    common::setup_may_runtime();
    let backend: Arc<dyn PredictionBackend> = Arc::new(FailingBackend);
    let mut dispatcher = Dispatcher::new();
    unsafe {
        medigate::handlers::register_all(&mut dispatcher, &backend);
    }

    let resp = dispatch_json(
        &dispatcher,
        route_for(Disease::Diabetes),
        Some(serde_json::json!({"age": 45})),
    )
    .expect("handler registered");
    assert_eq!(resp.status, 502);
    assert_eq!(resp.body["error"], "inference service unreachable");
}

struct RecordingMiddleware {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl Middleware for RecordingMiddleware {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        self.events.lock().unwrap().push("before");
        None
    }

    fn after(&self, _req: &HandlerRequest, res: &mut HandlerResponse, _latency: Duration) {
        self.events.lock().unwrap().push("after");
        res.set_header("x-recorded", "1".to_string());
    }
}

#[test]
fn test_middleware_runs_before_and_after() {
    common::setup_may_runtime();
    let events = Arc::new(Mutex::new(Vec::new()));
    let backend: Arc<dyn PredictionBackend> = Arc::new(MockBackend::new());
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_middleware(Arc::new(RecordingMiddleware {
        events: Arc::clone(&events),
    }));
    unsafe {
        medigate::handlers::register_all(&mut dispatcher, &backend);
    }

    let resp = dispatch_json(
        &dispatcher,
        route_for(Disease::Diabetes),
        Some(serde_json::json!({"age": 45})),
    )
    .expect("handler registered");
    assert_eq!(resp.get_header("x-recorded"), Some("1"));
    assert_eq!(*events.lock().unwrap(), vec!["before", "after"]);
}

#[test]
fn test_mock_prediction_is_binary_with_matching_message() {
    common::setup_may_runtime();
    let backend: Arc<dyn PredictionBackend> = Arc::new(MockBackend::new());
    let mut dispatcher = Dispatcher::new();
    unsafe {
        medigate::handlers::register_all(&mut dispatcher, &backend);
    }

    for _ in 0..16 {
        let resp = dispatch_json(
            &dispatcher,
            route_for(Disease::Diabetes),
            Some(serde_json::json!({"age": 45})),
        )
        .expect("handler registered");
        assert_eq!(resp.status, 200);
        let prediction: Outcome = serde_json::from_value(resp.body["prediction"].clone()).unwrap();
        let message = resp.body["message"].as_str().unwrap().to_lowercase();
        match prediction {
            Outcome::Positive => assert!(message.contains("positive")),
            Outcome::Negative => assert!(message.contains("negative")),
        }
    }
}
