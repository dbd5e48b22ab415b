use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Once, RwLock};

use medigate::backend::{MockBackend, PredictionBackend};
use medigate::dispatcher::Dispatcher;
use medigate::handlers;
use medigate::middleware::{CorsMiddleware, MetricsMiddleware, Middleware, TracingMiddleware};
use medigate::registry;
use medigate::router::Router;
use medigate::server::{AppService, HttpServer, ServerHandle};

/// Ensures May coroutines are configured only once per test binary.
static MAY_INIT: Once = Once::new();

pub fn setup_may_runtime() {
    MAY_INIT.call_once(|| {
        may::config().set_stack_size(0x8000);
    });
}

/// Test fixture with automatic setup and teardown using RAII.
///
/// Boots a complete gateway (mock backend, permissive CORS, metrics) on an
/// ephemeral port; `Drop` stops the server when the test completes.
pub struct TestServer {
    pub addr: SocketAddr,
    handle: Option<ServerHandle>,
}

impl TestServer {
    pub fn start() -> Self {
        Self::start_with_backend(Arc::new(MockBackend::new()))
    }

    pub fn start_with_backend(backend: Arc<dyn PredictionBackend>) -> Self {
        setup_may_runtime();

        let router = Arc::new(RwLock::new(Router::new(registry::build_routes())));
        let cors = Arc::new(CorsMiddleware::permissive());
        let metrics = Arc::new(MetricsMiddleware::new());

        let mut dispatcher = Dispatcher::new();
        dispatcher.add_middleware(Arc::new(TracingMiddleware));
        dispatcher.add_middleware(Arc::clone(&metrics) as Arc<dyn Middleware>);
        dispatcher.add_middleware(Arc::clone(&cors) as Arc<dyn Middleware>);
        unsafe {
            handlers::register_all(&mut dispatcher, &backend);
        }

        let mut service = AppService::new(router, Arc::new(RwLock::new(dispatcher)), cors);
        service.set_metrics_middleware(metrics);

        // Bind to a random available port to avoid conflicts between tests.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let handle = HttpServer(service).start(addr).unwrap();
        handle.wait_ready().unwrap();

        TestServer {
            addr,
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

/// A complete, in-range diabetes submission as raw form strings.
pub fn valid_diabetes_fields() -> HashMap<String, String> {
    [
        ("pregnancies", "2"),
        ("glucose", "120"),
        ("bloodPressure", "70"),
        ("skinThickness", "20"),
        ("insulin", "80"),
        ("bmi", "25.5"),
        ("diabetesPedigreeFunction", "0.5"),
        ("age", "45"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// A complete covid-symptoms submission (all "No").
pub fn valid_covid_symptom_fields() -> HashMap<String, String> {
    medigate::registry::spec(medigate::Disease::CovidSymptoms)
        .fields
        .iter()
        .map(|f| (f.name.to_string(), "No".to_string()))
        .collect()
}
