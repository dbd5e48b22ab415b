//! # medigate
//!
//! **medigate** is a disease-prediction edge gateway for Rust, driven
//! entirely by a static disease registry and powered by the `may` coroutine
//! runtime.
//!
//! ## Overview
//!
//! The gateway exposes seven prediction endpoints
//! (`POST /api/predict/<disease>`), validates submissions against
//! per-disease field schemas, and hands validated requests to a pluggable
//! prediction backend - a mock that synthesizes results until a real
//! inference service is wired in, or a forwarder that relays to one. The
//! crate also ships the client half of the boundary: a blocking dispatcher
//! that validates raw form input before issuing exactly one outbound
//! request.
//!
//! ## Architecture
//!
//! - **[`registry`]** - static disease catalog: field schemas, submission
//!   modes, display metadata, route metadata
//! - **[`validator`]** - input coercion and JSON-Schema validation with
//!   field-level violations
//! - **[`router`]** - method+path matching over the registry routes
//! - **[`dispatcher`]** - coroutine-based request handler dispatch
//! - **[`typed`]** - type-safe request/response handler traits
//! - **[`handlers`]** - the prediction controllers registered per route
//! - **[`backend`]** - the `PredictionBackend` capability (mock / forward)
//! - **[`server`]** - HTTP server built on `may_minihttp`
//! - **[`middleware`]** - pluggable middleware (CORS, metrics, tracing)
//! - **[`client`]** - blocking prediction client (the request dispatcher)
//! - **[`prediction`]** - the wire contract every backend must preserve
//!
//! ## Request Handling Flow
//!
//! 1. `AppService` parses the HTTP request (JSON or multipart image body)
//! 2. OPTIONS requests short-circuit to a permissive CORS preflight
//! 3. The router matches method+path; unmatched requests get a plain-text
//!    404
//! 4. The body is validated against the route's registry schema (400 on
//!    violation)
//! 5. The dispatcher sends the request to the route's handler coroutine
//! 6. The handler calls the configured `PredictionBackend` and replies with
//!    `{ prediction: 0|1, message, details? }`
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::{Arc, RwLock};
//! use medigate::backend::{MockBackend, PredictionBackend};
//! use medigate::dispatcher::Dispatcher;
//! use medigate::middleware::CorsMiddleware;
//! use medigate::router::Router;
//! use medigate::server::{AppService, HttpServer};
//!
//! let router = Arc::new(RwLock::new(Router::new(medigate::registry::build_routes())));
//! let backend: Arc<dyn PredictionBackend> = Arc::new(MockBackend::new());
//! let mut dispatcher = Dispatcher::new();
//! unsafe { medigate::handlers::register_all(&mut dispatcher, &backend) };
//! let service = AppService::new(
//!     router,
//!     Arc::new(RwLock::new(dispatcher)),
//!     Arc::new(CorsMiddleware::permissive()),
//! );
//! let handle = HttpServer(service).start("0.0.0.0:8080").unwrap();
//! handle.join().unwrap();
//! ```
//!
//! ## Runtime Considerations
//!
//! medigate uses the `may` coroutine runtime, not tokio or async-std:
//! handlers run in coroutines, stack size is configurable via the
//! `MEDIGATE_STACK_SIZE` environment variable, and blocking operations
//! should be kept short.

pub mod backend;
pub mod client;
pub mod dispatcher;
pub mod handlers;
pub mod ids;
pub mod middleware;
pub mod prediction;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod typed;
pub mod validator;

pub use prediction::{Outcome, PredictionDetails, PredictionResponse};
pub use registry::{Disease, DiseaseSpec, RouteMeta, SubmissionMode};
pub use validator::FieldViolation;
