//! Dispatcher core module - hot path for request dispatch.

use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::router::RouteMatch;
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Maximum inline query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Names use `Arc<str>` so repeated keys clone with an atomic increment
/// rather than a string copy; values are per-request data and stay `String`.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Maximum inline headers/cookies before heap allocation.
/// Most requests have ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header/cookie storage for the hot path.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Generate a unique request ID for tracing (ULID string).
#[must_use]
pub fn generate_request_id() -> String {
    RequestId::new().to_string()
}

/// Binary image payload extracted from a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Original filename from the Content-Disposition header, if any.
    pub file_name: Option<String>,
    /// Part Content-Type as sent by the client, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Request data passed to a handler coroutine.
///
/// Carries the extracted HTTP request information plus a reply channel for
/// sending the response back to the dispatcher. Exactly one of `body`
/// (structured routes) or `image` (binary-image routes) is populated by the
/// time a request reaches a handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation.
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    /// Name of the handler that should process this request.
    pub handler_name: String,
    /// Query string parameters (stack-allocated for ≤8 params).
    pub query_params: ParamVec,
    /// HTTP headers (stack-allocated for ≤16 headers).
    pub headers: HeaderVec,
    /// Cookies parsed from the Cookie header.
    pub cookies: HeaderVec,
    /// Request body parsed as JSON (structured routes).
    pub body: Option<Value>,
    /// Uploaded image (binary-image routes).
    pub image: Option<ImagePayload>,
    /// Channel for sending the response back to the dispatcher.
    pub reply_tx: mpsc::Sender<HandlerResponse>,
}

impl HandlerRequest {
    /// Get a query parameter by name.
    ///
    /// Uses "last write wins" semantics for duplicate names
    /// (e.g. `?limit=10&limit=20` returns the last occurrence).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a cookie by name.
    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert headers to a HashMap for compatibility.
    /// Note: this allocates - use get_header() in hot paths.
    #[must_use]
    pub fn headers_map(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Response data sent back from a handler coroutine.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 400, 502, ...).
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers).
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body as JSON.
    pub body: Value,
}

impl HandlerResponse {
    /// Create a new response with the given status, headers, and body.
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with default headers.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Get a header by name.
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Type alias for a channel sender that dispatches requests to a handler.
pub type HandlerSender = mpsc::Sender<HandlerRequest>;

/// Dispatcher that routes requests to registered handler coroutines.
///
/// Maintains a registry of handler names to their corresponding channel
/// senders, and manages middleware that processes requests/responses.
#[derive(Clone, Default)]
pub struct Dispatcher {
    /// Map of handler names to their channel senders.
    pub handlers: HashMap<String, HandlerSender>,
    /// Ordered list of middleware to apply to requests/responses.
    pub middlewares: Vec<Arc<dyn Middleware>>,
}

impl Dispatcher {
    /// Create a new empty dispatcher.
    ///
    /// Handlers must be registered using `register_handler`,
    /// `register_typed`, or `add_handler`.
    #[must_use]
    pub fn new() -> Self {
        Dispatcher {
            handlers: HashMap::new(),
            middlewares: Vec::new(),
        }
    }

    /// Add a handler sender under the given name.
    ///
    /// If a handler with the same name already exists it is replaced; the
    /// old sender is dropped, which closes its channel and causes the old
    /// handler coroutine to exit when it next receives.
    pub fn add_handler(&mut self, name: &str, sender: HandlerSender) {
        if let Some(old_sender) = self.handlers.remove(name) {
            drop(old_sender);
            warn!(
                handler_name = %name,
                total_handlers = self.handlers.len(),
                "Replaced existing handler - old coroutine will exit"
            );
        }

        info!(
            handler_name = %name,
            total_handlers = self.handlers.len() + 1,
            "Handler registered successfully"
        );

        self.handlers.insert(name.to_string(), sender);
    }

    /// Add middleware to the processing pipeline.
    ///
    /// Middleware executes in registration order: `before` hooks may
    /// short-circuit with an early response, `after` hooks see every
    /// response.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// Register a handler function that processes requests with the given
    /// name.
    ///
    /// Spawns a coroutine that drains the handler's channel. The handler is
    /// wrapped with panic recovery so one failing handler cannot crash the
    /// server.
    ///
    /// # Safety
    ///
    /// Calls `may::coroutine::Builder::spawn()`, which is unsafe in the
    /// `may` runtime. The caller must ensure the May runtime is initialized
    /// and that the handler sends a response through the reply channel for
    /// every request.
    pub unsafe fn register_handler<F>(&mut self, name: &str, handler_fn: F)
    where
        F: Fn(HandlerRequest) + Send + 'static + Clone,
    {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let name = name.to_string();
        let handler_name_for_logging = name.clone();

        let stack_size = crate::runtime_config::RuntimeConfig::from_env().stack_size;

        // SAFETY: spawn() is unsafe because of the coroutine runtime's
        // requirements, not this function's logic. Handlers are Send +
        // 'static and report errors via the reply channel, not panics.
        let spawn_result = unsafe {
            coroutine::Builder::new()
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(
                        handler_name = %handler_name_for_logging,
                        stack_size = stack_size,
                        "Handler coroutine start"
                    );

                    for req in rx.iter() {
                        let reply_tx = req.reply_tx.clone();
                        let handler_name = req.handler_name.clone();
                        let request_id = req.request_id;

                        info!(
                            request_id = %request_id,
                            handler_name = %handler_name,
                            "Handler execution start"
                        );

                        let execution_start = Instant::now();

                        if let Err(panic) =
                            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                                handler_fn(req);
                            }))
                        {
                            let panic_message = format!("{panic:?}");
                            error!(
                                request_id = %request_id,
                                handler_name = %handler_name,
                                panic_message = %panic_message,
                                "Handler panicked - CRITICAL"
                            );

                            let error_response = HandlerResponse::error(
                                500,
                                &format!("Handler panicked: {}", panic_message),
                            );
                            let _ = reply_tx.send(error_response);
                        } else {
                            let execution_time_ms = execution_start.elapsed().as_millis() as u64;
                            info!(
                                request_id = %request_id,
                                handler_name = %handler_name,
                                execution_time_ms = execution_time_ms,
                                "Handler execution complete"
                            );
                        }
                    }
                })
        };

        if let Err(e) = spawn_result {
            error!(
                handler_name = %name,
                error = %e,
                stack_size = stack_size,
                "Failed to spawn handler coroutine - CRITICAL"
            );
            return;
        }

        self.handlers.insert(name, tx);
    }

    /// Dispatch a request to the appropriate handler.
    ///
    /// Sends the request to the handler's coroutine via channel and waits
    /// for the response. Returns `None` if no handler is registered for the
    /// route.
    #[must_use]
    pub fn dispatch(
        &self,
        route_match: RouteMatch,
        body: Option<Value>,
        image: Option<ImagePayload>,
        query_params: ParamVec,
        headers: HeaderVec,
        cookies: HeaderVec,
    ) -> Option<HandlerResponse> {
        let request_id = generate_request_id();
        self.dispatch_with_request_id(
            route_match,
            body,
            image,
            query_params,
            headers,
            cookies,
            request_id,
        )
    }

    /// Dispatch a request with a pre-determined request_id (for correlation).
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch_with_request_id(
        &self,
        route_match: RouteMatch,
        body: Option<Value>,
        image: Option<ImagePayload>,
        query_params: ParamVec,
        headers: HeaderVec,
        cookies: HeaderVec,
        request_id: String,
    ) -> Option<HandlerResponse> {
        let (reply_tx, reply_rx) = mpsc::channel();

        debug!(
            handler_name = %route_match.handler_name,
            available_handlers = self.handlers.len(),
            "Handler lookup"
        );

        let tx = match self.handlers.get(&route_match.handler_name) {
            Some(tx) => tx,
            None => {
                let available_handlers: Vec<&String> = self.handlers.keys().collect();
                error!(
                    handler_name = %route_match.handler_name,
                    available_handlers = ?available_handlers,
                    "Handler not found - CRITICAL"
                );
                return None;
            }
        };

        let request = HandlerRequest {
            request_id: request_id.parse().unwrap_or_else(|_| RequestId::new()),
            method: route_match.route.method.clone(),
            path: route_match.route.path.clone(),
            handler_name: route_match.handler_name,
            query_params,
            headers,
            cookies,
            body,
            image,
            reply_tx,
        };

        let middleware_count = self.middlewares.len();
        debug!(
            request_id = %request_id,
            middleware_count = middleware_count,
            "Middleware before execution"
        );

        let mut early_resp: Option<HandlerResponse> = None;
        for (idx, mw) in self.middlewares.iter().enumerate() {
            if early_resp.is_none() {
                early_resp = mw.before(&request);
                if early_resp.is_some() {
                    debug!(
                        request_id = %request_id,
                        middleware_idx = idx,
                        "Middleware returned early response"
                    );
                }
            } else {
                mw.before(&request);
            }
        }

        let (mut resp, latency) = if let Some(r) = early_resp {
            (r, Duration::from_millis(0))
        } else {
            info!(
                request_id = %request_id,
                handler_name = %request.handler_name,
                method = %request.method,
                path = %request.path,
                "Request dispatched to handler"
            );

            let start = Instant::now();

            if let Err(e) = tx.send(request.clone()) {
                error!(
                    request_id = %request_id,
                    handler_name = %request.handler_name,
                    error = %e,
                    "Failed to send request to handler"
                );
                return None;
            }

            debug!(
                request_id = %request_id,
                handler_name = %request.handler_name,
                "Waiting for handler response"
            );

            let r = match reply_rx.recv() {
                Ok(response) => {
                    let elapsed = start.elapsed();
                    info!(
                        request_id = %request_id,
                        handler_name = %request.handler_name,
                        latency_ms = elapsed.as_millis() as u64,
                        status = response.status,
                        "Handler response received"
                    );
                    response
                }
                Err(e) => {
                    let elapsed = start.elapsed();
                    error!(
                        request_id = %request_id,
                        handler_name = %request.handler_name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %e,
                        "Handler channel closed - handler may have crashed"
                    );

                    // Return 503 instead of None so the connection is not
                    // dropped and the failure is visible to the client.
                    return Some(HandlerResponse::error(
                        503,
                        &format!(
                        "Handler '{}' is not responding - possible crash or resource exhaustion",
                        request.handler_name
                    ),
                    ));
                }
            };
            (r, start.elapsed())
        };

        debug!(
            request_id = %request_id,
            middleware_count = middleware_count,
            response_status = resp.status,
            latency_ms = latency.as_millis() as u64,
            "Middleware after execution"
        );

        for mw in &self.middlewares {
            mw.after(&request, &mut resp, latency);
        }

        Some(resp)
    }
}
