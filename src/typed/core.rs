use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse, HeaderVec, ParamVec};
use anyhow::Result;
use http::Method;
use may::sync::mpsc;
use serde::Serialize;
use std::convert::TryFrom;

/// Trait implemented by typed coroutine handlers.
///
/// A handler receives a [`TypedHandlerRequest`] and returns a typed
/// response. Conversion failures become 400s, handler errors become 502s,
/// and panics become 500s; the handler itself only deals in its own types.
pub trait Handler: Send + 'static {
    /// The typed request type (converted from `HandlerRequest`).
    type Request: TryFrom<HandlerRequest, Error = anyhow::Error> + Send + 'static;
    /// The typed response type (serialized to JSON).
    type Response: Serialize + Send + 'static;

    /// Handle a typed request.
    ///
    /// # Errors
    ///
    /// An error here means the handler's collaborator failed (for prediction
    /// handlers, the backend); it is reported to the client as 502.
    fn handle(&self, req: TypedHandlerRequest<Self::Request>) -> Result<Self::Response>;
}

/// Typed request data passed to a [`Handler`].
///
/// Carries the HTTP metadata along with the request data already validated
/// and converted from the raw `HandlerRequest`.
#[derive(Debug, Clone)]
pub struct TypedHandlerRequest<T> {
    pub method: Method,
    pub path: String,
    pub handler_name: String,
    pub query_params: ParamVec,
    /// Typed request data (validated and converted).
    pub data: T,
}

/// Spawn a typed handler coroutine and return a sender to communicate with
/// it.
///
/// # Safety
///
/// Spawns a `may` coroutine; the caller must ensure the May runtime is
/// initialized and that the returned sender is eventually registered so the
/// coroutine is reachable.
pub unsafe fn spawn_typed<H>(handler: H) -> mpsc::Sender<HandlerRequest>
where
    H: Handler + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<HandlerRequest>();
    let stack_size = crate::runtime_config::RuntimeConfig::from_env().stack_size;

    // SAFETY: same contract as Dispatcher::register_handler - the unsafety
    // belongs to the coroutine runtime, not this function's logic.
    let spawn_result: std::io::Result<_> = unsafe {
        may::coroutine::Builder::new()
            .stack_size(stack_size)
            .spawn(move || {
                let handler = handler;
                for req in rx.iter() {
                    let reply_tx = req.reply_tx.clone();
                    let handler_name = req.handler_name.clone();

                    // catch_unwind keeps a panicking handler from killing the
                    // coroutine; the client gets a 500 instead.
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let reply_tx_inner = reply_tx.clone();

                        let data = match H::Request::try_from(req.clone()) {
                            Ok(v) => v,
                            Err(err) => {
                                let _ = reply_tx_inner.send(HandlerResponse::json(
                                    400,
                                    serde_json::json!({
                                        "error": "Invalid request data",
                                        "message": err.to_string()
                                    }),
                                ));
                                return;
                            }
                        };

                        let typed_req = TypedHandlerRequest {
                            method: req.method,
                            path: req.path,
                            handler_name: req.handler_name,
                            query_params: req.query_params,
                            data,
                        };

                        let response = match handler.handle(typed_req) {
                            Ok(body) => HandlerResponse::new(
                                200,
                                HeaderVec::new(),
                                serde_json::to_value(body).unwrap_or_else(|_| {
                                    serde_json::json!({"error": "Failed to serialize response"})
                                }),
                            ),
                            Err(err) => HandlerResponse::error(502, &err.to_string()),
                        };
                        let _ = reply_tx_inner.send(response);
                    }));

                    if let Err(panic) = result {
                        let _ = reply_tx.send(HandlerResponse::json(
                            500,
                            serde_json::json!({
                                "error": "Handler panicked",
                                "details": format!("{:?}", panic)
                            }),
                        ));
                        tracing::error!(
                            handler_name = %handler_name,
                            "typed handler panicked"
                        );
                    }
                }
            })
    };
    if let Err(e) = spawn_result {
        tracing::error!(error = %e, stack_size = stack_size, "Failed to spawn typed handler coroutine - CRITICAL");
    }

    tx
}

impl Dispatcher {
    /// Register a typed handler that converts [`HandlerRequest`] into the
    /// handler's associated request type using `TryFrom`.
    ///
    /// # Safety
    ///
    /// Internally calls [`spawn_typed`]; the caller must ensure the May
    /// coroutine runtime is properly initialized.
    pub unsafe fn register_typed<H>(&mut self, name: &str, handler: H)
    where
        H: Handler + Send + 'static,
    {
        let tx = spawn_typed(handler);
        self.add_handler(name, tx);
    }
}
