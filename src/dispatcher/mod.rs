//! # Dispatcher Module
//!
//! Coroutine-based request handler dispatch. The dispatcher manages the
//! lifecycle of handler coroutines and routes matched requests to them over
//! MPSC channels.
//!
//! ## Architecture
//!
//! - Each handler runs in its own `may` coroutine, spawned at startup
//! - Requests are sent to handlers via channels; responses come back over a
//!   per-request reply channel
//! - Handlers share no mutable state, so no locking is needed
//! - Handler panics are caught and converted to 500 responses
//! - Stack size is configurable via the `MEDIGATE_STACK_SIZE` environment
//!   variable
//!
//! ## Request Flow
//!
//! 1. Router matches the incoming request to route metadata
//! 2. Dispatcher looks up the handler by name
//! 3. Middleware `before` hooks run (and may short-circuit)
//! 4. The request is sent to the handler coroutine
//! 5. The handler's response flows back through middleware `after` hooks

mod core;

pub use core::{
    generate_request_id, Dispatcher, HandlerRequest, HandlerResponse, HandlerSender, HeaderVec,
    ImagePayload, ParamVec, MAX_INLINE_HEADERS, MAX_INLINE_PARAMS,
};
