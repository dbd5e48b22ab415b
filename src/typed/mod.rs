//! # Typed Module
//!
//! Type-safe handler traits. A typed handler declares its request and
//! response types; the conversion from the raw [`HandlerRequest`] happens
//! via `TryFrom` before the handler runs, so handler bodies never touch raw
//! JSON. Prediction controllers are typed handlers parameterized by a
//! registry spec and a backend.
//!
//! [`HandlerRequest`]: crate::dispatcher::HandlerRequest

mod core;

pub use core::{spawn_typed, Handler, TypedHandlerRequest};
