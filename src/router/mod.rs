//! # Router Module
//!
//! Path matching and route resolution. The routing table is derived from the
//! disease registry at startup: seven fixed `POST /api/predict/<slug>`
//! endpoints with no path parameters, so resolution is an exact
//! `(method, path)` lookup rather than pattern matching.
//!
//! ```rust
//! use medigate::{registry, router::Router};
//! use http::Method;
//!
//! let router = Router::new(registry::build_routes());
//! let m = router.route(Method::POST, "/api/predict/diabetes").unwrap();
//! assert_eq!(m.handler_name, "predict_diabetes");
//! ```

mod core;

pub use core::{RouteMatch, Router};
