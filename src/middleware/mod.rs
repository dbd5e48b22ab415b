mod core;
mod cors;
mod metrics;
mod tracing;

pub use core::Middleware;
pub use cors::{CorsConfigError, CorsMiddleware, CorsMiddlewareBuilder, OriginValidation};
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;
