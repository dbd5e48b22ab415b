//! CORS (Cross-Origin Resource Sharing) middleware.
//!
//! The gateway serves browser form submissions from arbitrary origins, so
//! the default configuration is permissive (`*`). Preflight OPTIONS requests
//! are answered at the service layer with [`CorsMiddleware::preflight_headers`],
//! mirroring the requester's `Access-Control-Request-Headers`; dispatched
//! responses get their CORS headers through the [`Middleware`] `after` hook.

use std::time::Duration;

use http::Method;

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::middleware::Middleware;

/// Origin validation strategy.
#[derive(Debug, Clone)]
pub enum OriginValidation {
    /// Exact string matching.
    Exact(Vec<String>),
    /// Wildcard (allow all origins).
    Wildcard,
}

impl OriginValidation {
    fn is_allowed(&self, origin: &str) -> bool {
        match self {
            OriginValidation::Exact(origins) => origins.iter().any(|o| o == origin),
            OriginValidation::Wildcard => true,
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, OriginValidation::Wildcard)
    }
}

/// CORS configuration error.
///
/// Returned by [`CorsMiddlewareBuilder::build`] when the configuration
/// violates CORS specification requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsConfigError {
    /// Wildcard origin (`*`) cannot be used with credentials.
    WildcardWithCredentials,
    /// When credentials are allowed, at least one origin must be specified.
    EmptyOriginsWithCredentials,
}

impl std::fmt::Display for CorsConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorsConfigError::WildcardWithCredentials => {
                write!(
                    f,
                    "CORS configuration error: Cannot use wildcard origin (*) with credentials. \
                    When allow_credentials is true, you must specify exact origins."
                )
            }
            CorsConfigError::EmptyOriginsWithCredentials => {
                write!(
                    f,
                    "CORS configuration error: Cannot use credentials with empty origins list. \
                    When allow_credentials is true, at least one origin must be specified."
                )
            }
        }
    }
}

impl std::error::Error for CorsConfigError {}

#[derive(Debug)]
pub struct CorsMiddleware {
    origin_validation: OriginValidation,
    allowed_methods: Vec<Method>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: Option<u32>,
}

impl CorsMiddleware {
    /// Permissive configuration: any origin, the methods the gateway serves,
    /// preflight results cached for a day. This is what the prediction API
    /// exposes by default.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            origin_validation: OriginValidation::Wildcard,
            allowed_methods: vec![Method::GET, Method::HEAD, Method::POST, Method::OPTIONS],
            allow_credentials: false,
            expose_headers: Vec::new(),
            max_age: Some(86400),
        }
    }

    #[must_use]
    pub fn builder() -> CorsMiddlewareBuilder {
        CorsMiddlewareBuilder::default()
    }

    fn allow_origin_value(&self, request_origin: Option<&str>) -> Option<String> {
        if self.origin_validation.is_wildcard() {
            return Some("*".to_string());
        }
        let origin = request_origin?;
        self.origin_validation
            .is_allowed(origin)
            .then(|| origin.to_string())
    }

    fn methods_value(&self) -> String {
        self.allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Headers attached to every non-preflight response.
    #[must_use]
    pub fn response_headers(&self, request_origin: Option<&str>) -> Vec<(String, String)> {
        let Some(origin) = self.allow_origin_value(request_origin) else {
            return Vec::new();
        };
        let mut headers = vec![
            ("Access-Control-Allow-Origin".to_string(), origin),
            (
                "Access-Control-Allow-Methods".to_string(),
                self.methods_value(),
            ),
        ];
        if let Some(max_age) = self.max_age {
            headers.push(("Access-Control-Max-Age".to_string(), max_age.to_string()));
        }
        if self.allow_credentials {
            headers.push((
                "Access-Control-Allow-Credentials".to_string(),
                "true".to_string(),
            ));
        }
        if !self.expose_headers.is_empty() {
            headers.push((
                "Access-Control-Expose-Headers".to_string(),
                self.expose_headers.join(","),
            ));
        }
        headers
    }

    /// Headers for a preflight (OPTIONS) response.
    ///
    /// `Access-Control-Allow-Headers` mirrors the requester's
    /// `Access-Control-Request-Headers`, empty when absent; preflight
    /// always succeeds.
    #[must_use]
    pub fn preflight_headers(
        &self,
        request_origin: Option<&str>,
        requested_headers: Option<&str>,
    ) -> Vec<(String, String)> {
        let mut headers = self.response_headers(request_origin);
        headers.push((
            "Access-Control-Allow-Headers".to_string(),
            requested_headers.unwrap_or("").to_string(),
        ));
        headers
    }
}

impl Middleware for CorsMiddleware {
    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, _latency: Duration) {
        for (name, value) in self.response_headers(req.get_header("origin")) {
            res.set_header(&name, value);
        }
    }
}

/// Builder for non-permissive CORS configurations.
#[derive(Default)]
pub struct CorsMiddlewareBuilder {
    origins: Vec<String>,
    methods: Vec<Method>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: Option<u32>,
}

impl CorsMiddlewareBuilder {
    #[must_use]
    pub fn allowed_origins(mut self, origins: &[&str]) -> Self {
        self.origins = origins.iter().map(|o| o.to_string()).collect();
        self
    }

    #[must_use]
    pub fn allowed_methods(mut self, methods: &[Method]) -> Self {
        self.methods = methods.to_vec();
        self
    }

    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    #[must_use]
    pub fn expose_headers(mut self, headers: &[&str]) -> Self {
        self.expose_headers = headers.iter().map(|h| h.to_string()).collect();
        self
    }

    #[must_use]
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Build the middleware, rejecting configurations the CORS specification
    /// forbids.
    pub fn build(self) -> Result<CorsMiddleware, CorsConfigError> {
        let origin_validation = if self.origins.iter().any(|o| o == "*") {
            OriginValidation::Wildcard
        } else {
            OriginValidation::Exact(self.origins)
        };

        if self.allow_credentials {
            if origin_validation.is_wildcard() {
                return Err(CorsConfigError::WildcardWithCredentials);
            }
            if matches!(&origin_validation, OriginValidation::Exact(o) if o.is_empty()) {
                return Err(CorsConfigError::EmptyOriginsWithCredentials);
            }
        }

        let methods = if self.methods.is_empty() {
            vec![Method::GET, Method::HEAD, Method::POST, Method::OPTIONS]
        } else {
            self.methods
        };

        Ok(CorsMiddleware {
            origin_validation,
            allowed_methods: methods,
            allow_credentials: self.allow_credentials,
            expose_headers: self.expose_headers,
            max_age: self.max_age,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_headers() {
        let cors = CorsMiddleware::permissive();
        let headers = cors.response_headers(None);
        assert!(headers
            .iter()
            .any(|(k, v)| k == "Access-Control-Allow-Origin" && v == "*"));
        assert!(headers
            .iter()
            .any(|(k, v)| k == "Access-Control-Allow-Methods" && v.contains("POST")));
    }

    #[test]
    fn test_preflight_mirrors_requested_headers() {
        let cors = CorsMiddleware::permissive();
        let headers = cors.preflight_headers(None, Some("content-type, x-request-id"));
        assert!(headers
            .iter()
            .any(|(k, v)| k == "Access-Control-Allow-Headers"
                && v == "content-type, x-request-id"));
    }

    #[test]
    fn test_exact_origin_rejects_unknown() {
        let cors = CorsMiddleware::builder()
            .allowed_origins(&["https://example.com"])
            .build()
            .unwrap();
        assert!(cors
            .response_headers(Some("https://evil.example"))
            .is_empty());
        assert!(!cors
            .response_headers(Some("https://example.com"))
            .is_empty());
    }

    #[test]
    fn test_wildcard_with_credentials_rejected() {
        let err = CorsMiddleware::builder()
            .allowed_origins(&["*"])
            .allow_credentials(true)
            .build()
            .unwrap_err();
        assert_eq!(err, CorsConfigError::WildcardWithCredentials);
    }
}
