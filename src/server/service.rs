use super::request::{parse_request, ParsedRequest};
use super::response::{
    write_extra_headers, write_handler_response, write_json_error, write_text_error,
};
use crate::dispatcher::{Dispatcher, HeaderVec, ParamVec};
use crate::ids::RequestId;
use crate::middleware::{CorsMiddleware, MetricsMiddleware};
use crate::registry::{self, SubmissionMode};
use crate::router::Router;
use crate::validator;
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, RwLock};

/// The gateway's HTTP service: preflight handling, infrastructure
/// endpoints, routing, server-side validation, and dispatch.
///
/// Processes each incoming request independently; the only shared state is
/// the routing table and handler registry behind `Arc<RwLock<…>>`, which are
/// written only during startup.
pub struct AppService {
    pub router: Arc<RwLock<Router>>,
    pub dispatcher: Arc<RwLock<Dispatcher>>,
    pub cors: Arc<CorsMiddleware>,
    pub metrics: Option<Arc<MetricsMiddleware>>,
}

impl Clone for AppService {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
            dispatcher: Arc::clone(&self.dispatcher),
            cors: Arc::clone(&self.cors),
            metrics: self.metrics.clone(),
        }
    }
}

impl AppService {
    #[must_use]
    pub fn new(
        router: Arc<RwLock<Router>>,
        dispatcher: Arc<RwLock<Dispatcher>>,
        cors: Arc<CorsMiddleware>,
    ) -> Self {
        Self {
            router,
            dispatcher,
            cors,
            metrics: None,
        }
    }

    pub fn set_metrics_middleware(&mut self, metrics: Arc<MetricsMiddleware>) {
        self.metrics = Some(metrics);
    }
}

/// Basic health check endpoint returning `{ "status": "ok" }`.
pub fn health_endpoint(res: &mut Response) -> io::Result<()> {
    write_handler_response(
        res,
        200,
        serde_json::json!({ "status": "ok" }),
        &HeaderVec::new(),
    );
    Ok(())
}

/// Metrics endpoint returning Prometheus text format statistics.
pub fn metrics_endpoint(res: &mut Response, metrics: &MetricsMiddleware) -> io::Result<()> {
    let body = format!(
        "# HELP medigate_requests_total Total number of handled requests\n\
         # TYPE medigate_requests_total counter\n\
         medigate_requests_total {}\n\
         # HELP medigate_request_latency_seconds Average request latency in seconds\n\
         # TYPE medigate_request_latency_seconds gauge\n\
         medigate_request_latency_seconds {}\n\
         # HELP medigate_top_level_requests_total Requests served outside the dispatcher\n\
         # TYPE medigate_top_level_requests_total counter\n\
         medigate_top_level_requests_total {}\n",
        metrics.request_count(),
        metrics.average_latency().as_secs_f64(),
        metrics.top_level_request_count(),
    );
    write_handler_response(res, 200, serde_json::Value::String(body), &HeaderVec::new());
    Ok(())
}

fn to_header_vec(map: &HashMap<String, String>) -> HeaderVec {
    map.iter()
        .map(|(k, v)| (Arc::from(k.as_str()), v.clone()))
        .collect()
}

fn to_param_vec(map: &HashMap<String, String>) -> ParamVec {
    map.iter()
        .map(|(k, v)| (Arc::from(k.as_str()), v.clone()))
        .collect()
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let ParsedRequest {
            method,
            path,
            headers,
            cookies,
            query_params,
            body,
            body_len,
            image,
        } = parse_request(req);

        let origin = headers.get("origin").map(String::as_str);

        // CORS preflight always succeeds, for any path, mirroring whatever
        // headers the requester asked for.
        if method == "OPTIONS" {
            if let Some(metrics) = &self.metrics {
                metrics.inc_top_level_request();
            }
            let preflight = self.cors.preflight_headers(
                origin,
                headers
                    .get("access-control-request-headers")
                    .map(String::as_str),
            );
            res.status_code(204, "No Content");
            write_extra_headers(res, &preflight);
            return Ok(());
        }

        if method == "GET" && path == "/health" {
            if let Some(metrics) = &self.metrics {
                metrics.inc_top_level_request();
            }
            return health_endpoint(res);
        }
        if method == "GET" && path == "/metrics" {
            if let Some(metrics) = &self.metrics {
                metrics.inc_top_level_request();
                return metrics_endpoint(res, metrics);
            }
            let cors_headers = self.cors.response_headers(origin);
            write_text_error(res, 404, "Not Found", &cors_headers);
            return Ok(());
        }

        let cors_headers = self.cors.response_headers(origin);

        let parsed_method = match method.parse::<Method>() {
            Ok(m) => m,
            Err(_) => {
                write_text_error(res, 404, "Not Found", &cors_headers);
                return Ok(());
            }
        };

        let route_opt = {
            let router = self.router.read().unwrap();
            router.route(parsed_method, &path)
        };
        let Some(route_match) = route_opt else {
            // Unmatched routes return plain text, not JSON.
            write_text_error(res, 404, "Not Found", &cors_headers);
            return Ok(());
        };

        match route_match.route.mode {
            SubmissionMode::Structured => {
                if route_match.route.request_body_required && body_len == 0 {
                    write_json_error(res, 400, json!({"error": "Request body required"}), &cors_headers);
                    return Ok(());
                }
                let Some(body_val) = &body else {
                    write_json_error(res, 400, json!({"error": "Invalid JSON body"}), &cors_headers);
                    return Ok(());
                };
                let spec = registry::spec(route_match.route.disease);
                let violations = validator::validate_payload(&spec, body_val);
                if !violations.is_empty() {
                    let details: Vec<String> =
                        violations.iter().map(ToString::to_string).collect();
                    write_json_error(
                        res,
                        400,
                        json!({"error": "Request validation failed", "details": details}),
                        &cors_headers,
                    );
                    return Ok(());
                }
            }
            SubmissionMode::BinaryImage => {
                if image.is_none() {
                    write_json_error(
                        res,
                        400,
                        json!({"error": "Multipart image upload required"}),
                        &cors_headers,
                    );
                    return Ok(());
                }
            }
        }

        let request_id =
            RequestId::from_header_or_new(headers.get("x-request-id").map(String::as_str))
                .to_string();

        let handler_response = {
            let dispatcher = self.dispatcher.read().unwrap();
            dispatcher.dispatch_with_request_id(
                route_match,
                body,
                image,
                to_param_vec(&query_params),
                to_header_vec(&headers),
                to_header_vec(&cookies),
                request_id,
            )
        };
        match handler_response {
            Some(hr) => write_handler_response(res, hr.status, hr.body, &hr.headers),
            None => {
                write_json_error(
                    res,
                    500,
                    serde_json::json!({
                        "error": "Handler failed or not registered",
                        "method": method,
                        "path": path
                    }),
                    &cors_headers,
                );
            }
        }
        Ok(())
    }
}
