use may_minihttp::Response;
use serde_json::Value;

use crate::dispatcher::HeaderVec;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Write arbitrary (name, value) headers.
///
/// may_minihttp takes `&'static str` headers, so dynamic values are leaked;
/// all call sites write a bounded handful of short headers per request.
pub fn write_extra_headers(res: &mut Response, headers: &[(String, String)]) {
    for (name, value) in headers {
        let header = format!("{name}: {value}").into_boxed_str();
        res.header(&*Box::leak(header));
    }
}

/// Write a handler response: status, headers, and a JSON (or plain text)
/// body.
pub fn write_handler_response(res: &mut Response, status: u16, body: Value, headers: &HeaderVec) {
    let reason = status_reason(status);
    res.status_code(status as usize, reason);
    let mut has_content_type = false;
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("content-type") {
            has_content_type = true;
        }
        let header = format!("{name}: {value}").into_boxed_str();
        res.header(&*Box::leak(header));
    }
    match body {
        Value::String(s) => {
            if !has_content_type {
                res.header("Content-Type: text/plain");
            }
            res.body_vec(s.into_bytes());
        }
        other => {
            if !has_content_type {
                res.header("Content-Type: application/json");
            }
            res.body_vec(other.to_string().into_bytes());
        }
    }
}

/// Write a JSON error body with optional extra headers (CORS).
pub fn write_json_error(res: &mut Response, status: u16, body: Value, extra: &[(String, String)]) {
    let reason = status_reason(status);
    res.status_code(status as usize, reason);
    res.header("Content-Type: application/json");
    write_extra_headers(res, extra);
    res.body_vec(body.to_string().into_bytes());
}

/// Write a plain-text error body (the unmatched-route 404 contract).
pub fn write_text_error(
    res: &mut Response,
    status: u16,
    message: &'static str,
    extra: &[(String, String)],
) {
    let reason = status_reason(status);
    res.status_code(status as usize, reason);
    res.header("Content-Type: text/plain");
    write_extra_headers(res, extra);
    res.body_vec(message.as_bytes().to_vec());
}
