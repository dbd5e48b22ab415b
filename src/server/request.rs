use crate::dispatcher::ImagePayload;
use crate::registry::IMAGE_FIELD;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info};

use may_minihttp::Request;

/// Parsed HTTP request data used by `AppService`.
///
/// Contains everything extracted from the raw HTTP request: headers,
/// cookies, query parameters, and the body in whichever shape it arrived
/// (JSON value or multipart image part).
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request path without the query string
    pub path: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Parsed cookies from the Cookie header
    pub cookies: HashMap<String, String>,
    /// Parsed query string parameters
    pub query_params: HashMap<String, String>,
    /// Parsed JSON body (when the body is valid JSON)
    pub body: Option<serde_json::Value>,
    /// Raw body length in bytes; distinguishes "no body" from "unparseable"
    pub body_len: usize,
    /// Image part extracted from a multipart/form-data body
    pub image: Option<ImagePayload>,
}

/// Extract cookies from the lowercase header map.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse query string parameters from a URL path.
///
/// Extracts everything after the `?` and URL-decodes names and values.
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    if let Some(pos) = path.find('?') {
        let query_str = &path[pos + 1..];
        url::form_urlencoded::parse(query_str.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    } else {
        HashMap::new()
    }
}

/// Extract the boundary parameter from a multipart/form-data content type.
pub(crate) fn multipart_boundary(content_type: &str) -> Option<String> {
    if !content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return None;
    }
    content_type.split(';').find_map(|param| {
        let mut kv = param.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some(key), Some(value)) if key.eq_ignore_ascii_case("boundary") => {
                Some(value.trim_matches('"').to_string())
            }
            _ => None,
        }
    })
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct MultipartPart {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn parse_part(segment: &[u8]) -> Option<MultipartPart> {
    let header_end = find(segment, b"\r\n\r\n", 0)?;
    let mut data = &segment[header_end + 4..];
    // The CRLF before the next delimiter belongs to the encoding, not the data.
    if data.ends_with(b"\r\n") {
        data = &data[..data.len() - 2];
    }

    let mut name = None;
    let mut file_name = None;
    let mut content_type = None;
    for line in String::from_utf8_lossy(&segment[..header_end]).split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        if header.eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';') {
                let mut kv = param.trim().splitn(2, '=');
                match (kv.next(), kv.next()) {
                    (Some("name"), Some(v)) => name = Some(v.trim_matches('"').to_string()),
                    (Some("filename"), Some(v)) => {
                        file_name = Some(v.trim_matches('"').to_string())
                    }
                    _ => {}
                }
            }
        } else if header.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    Some(MultipartPart {
        name,
        file_name,
        content_type,
        data: data.to_vec(),
    })
}

/// Split a multipart/form-data body into its parts.
///
/// Scoped to the single-file shape the gateway accepts: no nested
/// multiparts, no content-transfer-encoding handling.
pub(crate) fn parse_multipart(body: &[u8], boundary: &str) -> Vec<MultipartPart> {
    let delimiter = format!("--{boundary}");
    let delim = delimiter.as_bytes();
    let mut parts = Vec::new();

    let Some(first) = find(body, delim, 0) else {
        return parts;
    };
    let mut pos = first + delim.len();
    loop {
        if body[pos..].starts_with(b"--") {
            break;
        }
        if body[pos..].starts_with(b"\r\n") {
            pos += 2;
        }
        let Some(end) = find(body, delim, pos) else {
            break;
        };
        if let Some(part) = parse_part(&body[pos..end]) {
            parts.push(part);
        }
        pos = end + delim.len();
        if pos >= body.len() {
            break;
        }
    }
    parts
}

/// Parse an incoming HTTP request into a [`ParsedRequest`].
///
/// The body is read once as bytes, then interpreted by content type:
/// `multipart/form-data` bodies yield the `image` part, anything else is
/// attempted as JSON.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    debug!(
        header_count = headers.len(),
        header_names = ?headers.keys().take(20).collect::<Vec<_>>(),
        "Headers extracted"
    );

    let cookies = parse_cookies(&headers);
    let query_params = parse_query_params(&raw_path);

    let mut body_bytes = Vec::new();
    let _ = req.body().read_to_end(&mut body_bytes);
    let body_len = body_bytes.len();

    let content_type = headers
        .get("content-type")
        .map(String::as_str)
        .unwrap_or("");

    let mut body = None;
    let mut image = None;
    if body_len > 0 {
        info!(
            content_length = body_len,
            content_type = %content_type,
            "Request body read"
        );
        if let Some(boundary) = multipart_boundary(content_type) {
            let mut parts = parse_multipart(&body_bytes, &boundary);
            let image_idx = parts
                .iter()
                .position(|p| p.name.as_deref() == Some(IMAGE_FIELD));
            if let Some(idx) = image_idx {
                let part = parts.swap_remove(idx);
                debug!(
                    file_name = ?part.file_name,
                    part_content_type = ?part.content_type,
                    part_bytes = part.data.len(),
                    "Multipart image part extracted"
                );
                image = Some(ImagePayload {
                    file_name: part.file_name,
                    content_type: part.content_type,
                    bytes: part.data,
                });
            }
        } else {
            body = serde_json::from_slice(&body_bytes).ok();
            if body.is_none() {
                debug!("JSON body parse failed");
            }
        }
    }

    info!(
        method = %method,
        path = %path,
        headers_count = headers.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        cookies,
        query_params,
        body,
        body_len,
        image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookies() {
        let mut h = HashMap::new();
        h.insert("cookie".to_string(), "a=b; c=d".to_string());
        let cookies = parse_cookies(&h);
        assert_eq!(cookies.get("a"), Some(&"b".to_string()));
        assert_eq!(cookies.get("c"), Some(&"d".to_string()));
    }

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("/p?x=1&y=2");
        assert_eq!(q.get("x"), Some(&"1".to_string()));
        assert_eq!(q.get("y"), Some(&"2".to_string()));
    }

    #[test]
    fn test_multipart_boundary() {
        assert_eq!(
            multipart_boundary("multipart/form-data; boundary=XYZ"),
            Some("XYZ".to_string())
        );
        assert_eq!(
            multipart_boundary("multipart/form-data; boundary=\"quoted\""),
            Some("quoted".to_string())
        );
        assert_eq!(multipart_boundary("application/json"), None);
    }

    #[test]
    fn test_parse_multipart_single_file() {
        let body = b"--XYZ\r\n\
            Content-Disposition: form-data; name=\"image\"; filename=\"xray.png\"\r\n\
            Content-Type: image/png\r\n\
            \r\n\
            \x89PNGDATA\r\n\
            --XYZ--\r\n";
        let parts = parse_multipart(body, "XYZ");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name.as_deref(), Some("image"));
        assert_eq!(parts[0].file_name.as_deref(), Some("xray.png"));
        assert_eq!(parts[0].content_type.as_deref(), Some("image/png"));
        assert_eq!(parts[0].data, b"\x89PNGDATA");
    }

    #[test]
    fn test_parse_multipart_multiple_parts() {
        let body = b"--b\r\n\
            Content-Disposition: form-data; name=\"note\"\r\n\
            \r\n\
            hello\r\n\
            --b\r\n\
            Content-Disposition: form-data; name=\"image\"; filename=\"a.jpg\"\r\n\
            Content-Type: image/jpeg\r\n\
            \r\n\
            JPEGDATA\r\n\
            --b--\r\n";
        let parts = parse_multipart(body, "b");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name.as_deref(), Some("note"));
        assert_eq!(parts[0].data, b"hello");
        assert_eq!(parts[1].name.as_deref(), Some("image"));
        assert_eq!(parts[1].data, b"JPEGDATA");
    }

    #[test]
    fn test_parse_multipart_missing_terminator() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"image\"\r\n\r\ndata";
        // no closing delimiter: the dangling part is discarded, not panicked on
        assert!(parse_multipart(body, "b").is_empty());
    }
}
