// Transport-neutral HTTP request/response values for the MCP endpoint

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri};
use serde::Serialize;
use url::Url;

/// Header carrying the MCP session id
pub const SESSION_HEADER: &str = "mcp-session-id";

/// A fully buffered inbound HTTP request
#[derive(Debug, Clone)]
pub struct McpHttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl McpHttpRequest {
    /// Rebuild the absolute request URL from the `Host` header and the
    /// forwarded scheme (`x-forwarded-proto`, default `http`).
    pub fn from_parts(method: Method, uri: &Uri, headers: HeaderMap, body: Bytes) -> Result<Self, url::ParseError> {
        let scheme = header_str(&headers, "x-forwarded-proto")
            .and_then(|proto| proto.split(',').next())
            .map(|proto| proto.trim().to_string())
            .filter(|proto| !proto.is_empty())
            .unwrap_or_else(|| "http".to_string());
        let host = header_str(&headers, header::HOST.as_str())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        let url = Url::parse(&format!("{}://{}{}", scheme, host, path_and_query))?;
        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_str(&self.headers, name)
    }

    /// `scheme://host[:port]` of the request URL
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Token from an `Authorization: Bearer ...` header
    pub fn bearer_token(&self) -> Option<String> {
        bearer_token(&self.headers)
    }

    pub fn accepts_event_stream(&self) -> bool {
        self.header(header::ACCEPT.as_str())
            .is_some_and(|accept| accept.contains("text/event-stream"))
    }

    pub fn accepts_html(&self) -> bool {
        self.header(header::ACCEPT.as_str())
            .is_some_and(|accept| accept.contains("text/html"))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extract a bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    header_str(headers, header::AUTHORIZATION.as_str())
        .and_then(|auth| {
            auth.strip_prefix("Bearer ")
                .or_else(|| auth.strip_prefix("bearer "))
        })
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// An outbound HTTP response
#[derive(Debug, Clone)]
pub struct McpHttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl McpHttpResponse {
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        Self::empty(status)
            .with_header(header::CONTENT_TYPE, "application/json")
            .with_body(body)
    }

    /// Frame a JSON message as a single server-sent event
    pub fn event_stream<T: Serialize>(status: StatusCode, value: &T) -> Self {
        let json = serde_json::to_string(value).unwrap_or_default();
        Self::empty(status)
            .with_header(header::CONTENT_TYPE, "text/event-stream")
            .with_header(header::CACHE_CONTROL, "no-cache")
            .with_body(format!("event: message\ndata: {}\n\n", json))
    }

    pub fn html(status: StatusCode, html: impl Into<String>) -> Self {
        Self::empty(status)
            .with_header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .with_body(html.into())
    }

    pub fn with_header(mut self, name: impl Into<HeaderName>, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name.into(), value);
            }
            Err(e) => tracing::warn!("Dropping invalid response header value: {}", e),
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_str(&self.headers, name)
    }

    /// Decode the JSON-RPC payload of a JSON or event-stream body
    pub fn json_payload(&self) -> Option<serde_json::Value> {
        let text = std::str::from_utf8(&self.body).ok()?;
        let data = text
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .unwrap_or(text);
        serde_json::from_str(data).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)], uri: &str) -> McpHttpRequest {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        McpHttpRequest::from_parts(Method::POST, &uri.parse().unwrap(), map, Bytes::new()).unwrap()
    }

    #[test]
    fn test_url_reconstruction() {
        let req = request(&[("host", "localhost:6006")], "/mcp?x=1");
        assert_eq!(req.url.as_str(), "http://localhost:6006/mcp?x=1");
        assert_eq!(req.origin(), "http://localhost:6006");

        let req = request(
            &[("host", "sb.example.com"), ("x-forwarded-proto", "https, http")],
            "/mcp",
        );
        assert_eq!(req.url.as_str(), "https://sb.example.com/mcp");
    }

    #[test]
    fn test_bearer_token() {
        let req = request(&[("host", "h"), ("authorization", "Bearer abc123")], "/mcp");
        assert_eq!(req.bearer_token().as_deref(), Some("abc123"));

        let req = request(&[("host", "h"), ("authorization", "Basic Zm9v")], "/mcp");
        assert!(req.bearer_token().is_none());
    }

    #[test]
    fn test_event_stream_framing() {
        let res = McpHttpResponse::event_stream(StatusCode::OK, &serde_json::json!({"id": 1}));
        assert_eq!(res.header("content-type"), Some("text/event-stream"));
        assert_eq!(&res.body[..], b"event: message\ndata: {\"id\":1}\n\n");
        assert_eq!(res.json_payload().unwrap()["id"], 1);
    }
}
