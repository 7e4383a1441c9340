//! Transport-level request/response seam
//!
//! The dispatcher receives a [`TransportRequest`] and a shared
//! [`TransportResponse`] handle from the server layer. The response handle
//! uses interior mutability so the timeout task and the dispatch path can
//! both reach it; `end` is idempotent, which is what makes the "exactly one
//! effective end" guarantee hold under that race.

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_TYPE, HOST, UPGRADE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};
use parking_lot::Mutex;
use std::net::SocketAddr;

use crate::http::{concat_chunks, Body, GatewayRequest};

/// Raw request handed over by a transport adapter.
#[derive(Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub uri: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub remote_address: Option<SocketAddr>,
    pub local_address: Option<SocketAddr>,
    pub body: Body,
}

impl TransportRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            remote_address: None,
            local_address: None,
            body: Body::Empty,
        }
    }

    /// Lift the transport request into the gateway's request shape.
    pub fn into_gateway_request(self) -> GatewayRequest {
        let mut request = GatewayRequest::new(self.method, self.uri);
        request.set_version(self.version);
        if let Some(host) = self.headers.get(HOST).and_then(|v| v.to_str().ok()) {
            request.set_host(host.to_string());
        }
        *request.headers_mut() = self.headers;
        if let Some(addr) = self.remote_address {
            request.set_remote_address(addr);
        }
        if let Some(addr) = self.local_address {
            request.set_local_address(addr);
        }
        request.set_body(self.body);
        request
    }
}

/// Transport classification of an incoming request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    Http2,
    Grpc,
    WebSocket,
}

impl TransportKind {
    /// Classify from protocol version and headers. gRPC is an HTTP/2
    /// content-type refinement; websocket upgrades only exist on HTTP/1.x.
    pub fn classify(version: Version, headers: &HeaderMap) -> Self {
        if version >= Version::HTTP_2 {
            let grpc = headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("application/grpc"));
            if grpc {
                TransportKind::Grpc
            } else {
                TransportKind::Http2
            }
        } else if is_websocket_upgrade(headers) {
            TransportKind::WebSocket
        } else {
            TransportKind::Http
        }
    }
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        });
    let upgrade_websocket = headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
    connection_upgrade && upgrade_websocket
}

/// Write side of one transport exchange.
///
/// Implementations are shared between the dispatch path and the timeout
/// task, so every method takes `&self`. `end` must be idempotent: only the
/// first call takes effect.
pub trait TransportResponse: Send + Sync {
    fn set_status(&self, status: StatusCode);
    fn set_header(&self, name: HeaderName, value: HeaderValue);
    fn write(&self, chunk: Bytes);
    fn end(&self);
    fn is_ended(&self) -> bool;
}

#[derive(Debug, Default)]
struct ResponseInner {
    status: Option<StatusCode>,
    headers: HeaderMap,
    chunks: Vec<Bytes>,
    ended: bool,
    end_count: usize,
}

/// In-process implementation, used by transport adapters that buffer the
/// whole exchange and by the test suites.
#[derive(Debug, Default)]
pub struct InMemoryTransportResponse {
    inner: Mutex<ResponseInner>,
}

impl InMemoryTransportResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.inner.lock().status.unwrap_or(StatusCode::OK)
    }

    pub fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.inner.lock().headers.get(name).cloned()
    }

    pub fn body(&self) -> Bytes {
        concat_chunks(&self.inner.lock().chunks)
    }

    /// Number of `end` calls that had an effect. At most one by contract.
    pub fn end_count(&self) -> usize {
        self.inner.lock().end_count
    }
}

impl TransportResponse for InMemoryTransportResponse {
    fn set_status(&self, status: StatusCode) {
        let mut inner = self.inner.lock();
        if !inner.ended {
            inner.status = Some(status);
        }
    }

    fn set_header(&self, name: HeaderName, value: HeaderValue) {
        let mut inner = self.inner.lock();
        if !inner.ended {
            inner.headers.insert(name, value);
        }
    }

    fn write(&self, chunk: Bytes) {
        let mut inner = self.inner.lock();
        if !inner.ended {
            inner.chunks.push(chunk);
        }
    }

    fn end(&self) {
        let mut inner = self.inner.lock();
        if !inner.ended {
            inner.ended = true;
            inner.end_count += 1;
        }
    }

    fn is_ended(&self) -> bool {
        self.inner.lock().ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                name.parse::<HeaderName>().unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[rstest]
    #[case(Version::HTTP_11, &[], TransportKind::Http)]
    #[case(Version::HTTP_2, &[], TransportKind::Http2)]
    #[case(Version::HTTP_2, &[("content-type", "application/grpc")], TransportKind::Grpc)]
    #[case(Version::HTTP_2, &[("content-type", "application/grpc+proto")], TransportKind::Grpc)]
    #[case(
        Version::HTTP_11,
        &[("connection", "keep-alive, Upgrade"), ("upgrade", "websocket")],
        TransportKind::WebSocket
    )]
    // Upgrade semantics do not exist on h2.
    #[case(
        Version::HTTP_2,
        &[("connection", "upgrade"), ("upgrade", "websocket")],
        TransportKind::Http2
    )]
    #[case(Version::HTTP_11, &[("upgrade", "websocket")], TransportKind::Http)]
    fn classifies_transport(
        #[case] version: Version,
        #[case] pairs: &[(&str, &str)],
        #[case] expected: TransportKind,
    ) {
        assert_eq!(
            TransportKind::classify(version, &headers(pairs)),
            expected
        );
    }

    #[test]
    fn end_is_idempotent() {
        let response = InMemoryTransportResponse::new();
        response.set_status(StatusCode::NO_CONTENT);
        response.end();
        response.end();
        response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.write(Bytes::from_static(b"late"));
        assert_eq!(response.end_count(), 1);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
    }

    #[test]
    fn gateway_request_carries_transport_fields() {
        let mut transport = TransportRequest::new(Method::POST, "/orders?draft=true");
        transport.headers = headers(&[("host", "shop.example.com")]);
        transport.version = Version::HTTP_2;
        let request = transport.into_gateway_request();
        assert_eq!(request.host(), Some("shop.example.com"));
        assert_eq!(request.version(), Version::HTTP_2);
        assert_eq!(request.parameters().get("draft"), Some("true"));
    }
}
