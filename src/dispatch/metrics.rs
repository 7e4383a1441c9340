//! Per-request metrics snapshot

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;

use crate::http::{GatewayRequest, RequestId};

/// Facts recorded once per dispatched request.
#[derive(Clone, Debug, Serialize)]
pub struct Metrics {
    pub request_id: RequestId,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub uri: String,
    pub host: Option<String>,
    pub user_agent: Option<String>,
    pub remote_address: Option<SocketAddr>,
    pub local_address: Option<SocketAddr>,
    pub tenant: Option<String>,
    pub zone: Option<String>,
}

impl Metrics {
    pub fn for_request(
        request: &GatewayRequest,
        tenant: Option<String>,
        zone: Option<String>,
    ) -> Self {
        Self {
            request_id: request.id(),
            timestamp: Utc::now(),
            method: request.method().to_string(),
            uri: request.uri().to_string(),
            host: request.host().map(str::to_string),
            user_agent: request.user_agent().map(str::to_string),
            remote_address: request.remote_address(),
            local_address: request.local_address(),
            tenant,
            zone,
        }
    }
}

pub trait MetricsReporter: Send + Sync {
    fn report(&self, metrics: &Metrics);
}

/// Reporter that emits the metrics record as a structured trace event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingMetricsReporter;

impl MetricsReporter for TracingMetricsReporter {
    fn report(&self, metrics: &Metrics) {
        tracing::info!(
            request_id = %metrics.request_id,
            method = %metrics.method,
            uri = %metrics.uri,
            host = metrics.host.as_deref(),
            tenant = metrics.tenant.as_deref(),
            zone = metrics.zone.as_deref(),
            "request dispatched"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn snapshot_captures_request_facts() {
        let mut request = GatewayRequest::new(Method::GET, "/products?limit=5");
        request.set_host("shop.example.com");
        let metrics = Metrics::for_request(&request, Some("acme".to_string()), None);
        assert_eq!(metrics.request_id, request.id());
        assert_eq!(metrics.method, "GET");
        assert_eq!(metrics.uri, "/products?limit=5");
        assert_eq!(metrics.host.as_deref(), Some("shop.example.com"));
        assert_eq!(metrics.tenant.as_deref(), Some("acme"));
        assert!(metrics.zone.is_none());
    }
}
