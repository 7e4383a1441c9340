//! The request object carried through the routing core
//!
//! Transport adapters build a [`GatewayRequest`] from their native request
//! type; everything downstream (condition evaluators, policies, processor
//! chains) speaks this shape only.

use http::{HeaderMap, Method, Version};
use std::net::SocketAddr;

use crate::http::body::Body;
use crate::http::params::ParameterMap;
use crate::http::types::RequestId;

#[derive(Debug)]
pub struct GatewayRequest {
    id: RequestId,
    method: Method,
    uri: String,
    path: String,
    context_path: String,
    path_info: String,
    version: Version,
    headers: HeaderMap,
    parameters: ParameterMap,
    path_parameters: ParameterMap,
    host: Option<String>,
    remote_address: Option<SocketAddr>,
    local_address: Option<SocketAddr>,
    body: Body,
}

impl GatewayRequest {
    /// Create a request from a method and a request-target (`/path?query`).
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let (path, query) = match uri.split_once('?') {
            Some((p, q)) => (p.to_string(), q),
            None => (uri.clone(), ""),
        };
        let parameters = ParameterMap::from_query(query);
        Self {
            id: RequestId::new(),
            method,
            path_info: path.clone(),
            context_path: "/".to_string(),
            path,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            parameters,
            path_parameters: ParameterMap::new(),
            host: None,
            remote_address: None,
            local_address: None,
            body: Body::Empty,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Rewrite the request path (used by the not-found handling to record
    /// the unmatched path on the context).
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.recompute_path_info();
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Set the matched base path; `path_info` becomes the remainder of the
    /// request path after it.
    pub fn set_context_path(&mut self, context_path: impl Into<String>) {
        self.context_path = context_path.into();
        self.recompute_path_info();
    }

    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    pub fn path_parameters(&self) -> &ParameterMap {
        &self.path_parameters
    }

    pub fn path_parameters_mut(&mut self) -> &mut ParameterMap {
        &mut self.path_parameters
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = Some(host.into());
    }

    pub fn remote_address(&self) -> Option<SocketAddr> {
        self.remote_address
    }

    pub fn set_remote_address(&mut self, addr: SocketAddr) {
        self.remote_address = Some(addr);
    }

    pub fn local_address(&self) -> Option<SocketAddr> {
        self.local_address
    }

    pub fn set_local_address(&mut self, addr: SocketAddr) {
        self.local_address = Some(addr);
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    /// Take the body out for consumption, leaving `Empty` behind.
    pub fn take_body(&mut self) -> Body {
        self.body.take()
    }

    fn recompute_path_info(&mut self) {
        let base = self.context_path.trim_end_matches('/');
        self.path_info = match self.path.strip_prefix(base) {
            Some(rest) if rest.is_empty() => "/".to_string(),
            Some(rest) => rest.to_string(),
            None => self.path.clone(),
        };
    }
}
