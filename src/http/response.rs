//! The response object carried through the routing core

use http::{HeaderMap, StatusCode};

use crate::http::body::Body;

#[derive(Debug)]
pub struct GatewayResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
    ended: bool,
}

impl GatewayResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::Empty,
            ended: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    pub fn take_body(&mut self) -> Body {
        self.body.take()
    }

    /// Mark the response as already written by its producer. Completion
    /// skips the final transport write when this is set.
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl Default for GatewayResponse {
    fn default() -> Self {
        Self::new()
    }
}
