//! HTTP message model for the routing core
//!
//! Concrete request/response shapes plus the body and parameter types they
//! carry. The transport layer adapting real connections to these types is
//! out of scope; these are the objects every core component operates on.

pub mod body;
pub mod params;
pub mod request;
pub mod response;
pub mod types;

pub use body::{concat_chunks, Body, BodyStream, BoxError};
pub use params::ParameterMap;
pub use request::GatewayRequest;
pub use response::GatewayResponse;
pub use types::{FlowPath, PolicyId, RequestId};
