//! Per-request execution context
//!
//! Owns the request/response pair for one in-flight dispatch and the
//! cooperative interruption flag that policies, the chain adapter, and the
//! timeout path all observe. Interruption is state, not an error: stages
//! check [`ExecutionContext::is_interrupted`] instead of relying on a
//! failure propagating through the pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::http::{GatewayRequest, GatewayResponse};

/// Phase the pipeline is currently executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionPhase {
    Request,
    Response,
}

/// Shape of the execution context, chosen once from the API's declared type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Synchronous request/response contract.
    Sync,
    /// Message-oriented, fully asynchronous contract.
    Async,
}

/// Shared, atomically flippable interruption flag.
///
/// Cloned into the timeout decorator so it can interrupt without holding a
/// mutable borrow of the context.
#[derive(Clone, Debug, Default)]
pub struct InterruptionState {
    interrupted: Arc<AtomicBool>,
}

impl InterruptionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

/// Context owned by one logical request from dispatch to completion.
#[derive(Debug)]
pub struct ExecutionContext {
    request: GatewayRequest,
    response: GatewayResponse,
    phase: ExecutionPhase,
    mode: ExecutionMode,
    interruption: InterruptionState,
    attributes: HashMap<String, serde_json::Value>,
}

impl ExecutionContext {
    pub fn new(request: GatewayRequest) -> Self {
        Self::with_mode(request, ExecutionMode::Sync)
    }

    pub fn with_mode(request: GatewayRequest, mode: ExecutionMode) -> Self {
        Self {
            request,
            response: GatewayResponse::new(),
            phase: ExecutionPhase::Request,
            mode,
            interruption: InterruptionState::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn request(&self) -> &GatewayRequest {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut GatewayRequest {
        &mut self.request
    }

    pub fn response(&self) -> &GatewayResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut GatewayResponse {
        &mut self.response
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: ExecutionPhase) {
        self.phase = phase;
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Mark the remaining chain as interrupted.
    pub fn interrupt(&self) {
        self.interruption.interrupt();
    }

    pub fn is_interrupted(&self) -> bool {
        self.interruption.is_interrupted()
    }

    /// Handle to the interruption flag, shareable with concurrent stages.
    pub fn interruption(&self) -> InterruptionState {
        self.interruption.clone()
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(name.into(), value);
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }
}
