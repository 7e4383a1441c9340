//! Acceptor resolution: which deployed API owns an incoming request
//!
//! An acceptor binds a context path (and optionally a virtual host) to a
//! handler. Resolution is longest-context-path-wins, with host-restricted
//! acceptors only eligible when the request host matches.

use std::sync::Arc;

use crate::dispatch::handler::{LegacyHandler, ReactiveHandler};

/// Execution contract declared by the deployed API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiType {
    /// Request/response proxying.
    Sync,
    /// Message-level asynchronous APIs.
    MessageAsync,
    /// Protocol-native APIs, dispatched outside this entrypoint.
    Native,
}

/// The handler an acceptor routes to.
#[derive(Clone)]
pub enum HandlerKind {
    Reactive(Arc<dyn ReactiveHandler>),
    Legacy(Arc<dyn LegacyHandler>),
}

#[derive(Clone)]
pub struct Acceptor {
    context_path: String,
    api_type: ApiType,
    host: Option<String>,
    handler: Option<HandlerKind>,
}

impl Acceptor {
    pub fn new(context_path: impl Into<String>, api_type: ApiType) -> Self {
        Self {
            context_path: context_path.into(),
            api_type,
            host: None,
            handler: None,
        }
    }

    pub fn for_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_reactive_handler(mut self, handler: Arc<dyn ReactiveHandler>) -> Self {
        self.handler = Some(HandlerKind::Reactive(handler));
        self
    }

    pub fn with_legacy_handler(mut self, handler: Arc<dyn LegacyHandler>) -> Self {
        self.handler = Some(HandlerKind::Legacy(handler));
        self
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn api_type(&self) -> ApiType {
        self.api_type
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn handler(&self) -> Option<&HandlerKind> {
        self.handler.as_ref()
    }

    fn accepts(&self, host: Option<&str>, path: &str) -> bool {
        if let Some(own) = self.host.as_deref() {
            if host != Some(own) {
                return false;
            }
        }
        let base = self.context_path.trim_end_matches('/');
        if base.is_empty() {
            return true;
        }
        match path.strip_prefix(base) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Maps (host, path) to the owning acceptor.
pub trait AcceptorResolver: Send + Sync {
    fn resolve(&self, host: Option<&str>, path: &str) -> Option<Acceptor>;
}

/// Resolver over a fixed acceptor list; most specific context path wins,
/// host-restricted acceptors before open ones on equal paths.
#[derive(Default)]
pub struct StaticAcceptorResolver {
    acceptors: Vec<Acceptor>,
}

impl StaticAcceptorResolver {
    pub fn new(acceptors: Vec<Acceptor>) -> Self {
        Self { acceptors }
    }
}

impl AcceptorResolver for StaticAcceptorResolver {
    fn resolve(&self, host: Option<&str>, path: &str) -> Option<Acceptor> {
        self.acceptors
            .iter()
            .filter(|acceptor| acceptor.accepts(host, path))
            .max_by_key(|acceptor| {
                (
                    acceptor.context_path.trim_end_matches('/').len(),
                    acceptor.host.is_some(),
                )
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(acceptors: Vec<Acceptor>) -> StaticAcceptorResolver {
        StaticAcceptorResolver::new(acceptors)
    }

    #[test]
    fn most_specific_context_path_wins() {
        let resolver = resolver(vec![
            Acceptor::new("/shop", ApiType::Sync),
            Acceptor::new("/shop/admin", ApiType::Sync),
        ]);
        let hit = resolver.resolve(None, "/shop/admin/users").unwrap();
        assert_eq!(hit.context_path(), "/shop/admin");
    }

    #[test]
    fn matches_only_on_segment_boundaries() {
        let resolver = resolver(vec![Acceptor::new("/shop", ApiType::Sync)]);
        assert!(resolver.resolve(None, "/shop").is_some());
        assert!(resolver.resolve(None, "/shop/products").is_some());
        assert!(resolver.resolve(None, "/shopping").is_none());
    }

    #[test]
    fn host_restriction_filters_and_outranks() {
        let resolver = resolver(vec![
            Acceptor::new("/shop", ApiType::Sync),
            Acceptor::new("/shop", ApiType::MessageAsync).for_host("events.example.com"),
        ]);

        let open = resolver.resolve(None, "/shop").unwrap();
        assert_eq!(open.api_type(), ApiType::Sync);

        let hosted = resolver
            .resolve(Some("events.example.com"), "/shop")
            .unwrap();
        assert_eq!(hosted.api_type(), ApiType::MessageAsync);
    }

    #[test]
    fn no_acceptor_means_none() {
        let resolver = resolver(vec![Acceptor::new("/shop", ApiType::Sync)]);
        assert!(resolver.resolve(None, "/blog").is_none());
    }
}
