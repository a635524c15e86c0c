//! Method registry and namespacing.
//!
//! Every exposed method is registered under a namespace; the transport
//! layer dispatches by name. Registration is done once at startup and
//! duplicate names are programming errors.

use std::collections::BTreeMap;

use crate::error::RpcError;

/// Namespaces a method can be registered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Namespace {
    /// Methods available on every node.
    Default,
    /// Methods only exposed on test networks.
    Test,
}

/// Registry of RPC method names.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: BTreeMap<String, Namespace>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method name. Fails on duplicates.
    pub fn register(&mut self, name: &str, namespace: Namespace) -> Result<(), RpcError> {
        if self.methods.contains_key(name) {
            return Err(RpcError::DuplicateMethod(name.to_string()));
        }
        self.methods.insert(name.to_string(), namespace);
        Ok(())
    }

    pub fn namespace_of(&self, name: &str) -> Result<Namespace, RpcError> {
        self.methods
            .get(name)
            .copied()
            .ok_or_else(|| RpcError::UnknownMethod(name.to_string()))
    }

    /// Method names visible for a deployment; test-namespace methods are
    /// only listed when `include_test` is set.
    pub fn method_names(&self, include_test: bool) -> Vec<String> {
        self.methods
            .iter()
            .filter(|(_, ns)| include_test || **ns == Namespace::Default)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Register the node service methods.
    pub fn with_node_methods() -> Result<Self, RpcError> {
        let mut registry = Self::new();
        registry.register("getNodeInfo", Namespace::Default)?;
        registry.register("getPeerInfo", Namespace::Default)?;
        registry.register("getRpcInfo", Namespace::Default)?;
        registry.register("getTimeInfo", Namespace::Default)?;
        registry.register("stop", Namespace::Test)?;
        registry.register("banlist", Namespace::Test)?;
        registry.register("checkAddress", Namespace::Default)?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_methods_registered() {
        let registry = MethodRegistry::with_node_methods().unwrap();
        assert_eq!(
            registry.namespace_of("getNodeInfo").unwrap(),
            Namespace::Default
        );
        assert_eq!(registry.namespace_of("stop").unwrap(), Namespace::Test);
        assert!(matches!(
            registry.namespace_of("nope"),
            Err(RpcError::UnknownMethod(_))
        ));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = MethodRegistry::new();
        registry.register("stop", Namespace::Test).unwrap();
        assert!(matches!(
            registry.register("stop", Namespace::Default),
            Err(RpcError::DuplicateMethod(_))
        ));
    }

    #[test]
    fn test_methods_hidden_by_default() {
        let registry = MethodRegistry::with_node_methods().unwrap();
        let public = registry.method_names(false);
        assert!(public.contains(&"getNodeInfo".to_string()));
        assert!(!public.contains(&"banlist".to_string()));
        let all = registry.method_names(true);
        assert!(all.contains(&"banlist".to_string()));
    }
}
