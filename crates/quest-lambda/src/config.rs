/// Mount path of the function itself, stripped before routing
pub const DEFAULT_ROUTING_PREFIX: &str = "/.netlify/functions/api";

/// Adapter settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub routing_prefix: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            routing_prefix: DEFAULT_ROUTING_PREFIX.to_string(),
        }
    }
}

impl AdapterConfig {
    pub fn with_routing_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.routing_prefix = prefix.into();
        self
    }
}
