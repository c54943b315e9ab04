use serde_json::Value;

/// A user-defined event: the payload exactly as delivered plus the host context. The handler's
/// returned value becomes the invocation response.
#[derive(Debug, Clone)]
pub struct CustomEvent<C> {
    pub context: C,
    pub data: Value,
}
