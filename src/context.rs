//! Execution context a binding is created in.

/// Capabilities of the place a binding runs.
///
/// Pre-rendering has no live connection: bindings created there stay inert,
/// never fetch, and ignore navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    pub has_live_connection: bool,
}

impl ExecutionContext {
    /// A client with a live connection.
    pub fn live() -> Self {
        Self {
            has_live_connection: true,
        }
    }

    /// A context without a live connection, such as pre-rendering.
    pub fn detached() -> Self {
        Self {
            has_live_connection: false,
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::live()
    }
}
