use std::sync::Arc;

use crate::gateway::SessionRegistry;

// -----------------------------------------------------------------------------
// ----- GatewayContext --------------------------------------------------------

/// Shared state handed to every route.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub registry: Arc<SessionRegistry>,
    pub secure_cookies: bool,
}

impl GatewayContext {
    pub fn new(registry: Arc<SessionRegistry>, secure_cookies: bool) -> Self {
        Self {
            registry,
            secure_cookies,
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
