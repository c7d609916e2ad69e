//! Application state shared by all handlers.

use crate::auth::IdentityGate;
use crate::services::IssuerService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<IssuerService>,
    pub gate: Arc<IdentityGate>,
    /// Reported by the health endpoint
    pub bucket_name: String,
}
