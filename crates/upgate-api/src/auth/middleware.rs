use crate::auth::gate::IdentityGate;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Reject unauthenticated or non-allow-listed requests; otherwise store the
/// verified [`Principal`](crate::auth::Principal) in request extensions.
pub async fn identity_gate_middleware(
    State(gate): State<Arc<IdentityGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = gate.authenticate(request.headers()).await;
    match outcome {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => HttpAppError::from(err).into_response(),
    }
}
