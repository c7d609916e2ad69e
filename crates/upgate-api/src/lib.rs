//! Upgate API Library
//!
//! This crate provides the identity gate, the upload credential issuer, the
//! HTTP handlers and application setup.

pub mod auth;
pub mod constants;
pub mod error;
mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use auth::{AccessPolicy, IdentityGate, IdentityVerifier, Principal};
pub use error::{ErrorResponse, HttpAppError};
pub use services::IssuerService;
pub use state::AppState;
