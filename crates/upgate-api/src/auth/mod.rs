//! Identity gate: bearer credential → verified principal → allow-list check.

pub mod firebase;
pub mod gate;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod verifier;

pub use firebase::{FirebaseVerifier, RevocationCheck};
pub use gate::{AuthError, IdentityGate};
pub use middleware::identity_gate_middleware;
pub use models::Principal;
pub use policy::AccessPolicy;
pub use verifier::{Claims, IdentityVerifier, VerificationError};
