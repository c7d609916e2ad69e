pub mod issuer;

pub use issuer::{IssuedGrant, IssuerService};
