//! Authentication and authorization for the editor API.
//!
//! # Components
//!
//! - `key_sources` - ordered candidate JWKS endpoints
//! - `jwks` - cached JWKS client per key source
//! - `token` - pre-verification checks and per-key signature verification
//! - `verifier` - first-success-wins verification across key sources
//! - `claims` - verified claim set
//! - `policy` - audience and role policies, `Principal`
//! - `gateway` - per-request pipeline producing a `Principal` or `AuthError`

pub mod claims;
pub mod gateway;
pub mod jwks;
pub mod key_sources;
pub mod policy;
pub mod token;
pub mod verifier;

pub use claims::{Audience, Claims};
pub use gateway::AuthGateway;
pub use jwks::{JwksClient, JwksProvider};
pub use key_sources::KeySources;
pub use policy::{AudiencePolicy, Principal, RoutePolicy};
pub use verifier::TokenVerifier;
