mod claims;
mod middleware;
mod principal;

pub use claims::{Claims, ClaimsVerifier, Hs256Verifier, Identity};
pub use middleware::{AuthError, AuthPrincipal, DIRECTORY_TOKEN_HEADER};
pub use principal::Principal;
