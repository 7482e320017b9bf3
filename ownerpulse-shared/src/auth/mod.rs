/// Authentication and authorization
///
/// Callers authenticate with RS256 access tokens issued by Auth0. Tokens are
/// verified locally against the tenant's published signing keys; there are no
/// passwords or sessions on this side.
///
/// # Modules
///
/// - [`jwks`]: Signing key retrieval with TTL cache and refresh throttling
/// - [`jwt`]: Token verification and claim mapping
/// - [`middleware`]: Bearer header extraction
/// - [`authorization`]: Ownership, self-or-admin and admin checks

pub mod authorization;
pub mod jwks;
pub mod jwt;
pub mod middleware;
