//! # OwnerPulse Shared Library
//!
//! This crate contains the data layer and identity logic shared by the
//! OwnerPulse API server and its integration tests.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migration runner
//! - `models`: Users, properties, bookings and work orders with their CRUD
//! - `auth`: Identity-provider token verification and ownership checks
//! - `identity`: Resolve-or-create of local users from verified identities

pub mod auth;
pub mod db;
pub mod identity;
pub mod models;

/// Current version of the OwnerPulse shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
