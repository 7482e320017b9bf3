/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: User records and the caller's profile
/// - `properties`: Owned properties and their dependent collections
/// - `bookings`: Guest stays on owned properties
/// - `work_orders`: Maintenance jobs on owned properties

pub mod bookings;
pub mod health;
pub mod properties;
pub mod users;
pub mod work_orders;
