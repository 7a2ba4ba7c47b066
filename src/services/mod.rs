//! Business logic services.
//!
//! Services contain the license lifecycle separated from HTTP handlers.
//! They talk to collaborators only through the traits in [`crate::store`],
//! [`crate::relay`] and [`crate::notifier`].

pub mod issuance_service;
pub mod license_service;
pub mod summary_service;
