//! Marketplace query layer
//!
//! Compiles client filter inputs into document-store predicates and serves
//! offset and cursor paginated listings for customers, service providers and
//! bookings.

pub mod cli;
pub mod config;
pub mod db;
pub mod graphql;
pub mod logging;
pub mod services;
