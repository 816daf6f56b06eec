//! Billing proxy - signup and top-up front end for the iTelBilling provider.
//!
//! This service sits in front of iTelBilling to:
//! - Register and log in local users
//! - Drive the two-step verify/signup flows for PIN users and client accounts
//! - Forward mobile recharges and status polls
//! - Persist user state in an encrypted file store

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod store;

pub use auth::TokenIssuer;
pub use config::Config;
pub use error::ProxyError;
pub use store::{BillingState, Role, Store, UserDirectory, UserRecord};
