//! Core domain + application logic for the notification admin console.
//!
//! This crate is intentionally transport-agnostic. The platform REST API
//! lives behind a port (trait) implemented in the adapter crate.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod envelope;
pub mod errors;
pub mod filter;
pub mod logging;
pub mod ports;
pub mod quota;
pub mod records;
pub mod template;
pub mod wizard;

pub use errors::{Error, Result, ValidationError};
