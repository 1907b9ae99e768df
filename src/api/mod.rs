//! Dashboard backend access.
//!
//! This module provides the REST client and the input-source abstraction
//! used to obtain the flat organization list.

pub mod client;
pub mod source;

pub use client::{ApiClient, ClientConfig, Session};
pub use source::OrgSource;
