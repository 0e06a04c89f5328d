//! Integration with the hosting application's security API.
//!
//! [`RoleMappingsClient`] persists role mappings over HTTP and implements
//! [`crate::store::RoleMappingStore`].

mod client;
mod role_mappings;

pub use client::{Credentials, IntegrationClient, IntegrationResult};
pub use role_mappings::RoleMappingsClient;
