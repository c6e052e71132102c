//! Signing keys published by the OpenID provider.

pub mod snapshot;
pub mod store;

pub use snapshot::{KeyEntry, KeySnapshot};
pub use store::{KeyStore, ProviderConfiguration};
