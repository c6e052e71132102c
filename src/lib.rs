//! Token-introspection gateway core: lock-free signing-key and revocation snapshots refreshed in
//! the background, an LRU cache in front of the upstream tokeninfo endpoint, and issuer-based
//! dispatch between upstream delegation and local JWT verification.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod gateway;
pub mod http;
pub mod keys;
pub mod metrics;
pub mod processor;
pub mod registry;
pub mod revocation;
pub mod schedule;
pub mod security;
pub mod settings;
pub mod status;
pub mod tokeninfo;

mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, TimeDelta, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use crate::{
	cache::UpstreamCache,
	error::{Disposition, Error, Rejection, Result},
	gateway::Gateway,
	keys::{KeySnapshot, KeyStore},
	processor::{Processor, ProcessorKind},
	registry::{IssuerMatcher, ProcessorRegistry},
	revocation::{RevocationCache, RevocationKind},
	settings::Settings,
	status::{ComponentState, ComponentStatus},
	tokeninfo::TokenInfo,
};
