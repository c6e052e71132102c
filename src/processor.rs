//! Token validation strategies.

pub mod jwt;
pub mod upstream;

pub use jwt::JwtProcessor;
pub use upstream::UpstreamProcessor;

// crates.io
use serde::Serialize;
// self
use crate::{_prelude::*, tokeninfo::TokenInfo};

/// Identifies the strategy that handled a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
	/// Delegated to the upstream introspection endpoint.
	Upstream,
	/// Verified locally against the key store.
	Jwt,
}
impl ProcessorKind {
	/// Stable label for metrics and logs.
	pub fn label(self) -> &'static str {
		match self {
			ProcessorKind::Upstream => "upstream",
			ProcessorKind::Jwt => "jwt",
		}
	}
}

/// A registered validation strategy.
#[derive(Debug)]
pub enum Processor {
	/// Upstream-delegating strategy.
	Upstream(UpstreamProcessor),
	/// Local JWT verification strategy.
	Jwt(JwtProcessor),
}
impl Processor {
	/// Which strategy this is.
	pub fn kind(&self) -> ProcessorKind {
		match self {
			Processor::Upstream(_) => ProcessorKind::Upstream,
			Processor::Jwt(_) => ProcessorKind::Jwt,
		}
	}

	/// Fully validate `raw` with this strategy.
	pub async fn validate(&self, raw: &str) -> Result<TokenInfo> {
		match self {
			Processor::Upstream(processor) => processor.validate(raw).await,
			Processor::Jwt(processor) => processor.validate(raw),
		}
	}
}
