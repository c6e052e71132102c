//! In-memory caches on the request path.

pub mod upstream;

pub use upstream::UpstreamCache;
