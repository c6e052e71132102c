//! HTTP helpers for provider document retrieval.

pub mod client;
pub mod retry;
