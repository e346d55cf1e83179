//! Per-client fixed-window rate limiting
//!
//! - [`RateLimiter`]: one fixed-window counter map for one route class
//! - [`RateLimiterSet`]: the api, health and auth limiters together
//! - [`KeyExtractor`]: pluggable client-key derivation

pub mod error;
pub mod keys;
pub mod limiter;
pub mod set;

pub use error::LimiterError;
pub use keys::{AddressAndAgentKey, AddressKey, ClientIdentity, KeyExtractor};
pub use limiter::RateLimiter;
pub use set::RateLimiterSet;
