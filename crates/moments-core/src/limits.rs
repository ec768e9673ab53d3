//! Shared request limits.
//!
//! The gateway and the client each enforce a minimum image count; the client
//! minimum is stricter than the gateway's.

/// Fewest images the gateway accepts for one analysis.
pub const GATEWAY_MIN_IMAGES: usize = 3;

/// Fewest images the client lets the user submit.
pub const CLIENT_MIN_IMAGES: usize = 5;

/// Images beyond this count are dropped before the upstream call.
pub const MAX_IMAGES: usize = 8;

/// Request body ceiling accepted by the gateway.
pub const BODY_LIMIT_MB: usize = 25;

pub const MB: u64 = 1024 * 1024;
