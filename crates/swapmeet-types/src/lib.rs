//! Types shared by the SwapMeet gateway and the client core.
//!
//! `models` holds the domain entities as they travel over the wire,
//! `api` holds request/response envelopes and token claims.

pub mod api;
pub mod models;

/// Longest `imageUrl` value (in characters) a listing may carry.
pub const MAX_IMAGE_CHARS: usize = 1_000_000;
