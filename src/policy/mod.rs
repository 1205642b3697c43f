//! Eviction policies
//!
//! A policy is a stateless chooser: given a snapshot of a tier's entries it
//! names the one that should leave next. The coordinator may call it
//! repeatedly within a single eviction, so policies must tolerate thin
//! snapshots.

pub mod lru;

pub use lru::LruPolicy;

use crate::core::entry::CacheEntry;

/// Picks the next eviction victim from a snapshot. Must be a pure function
/// of the input: no state carried across calls, and deterministic for an
/// unchanged snapshot. `None` signals no choice.
pub trait EvictionPolicy: Send + Sync {
    fn choose(&self, entries: &[CacheEntry]) -> Option<String>;
}
