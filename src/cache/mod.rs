//! Persistent caches for remote lookup results
//!
//! This module provides a file-backed key-value store with a get-or-compute
//! primitive. Callers partition related lookups across distinct backing files
//! (one store for team identities, one per team for resolved user names) so
//! that repeated network calls are avoided within and across runs.

mod store;

pub use store::{CacheError, CacheStore};
