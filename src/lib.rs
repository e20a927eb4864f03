//! Webmention reception and interpretation engine.
//!
//! Accepts webmention claims over HTTP, verifies that the source really
//! links to the target, interprets the source's microformats into typed
//! mention records, and reconciles them against a mention store. Acceptance
//! is decoupled from processing: the endpoint answers `202` and per-target
//! workers decide each claim's fate asynchronously.

pub mod config;
pub mod fetch;
pub mod interpret;
pub mod mf2;
pub mod notify;
pub mod protocol;
pub mod reconcile;
pub mod resolver;
pub mod server;
pub mod store;
pub mod types;
pub mod verify;
pub mod worker;

#[cfg(test)]
pub mod test_utils;
