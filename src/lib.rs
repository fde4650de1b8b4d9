//! Memo record store served over HTTP.
//!
//! Reads are answered by whichever backend [`application::selector`] picks at
//! startup; writes always reach the durable store and signal the cache layer
//! through [`application::dispatch`].

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
