//! GoalGPT client library
//!
//! Non-visual core of the GoalGPT client: a TTL cache over a persistent
//! key-value store, the prediction API client, date filtering, and the live
//! score feed with its non-mutating merge.

pub mod api;
pub mod cache;
pub mod cli;
pub mod data;
pub mod filter;
pub mod live;
pub mod store;
