//! Client code for swcache.
//!
//! This crate holds the request-interception pipeline: the network
//! boundary, the request router, the three caching strategies, and the
//! worker that drives install, activate, and fetch handling.

pub mod background;
pub mod fetch;
pub mod request;
pub mod response;
pub mod router;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use background::BackgroundTasks;
pub use fetch::{FetchConfig, HttpNetwork, Network};
pub use request::{Destination, Method, Request, RequestMode};
pub use response::Response;
pub use router::{Route, Router, StrategyTag};
pub use worker::{ActivateReport, CacheWorker, FetchOutcome, InstallReport, WorkerState};
