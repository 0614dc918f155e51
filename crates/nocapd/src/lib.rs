//! NoCap daemon library - exposes modules for testing.

pub mod classifier;
pub mod composer;
pub mod config;
pub mod credentials;
pub mod daemon;
pub mod diagnostics;
pub mod factcheck;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod quota;
pub mod routes;
pub mod scrape;
pub mod search;
pub mod server;
