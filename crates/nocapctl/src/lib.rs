//! NoCap control library - client and rendering, exposed for testing.

pub mod client;
pub mod display;
