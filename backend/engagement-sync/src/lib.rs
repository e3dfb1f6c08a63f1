//! Engagement sync client
//!
//! Environment configuration, the REST implementation of the
//! `engagement-core` collaborator contracts, and session wiring used by the
//! `engagement-sync` binary.

pub mod config;
pub mod http;
pub mod session;

pub use config::Config;
pub use http::HttpEngagementApi;
pub use session::EngagementSession;
