//! Slack network endpoint.

pub mod api;
pub mod client;
pub mod presence;
pub mod text;

pub use client::SlackEndpoint;
