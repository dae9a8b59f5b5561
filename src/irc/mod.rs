//! IRC network endpoint.
//!
//! A minimal client: registration, PING/PONG, a single channel, and the
//! membership tracking needed for `?listusers`.

pub mod client;
pub mod codec;
pub mod message;
pub mod roster;
pub mod split;

pub use client::IrcEndpoint;
