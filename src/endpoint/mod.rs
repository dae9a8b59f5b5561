//! Network endpoint abstraction.
//!
//! An endpoint wraps one chat network connection. The bridge only talks to
//! endpoints through the [`Endpoint`] trait, so either side can be swapped
//! for a test double.

pub mod publisher;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::common::error::{ConnectionResult, MembershipUnavailable, SendError};
use crate::common::{EndpointEvent, Message, Network};

pub use publisher::EventPublisher;

/// Capability surface shared by the IRC and Slack adapters.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Which network this endpoint is connected to.
    fn network(&self) -> Network;

    /// Register a new subscriber for this endpoint's events.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<EndpointEvent>;

    /// Connect and run the event loop until the connection ends or
    /// `shutdown` flips to `true`. Does not retry.
    async fn run(&self, shutdown: watch::Receiver<bool>) -> ConnectionResult<()>;

    /// Post a message to the bridged channel.
    async fn send_message(&self, message: &Message) -> Result<(), SendError>;

    /// Current channel members, without the bot, sorted and deduplicated.
    async fn channel_users(&self) -> Result<Vec<String>, MembershipUnavailable>;
}
