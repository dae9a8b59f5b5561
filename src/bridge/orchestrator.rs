//! Bridge orchestrator that ties IRC and Slack together.
//!
//! Consumes both endpoints' events, intercepts commands, and relays
//! everything else to the opposite network.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::common::{EndpointEvent, Message, Network, PresenceEvent};
use crate::endpoint::Endpoint;

use super::commands::{format_user_list, is_command, BridgeCommand};

/// The main bridge that orchestrates message flow.
///
/// Holds one endpoint per network and nothing mutable, so dispatch can run
/// concurrently for both sides.
pub struct Bridge {
    irc: Arc<dyn Endpoint>,
    slack: Arc<dyn Endpoint>,
}

/// Tasks spawned by [`Bridge::start`].
pub struct BridgeTasks {
    /// Connection loops, one per network.
    pub endpoints: Vec<(Network, JoinHandle<()>)>,
    /// Event dispatch loops, one per network.
    pub dispatchers: Vec<JoinHandle<()>>,
}

impl Bridge {
    /// Create a new bridge over the two endpoints.
    pub fn new(irc: Arc<dyn Endpoint>, slack: Arc<dyn Endpoint>) -> Self {
        Self { irc, slack }
    }

    fn endpoint(&self, network: Network) -> &Arc<dyn Endpoint> {
        match network {
            Network::Irc => &self.irc,
            Network::Slack => &self.slack,
        }
    }

    /// Subscribe to both endpoints and spawn their connection loops.
    ///
    /// Subscriptions are made before the loops start so no early event is
    /// missed. An endpoint whose loop ends does not stop the other one.
    pub fn start(self: Arc<Self>, shutdown_rx: watch::Receiver<bool>) -> BridgeTasks {
        let mut endpoints = Vec::new();
        let mut dispatchers = Vec::new();

        for endpoint in [&self.irc, &self.slack] {
            let endpoint = Arc::clone(endpoint);
            let network = endpoint.network();

            let events = endpoint.subscribe();
            dispatchers.push(tokio::spawn(run_event_loop(Arc::clone(&self), network, events)));

            let shutdown_rx = shutdown_rx.clone();
            let task = tokio::spawn(async move {
                info!("Starting {} endpoint", network);
                match endpoint.run(shutdown_rx).await {
                    Ok(()) => info!("{} endpoint stopped", network),
                    Err(e) => error!("{} endpoint failed: {}", network, e),
                }
            });
            endpoints.push((network, task));
        }

        BridgeTasks {
            endpoints,
            dispatchers,
        }
    }

    /// Decide what to do with one event from `source`.
    pub async fn handle_event(&self, source: Network, event: EndpointEvent) {
        match event {
            EndpointEvent::MessagePosted(message) => {
                if is_command(&message.content) {
                    self.handle_command(source, &message).await;
                } else {
                    self.relay(source, &message).await;
                }
            }
            EndpointEvent::PresenceChanged(presence) => {
                self.relay_presence(source, presence).await;
            }
        }
    }

    /// Forward a user message unmodified to the other network.
    async fn relay(&self, source: Network, message: &Message) {
        let target = source.other();
        info!("{} -> {}: {}", source, target, message.render());

        if let Err(e) = self.endpoint(target).send_message(message).await {
            error!("Failed to relay message from {} to {}: {}", source, target, e);
        }
    }

    async fn relay_presence(&self, source: Network, presence: PresenceEvent) {
        let target = source.other();
        info!("{} -> {} (presence): {}", source, target, presence.description);

        let message = Message::anonymous(presence.description);
        if let Err(e) = self.endpoint(target).send_message(&message).await {
            error!("Failed to relay presence from {} to {}: {}", source, target, e);
        }
    }

    async fn handle_command(&self, source: Network, message: &Message) {
        let Some(command) = BridgeCommand::parse(&message.content) else {
            debug!("Ignoring unknown command from {}: {}", source, message.content);
            return;
        };

        debug!(
            "Processing {:?} from {} ({})",
            command,
            message.username.as_deref().unwrap_or("unknown"),
            source
        );

        match command {
            BridgeCommand::ListUsers => self.list_users(source).await,
        }
    }

    /// Answer `?listusers` on `source` with the other network's members.
    async fn list_users(&self, source: Network) {
        let target = source.other();

        let users = match self.endpoint(target).channel_users().await {
            Ok(users) => users,
            Err(e) => {
                warn!("Cannot answer ?listusers from {}: {}", source, e);
                return;
            }
        };

        let reply = Message::anonymous(format_user_list(target, &users));
        info!("{} (reply): {}", source, reply.content);

        if let Err(e) = self.endpoint(source).send_message(&reply).await {
            error!("Failed to send ?listusers reply to {}: {}", source, e);
        }
    }
}

/// Dispatch events from one endpoint, in arrival order.
async fn run_event_loop(
    bridge: Arc<Bridge>,
    source: Network,
    mut events: mpsc::UnboundedReceiver<EndpointEvent>,
) {
    debug!("Starting {} event loop", source);

    while let Some(event) = events.recv().await {
        bridge.handle_event(source, event).await;
    }

    warn!("{} event loop ended", source);
}
