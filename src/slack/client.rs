//! Slack endpoint: an RTM websocket for events plus the Web API for
//! lookups and posting.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::common::error::{
    ConnectionError, ConnectionResult, MembershipUnavailable, SendError, SlackResult,
};
use crate::common::membership::normalize_members;
use crate::common::{EndpointEvent, Message, Network};
use crate::config::SlackConfig;
use crate::endpoint::{Endpoint, EventPublisher};
use crate::slack::api::SlackApi;
use crate::slack::presence::PresenceMatcher;
use crate::slack::text::{escape, unescape};

const PING_INTERVAL: Duration = Duration::from_secs(30);

type RtmSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Message subtypes that never reach the other network.
const IGNORED_SUBTYPES: &[&str] = &[
    "message_changed",
    "message_deleted",
    "message_replied",
    "bot_message",
];

/// One frame from the RTM stream. Only the fields the bridge reads.
#[derive(Debug, Deserialize)]
struct RtmEvent {
    #[serde(rename = "type")]
    kind: Option<String>,
    subtype: Option<String>,
    channel: Option<String>,
    user: Option<String>,
    text: Option<String>,
    error: Option<serde_json::Value>,
}

/// Identity and channel resolved when the RTM session opens.
#[derive(Debug, Clone)]
struct SlackSession {
    self_id: String,
    self_name: String,
    channel_id: String,
}

/// Slack side of the bridge.
pub struct SlackEndpoint {
    config: SlackConfig,
    api: SlackApi,
    publisher: EventPublisher,
    presence: PresenceMatcher,
    session: RwLock<Option<SlackSession>>,
    /// User id to display name, filled lazily from `users.info`.
    directory: RwLock<HashMap<String, String>>,
}

impl SlackEndpoint {
    pub fn new(config: SlackConfig) -> SlackResult<Self> {
        let api = SlackApi::new(config.auth_token.clone())?;
        Ok(Self {
            config,
            api,
            publisher: EventPublisher::new(),
            presence: PresenceMatcher::new(),
            session: RwLock::new(None),
            directory: RwLock::new(HashMap::new()),
        })
    }

    async fn set_session(&self, session: SlackSession) {
        self.directory
            .write()
            .await
            .insert(session.self_id.clone(), session.self_name.clone());
        *self.session.write().await = Some(session);
    }

    async fn connect_and_serve(&self, shutdown_rx: &mut watch::Receiver<bool>) -> ConnectionResult<()> {
        info!("Connecting to Slack");
        let rtm = self.api.rtm_connect().await?;
        let channel = self.api.find_channel(&self.config.channel).await?;
        info!(
            "Connected to Slack as {}, bridging #{} ({})",
            rtm.identity.name, channel.name, channel.id
        );

        self.set_session(SlackSession {
            self_id: rtm.identity.id,
            self_name: rtm.identity.name,
            channel_id: channel.id,
        })
        .await;

        let result = self.rtm_loop(&rtm.url, shutdown_rx).await;
        *self.session.write().await = None;
        result
    }

    async fn rtm_loop(&self, url: &str, shutdown_rx: &mut watch::Receiver<bool>) -> ConnectionResult<()> {
        let (socket, _) = connect_async(url).await?;
        debug!("Slack RTM websocket open");

        // Name lookups must not stall frame reads or pings.
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        tokio::select! {
            result = self.read_loop(socket, message_tx, shutdown_rx) => result,
            _ = self.translate_messages(message_rx) => Ok(()),
        }
    }

    async fn read_loop(
        &self,
        mut socket: RtmSocket,
        message_tx: mpsc::UnboundedSender<RtmEvent>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> ConnectionResult<()> {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.tick().await;
        let mut ping_id: u64 = 0;

        loop {
            tokio::select! {
                frame = socket.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => self.handle_rtm_event(&text, &message_tx)?,
                        Some(Ok(WsMessage::Close(frame))) => {
                            debug!("Slack closed the websocket: {:?}", frame);
                            return Err(ConnectionError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(ConnectionError::ConnectionClosed),
                    }
                }

                _ = ping.tick() => {
                    ping_id += 1;
                    let frame = json!({ "id": ping_id, "type": "ping" }).to_string();
                    socket.send(WsMessage::Text(frame)).await?;
                }

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Leaving Slack");
                        if let Err(e) = socket.close(None).await {
                            debug!("Websocket close failed: {}", e);
                        }
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Classify one RTM frame. Channel messages go to `message_tx` for
    /// translation; `goodbye` ends the session.
    fn handle_rtm_event(
        &self,
        frame: &str,
        message_tx: &mpsc::UnboundedSender<RtmEvent>,
    ) -> ConnectionResult<()> {
        let event: RtmEvent = match serde_json::from_str(frame) {
            Ok(event) => event,
            Err(e) => {
                debug!("Ignoring unparsable RTM frame: {}", e);
                return Ok(());
            }
        };

        match event.kind.as_deref() {
            Some("message") => {
                if message_tx.send(event).is_err() {
                    debug!("Dropping Slack message, translation has stopped");
                }
            }
            Some("goodbye") => return Err(ConnectionError::ConnectionClosed),
            Some("hello") => debug!("Slack RTM session ready"),
            Some("pong") => trace!("Slack pong"),
            Some("error") => warn!("Slack RTM error: {:?}", event.error),
            Some(other) => debug!("Unhandled Slack event {}", other),
            None => trace!("Slack reply without type"),
        }

        Ok(())
    }

    async fn translate_messages(&self, mut message_rx: mpsc::UnboundedReceiver<RtmEvent>) {
        while let Some(event) = message_rx.recv().await {
            self.on_message(event).await;
        }
    }

    async fn on_message(&self, event: RtmEvent) {
        let Some(session) = self.session.read().await.clone() else {
            return;
        };
        if event.channel.as_deref() != Some(session.channel_id.as_str()) {
            return;
        }
        if let Some(subtype) = event.subtype.as_deref() {
            if IGNORED_SUBTYPES.contains(&subtype) {
                debug!("Ignoring Slack {} event", subtype);
                return;
            }
        }

        let (Some(user_id), Some(text)) = (event.user, event.text) else {
            return;
        };
        if user_id == session.self_id {
            return;
        }

        if let Some(notice) = self.presence.detect(&text) {
            self.publisher
                .publish(EndpointEvent::PresenceChanged(notice.to_event()));
            return;
        }

        let content = unescape(&text);
        if content.trim().is_empty() {
            return;
        }

        let username = self.username_for(&user_id).await;
        self.publisher
            .publish(EndpointEvent::MessagePosted(Message::from_user(username, content)));
    }

    /// Display name for a user id; falls back to the id on lookup failure.
    async fn username_for(&self, user_id: &str) -> String {
        if let Some(name) = self.directory.read().await.get(user_id) {
            return name.clone();
        }

        match self.api.user_info(user_id).await {
            Ok(user) => {
                self.directory
                    .write()
                    .await
                    .insert(user_id.to_string(), user.name.clone());
                user.name
            }
            Err(e) => {
                warn!("Failed to look up Slack user {}: {}", user_id, e);
                user_id.to_string()
            }
        }
    }
}

#[async_trait]
impl Endpoint for SlackEndpoint {
    fn network(&self) -> Network {
        Network::Slack
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<EndpointEvent> {
        self.publisher.subscribe()
    }

    async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> ConnectionResult<()> {
        let result = self.connect_and_serve(&mut shutdown_rx).await;
        if let Err(ref e) = result {
            error!("Slack connection ended: {}", e);
        }
        result
    }

    async fn send_message(&self, message: &Message) -> Result<(), SendError> {
        let channel_id = match *self.session.read().await {
            Some(ref session) => session.channel_id.clone(),
            None => return Err(SendError::NotConnected),
        };

        self.api.post_message(&channel_id, &escape(&message.render())).await?;
        Ok(())
    }

    async fn channel_users(&self) -> Result<Vec<String>, MembershipUnavailable> {
        let session = self
            .session
            .read()
            .await
            .clone()
            .ok_or_else(|| MembershipUnavailable::new("not connected to Slack"))?;

        let member_ids = self
            .api
            .channel_members(&session.channel_id)
            .await
            .map_err(|e| MembershipUnavailable::new(e.to_string()))?;

        let mut names = Vec::with_capacity(member_ids.len());
        for id in &member_ids {
            names.push(self.username_for(id).await);
        }

        normalize_members(names, &session.self_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PresenceEvent;
    use tokio_test::assert_ok;

    async fn connected_endpoint() -> (SlackEndpoint, mpsc::UnboundedReceiver<EndpointEvent>) {
        let endpoint = SlackEndpoint::new(SlackConfig {
            auth_token: "xoxb-test".to_string(),
            channel: "#general".to_string(),
        })
        .unwrap();

        endpoint
            .set_session(SlackSession {
                self_id: "UBOT".to_string(),
                self_name: "bridgebot".to_string(),
                channel_id: "C1".to_string(),
            })
            .await;
        endpoint
            .directory
            .write()
            .await
            .insert("U1".to_string(), "alice".to_string());

        let events = endpoint.subscribe();
        (endpoint, events)
    }

    /// Dispatch one frame and translate whatever it forwarded.
    async fn feed(endpoint: &SlackEndpoint, frame: &str) -> ConnectionResult<()> {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        endpoint.handle_rtm_event(frame, &message_tx)?;
        drop(message_tx);
        endpoint.translate_messages(message_rx).await;
        Ok(())
    }

    fn message_frame(user: &str, channel: &str, text: &str) -> String {
        json!({ "type": "message", "user": user, "channel": channel, "text": text }).to_string()
    }

    #[tokio::test]
    async fn test_channel_message_published() {
        let (endpoint, mut events) = connected_endpoint().await;

        feed(&endpoint, &message_frame("U1", "C1", "hello"))
            .await
            .unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            EndpointEvent::MessagePosted(Message::from_user("alice", "hello"))
        );
    }

    #[tokio::test]
    async fn test_entities_unescaped() {
        let (endpoint, mut events) = connected_endpoint().await;

        feed(&endpoint, &message_frame("U1", "C1", "&lt;b&gt; x &amp; y"))
            .await
            .unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            EndpointEvent::MessagePosted(Message::from_user("alice", "<b> x & y"))
        );
    }

    #[tokio::test]
    async fn test_filtered_messages() {
        let (endpoint, mut events) = connected_endpoint().await;

        let frames = [
            message_frame("UBOT", "C1", "<alice> echoed"),
            message_frame("U1", "C2", "other channel"),
            message_frame("U1", "C1", "   "),
            json!({ "type": "message", "subtype": "message_changed", "channel": "C1" }).to_string(),
            json!({ "type": "message", "subtype": "bot_message", "channel": "C1", "text": "x" })
                .to_string(),
            json!({ "type": "user_typing", "channel": "C1", "user": "U1" }).to_string(),
            "not json".to_string(),
        ];
        for frame in &frames {
            assert_ok!(feed(&endpoint, frame).await);
        }

        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_join_becomes_presence() {
        let (endpoint, mut events) = connected_endpoint().await;

        let frame = json!({
            "type": "message",
            "subtype": "group_join",
            "user": "U123",
            "channel": "C1",
            "text": "<@U123|Alice> has joined the group"
        })
        .to_string();
        assert_ok!(feed(&endpoint, &frame).await);

        assert_eq!(
            events.try_recv().unwrap(),
            EndpointEvent::PresenceChanged(PresenceEvent::new("Alice has joined Slack."))
        );
    }

    #[tokio::test]
    async fn test_has_in_ordinary_text_stays_a_message() {
        let (endpoint, mut events) = connected_endpoint().await;

        feed(&endpoint, &message_frame("U1", "C1", "hello, has anyone seen the group chat?"))
            .await
            .unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            EndpointEvent::MessagePosted(Message::from_user(
                "alice",
                "hello, has anyone seen the group chat?"
            ))
        );
    }

    #[tokio::test]
    async fn test_unknown_user_does_not_hold_up_frames() {
        let (endpoint, mut events) = connected_endpoint().await;
        let (message_tx, mut message_rx) = mpsc::unbounded_channel();

        assert_ok!(endpoint.handle_rtm_event(&message_frame("U404", "C1", "hi"), &message_tx));
        assert_ok!(endpoint.handle_rtm_event(r#"{"type":"pong","reply_to":1}"#, &message_tx));

        let forwarded = message_rx.try_recv().unwrap();
        assert_eq!(forwarded.user.as_deref(), Some("U404"));
        assert!(message_rx.try_recv().is_err());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_goodbye_ends_connection() {
        let (endpoint, _events) = connected_endpoint().await;

        let result = feed(&endpoint, r#"{"type":"goodbye"}"#).await;
        assert!(matches!(result, Err(ConnectionError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_disconnected_endpoint() {
        let endpoint = SlackEndpoint::new(SlackConfig {
            auth_token: "xoxb-test".to_string(),
            channel: "general".to_string(),
        })
        .unwrap();

        let sent = endpoint.send_message(&Message::from_user("bob", "hi")).await;
        assert!(matches!(sent, Err(SendError::NotConnected)));
        assert!(endpoint.channel_users().await.is_err());
    }
}
