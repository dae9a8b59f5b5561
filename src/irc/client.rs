//! IRC endpoint: one connection, one channel.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, trace, warn};

use crate::common::error::{ConnectionError, ConnectionResult, MembershipUnavailable, SendError};
use crate::common::membership::normalize_members;
use crate::common::{EndpointEvent, Message, Network, PresenceEvent};
use crate::config::IrcConfig;
use crate::endpoint::{Endpoint, EventPublisher};
use crate::irc::codec::{new_irc_connection, IrcConnection};
use crate::irc::message::IrcMessage;
use crate::irc::roster::ChannelRoster;
use crate::irc::split::split_for_irc;

/// Maximum IRC line length including CRLF.
const MAX_LINE_BYTES: usize = 512;

/// Room left for the `:nick!user@host ` prefix the server adds on relay.
const HOSTMASK_ALLOWANCE: usize = 64;

const QUIT_MESSAGE: &str = "Bridge shutting down";

/// Marker byte framing CTCP requests inside PRIVMSG.
const CTCP_DELIM: char = '\u{1}';

/// Lines that may wait for the channel join before sends are refused.
const MAX_PENDING_LINES: usize = 256;

/// IRC side of the bridge.
pub struct IrcEndpoint {
    config: IrcConfig,
    publisher: EventPublisher,
    roster: Mutex<ChannelRoster>,
    /// Outbound PRIVMSG payloads, drained once the channel is joined.
    /// The receiver is dropped when the connection ends, which closes the
    /// queue for good.
    outgoing_tx: mpsc::Sender<String>,
    outgoing_rx: Mutex<Option<mpsc::Receiver<String>>>,
}

impl IrcEndpoint {
    pub fn new(config: IrcConfig) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::channel(MAX_PENDING_LINES);
        Self {
            config,
            publisher: EventPublisher::new(),
            roster: Mutex::new(ChannelRoster::new()),
            outgoing_tx,
            outgoing_rx: Mutex::new(Some(outgoing_rx)),
        }
    }

    fn is_self(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.config.nick)
    }

    fn is_our_channel(&self, channel: &str) -> bool {
        channel.eq_ignore_ascii_case(&self.config.channel)
    }

    /// Payload budget for one PRIVMSG to the configured channel.
    fn max_payload(&self) -> usize {
        let overhead = "PRIVMSG  :\r\n".len()
            + self.config.channel.len()
            + self.config.nick.len()
            + HOSTMASK_ALLOWANCE;
        MAX_LINE_BYTES.saturating_sub(overhead)
    }

    /// Refuse further sends; nothing will drain the queue again.
    async fn close_outgoing(&self) {
        if let Some(mut outgoing_rx) = self.outgoing_rx.lock().await.take() {
            outgoing_rx.close();
        }
    }

    /// Run the protocol over an established stream.
    ///
    /// An endpoint serves one connection; once this returns, sends fail
    /// with [`SendError::NotConnected`].
    pub async fn handle_connection<S>(
        &self,
        stream: S,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> ConnectionResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut outgoing_rx = self.outgoing_rx.lock().await.take().ok_or_else(|| {
            ConnectionError::Protocol {
                message: "IRC connection has already been used".to_string(),
            }
        })?;

        let mut connection = new_irc_connection(stream);
        let result = self
            .connection_loop(&mut connection, &mut outgoing_rx, &mut shutdown_rx)
            .await;

        outgoing_rx.close();
        self.roster.lock().await.clear();
        result
    }

    async fn connection_loop<S>(
        &self,
        connection: &mut IrcConnection<S>,
        outgoing_rx: &mut mpsc::Receiver<String>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> ConnectionResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        self.register(connection).await?;
        let mut joined = false;

        loop {
            tokio::select! {
                message = connection.next() => {
                    match message {
                        Some(Ok(message)) => {
                            self.log_line("<<", &message);
                            self.handle_message(connection, message, &mut joined).await?;
                        }
                        Some(Err(e)) => return Err(e),
                        None => return Err(ConnectionError::ConnectionClosed),
                    }
                }

                // Outgoing chat, held back until the channel is joined
                Some(text) = outgoing_rx.recv(), if joined => {
                    let privmsg = IrcMessage::new("PRIVMSG", [self.config.channel.as_str(), text.as_str()]);
                    self.write(connection, privmsg).await?;
                }

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Leaving IRC");
                        self.write(connection, IrcMessage::new("QUIT", [QUIT_MESSAGE])).await?;
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn register<S>(&self, connection: &mut IrcConnection<S>) -> ConnectionResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let nick = self.config.nick.as_str();

        if let Some(ref password) = self.config.password {
            self.write(connection, IrcMessage::new("PASS", [password.as_str()])).await?;
        }
        self.write(connection, IrcMessage::new("NICK", [nick])).await?;
        self.write(connection, IrcMessage::new("USER", [nick, "0", "*", nick])).await
    }

    async fn handle_message<S>(
        &self,
        connection: &mut IrcConnection<S>,
        message: IrcMessage,
        joined: &mut bool,
    ) -> ConnectionResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        match message.command.as_str() {
            "PING" => {
                let pong = IrcMessage::new("PONG", message.params.clone());
                self.write(connection, pong).await?;
            }
            "001" => {
                info!("Registered with IRC server as {}", self.config.nick);
                self.write(connection, IrcMessage::new("JOIN", [self.config.channel.as_str()])).await?;
            }
            "433" => {
                return Err(ConnectionError::NickInUse {
                    nick: self.config.nick.clone(),
                });
            }
            "464" => {
                return Err(ConnectionError::AuthFailed {
                    reason: message.trailing().unwrap_or("password incorrect").to_string(),
                });
            }
            "ERROR" => {
                return Err(ConnectionError::Rejected {
                    reason: message.trailing().unwrap_or_default().to_string(),
                });
            }
            "353" => {
                if message.param(2).is_some_and(|c| self.is_our_channel(c)) {
                    if let Some(names) = message.param(3) {
                        self.roster.lock().await.add_names(names);
                    }
                }
            }
            "366" => {
                if message.param(1).is_some_and(|c| self.is_our_channel(c)) {
                    self.roster.lock().await.finish_names();
                }
            }
            "JOIN" => self.on_join(&message, joined).await,
            "PART" => self.on_part(&message, joined).await,
            "QUIT" => self.on_quit(&message).await,
            "KICK" => self.on_kick(&message, joined).await?,
            "NICK" => {
                if let (Some(old), Some(new)) = (message.nick(), message.param(0)) {
                    self.roster.lock().await.rename(old, new);
                }
            }
            "PRIVMSG" => self.on_privmsg(&message),
            _ => {
                trace!("Unhandled IRC command {}", message.command);
            }
        }

        Ok(())
    }

    async fn on_join(&self, message: &IrcMessage, joined: &mut bool) {
        let (Some(nick), Some(channel)) = (message.nick(), message.param(0)) else {
            return;
        };
        if !self.is_our_channel(channel) {
            return;
        }

        if self.is_self(nick) {
            info!("Joined IRC channel {}", channel);
            *joined = true;
            return;
        }

        self.roster.lock().await.add(nick);
        self.publish_presence(format!("{} has joined IRC.", nick));
    }

    async fn on_part(&self, message: &IrcMessage, joined: &mut bool) {
        let (Some(nick), Some(channel)) = (message.nick(), message.param(0)) else {
            return;
        };
        if !self.is_our_channel(channel) {
            return;
        }

        if self.is_self(nick) {
            warn!("Left IRC channel {}", channel);
            *joined = false;
            self.roster.lock().await.clear();
            return;
        }

        self.roster.lock().await.remove(nick);
        self.publish_presence(format!("{} has parted IRC.", nick));
    }

    async fn on_quit(&self, message: &IrcMessage) {
        let Some(nick) = message.nick() else {
            return;
        };
        if self.is_self(nick) {
            return;
        }

        self.roster.lock().await.remove(nick);
        self.publish_presence(format!("{} has quit IRC.", nick));
    }

    async fn on_kick(&self, message: &IrcMessage, joined: &mut bool) -> ConnectionResult<()> {
        let (Some(channel), Some(target)) = (message.param(0), message.param(1)) else {
            return Ok(());
        };
        if !self.is_our_channel(channel) {
            return Ok(());
        }

        if self.is_self(target) {
            *joined = false;
            self.roster.lock().await.clear();
            return Err(ConnectionError::Rejected {
                reason: format!("kicked from {}", channel),
            });
        }

        self.roster.lock().await.remove(target);
        Ok(())
    }

    fn on_privmsg(&self, message: &IrcMessage) {
        let (Some(sender), Some(target), Some(text)) =
            (message.nick(), message.param(0), message.param(1))
        else {
            return;
        };

        if !self.is_our_channel(target) {
            debug!("Ignoring private message from {}", sender);
            return;
        }
        if self.is_self(sender) {
            return;
        }

        let content = match text.strip_prefix(CTCP_DELIM) {
            Some(ctcp) => {
                let ctcp = ctcp.trim_end_matches(CTCP_DELIM);
                match ctcp.strip_prefix("ACTION ") {
                    Some(action) => format!("* {}", action),
                    None => {
                        debug!("Dropping CTCP {} from {}", ctcp, sender);
                        return;
                    }
                }
            }
            None => text.to_string(),
        };

        if content.trim().is_empty() {
            return;
        }

        self.publisher
            .publish(EndpointEvent::MessagePosted(Message::from_user(sender, content)));
    }

    fn publish_presence(&self, description: String) {
        self.publisher
            .publish(EndpointEvent::PresenceChanged(PresenceEvent::new(description)));
    }

    async fn write<S>(&self, connection: &mut IrcConnection<S>, message: IrcMessage) -> ConnectionResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        self.log_line(">>", &message);
        connection.send(message).await
    }

    fn log_line(&self, direction: &str, message: &IrcMessage) {
        let line = if message.command == "PASS" {
            "PASS ********".to_string()
        } else {
            message.to_string()
        };

        if self.config.verbose {
            info!("{} {}", direction, line);
        } else {
            trace!("{} {}", direction, line);
        }
    }
}

#[async_trait]
impl Endpoint for IrcEndpoint {
    fn network(&self) -> Network {
        Network::Irc
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<EndpointEvent> {
        self.publisher.subscribe()
    }

    async fn run(&self, shutdown_rx: watch::Receiver<bool>) -> ConnectionResult<()> {
        let host = self.config.server.as_str();
        let port = self.config.port;
        info!("Connecting to IRC server {}:{}", host, port);

        let result = match TcpStream::connect((host, port)).await {
            Ok(stream) => self.handle_connection(stream, shutdown_rx).await,
            Err(e) => {
                self.close_outgoing().await;
                Err(ConnectionError::ConnectFailed {
                    host: host.to_string(),
                    port,
                    source: e,
                })
            }
        };
        if let Err(ref e) = result {
            error!("IRC connection ended: {}", e);
        }
        result
    }

    async fn send_message(&self, message: &Message) -> Result<(), SendError> {
        if self.outgoing_tx.is_closed() {
            return Err(SendError::NotConnected);
        }

        let lines = split_for_irc(&message.render(), self.max_payload());
        if lines.len() > self.outgoing_tx.capacity() {
            return Err(SendError::QueueFull {
                limit: MAX_PENDING_LINES,
            });
        }

        for line in lines {
            self.outgoing_tx.try_send(line).map_err(|e| match e {
                TrySendError::Full(_) => SendError::QueueFull {
                    limit: MAX_PENDING_LINES,
                },
                TrySendError::Closed(_) => SendError::NotConnected,
            })?;
        }
        Ok(())
    }

    async fn channel_users(&self) -> Result<Vec<String>, MembershipUnavailable> {
        let members = self
            .roster
            .lock()
            .await
            .snapshot()
            .ok_or_else(|| MembershipUnavailable::new("IRC channel names not received yet"))?;

        normalize_members(members, &self.config.nick)
    }
}
