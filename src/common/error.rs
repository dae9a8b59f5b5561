//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors that end an endpoint's connection loop.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Nickname '{nick}' is already in use")]
    NickInUse { nick: String },

    #[error("Authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("Server rejected the connection: {reason}")]
    Rejected { reason: String },

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while posting a message to a network.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Endpoint is not connected")]
    NotConnected,

    #[error("Outgoing queue is full ({limit} lines pending)")]
    QueueFull { limit: usize },

    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),
}

/// Slack Web API errors.
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed Slack reply: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Slack API call '{method}' failed: {error}")]
    Api { method: String, error: String },

    #[error("Slack API reply to '{method}' is missing '{field}'")]
    MissingField { method: String, field: String },

    #[error("Channel not found: {name}")]
    ChannelNotFound { name: String },
}

/// The member list of a channel could not be determined.
///
/// Callers must treat this as "unknown", never as "empty".
#[derive(Debug, Error)]
#[error("Channel membership unavailable: {reason}")]
pub struct MembershipUnavailable {
    pub reason: String,
}

impl MembershipUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Result type alias for connection operations.
pub type ConnectionResult<T> = std::result::Result<T, ConnectionError>;

/// Result type alias for Slack Web API operations.
pub type SlackResult<T> = std::result::Result<T, SlackError>;
