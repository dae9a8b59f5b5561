//! Canonical message types for bridge communication.
//!
//! Both endpoints translate their network's notifications into these
//! types before anything reaches the bridge.

use std::fmt;

/// The two networks joined by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Irc,
    Slack,
}

impl Network {
    /// Name shown to users, e.g. in `?listusers` replies.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Irc => "IRC",
            Self::Slack => "Slack",
        }
    }

    /// The network on the other side of the bridge.
    pub fn other(&self) -> Self {
        match self {
            Self::Irc => Self::Slack,
            Self::Slack => Self::Irc,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A chat message flowing through the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender's name (None for system messages and command replies).
    pub username: Option<String>,
    /// Message content.
    pub content: String,
}

impl Message {
    /// A message attributed to a user.
    pub fn from_user(username: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            content: content.into(),
        }
    }

    /// A message with no attributable sender.
    pub fn anonymous(content: impl Into<String>) -> Self {
        Self {
            username: None,
            content: content.into(),
        }
    }

    /// Plain-text form used by both networks: `<username> content`.
    pub fn render(&self) -> String {
        match self.username {
            Some(ref username) => format!("<{}> {}", username, self.content),
            None => self.content.clone(),
        }
    }
}

/// A synthesized join/leave notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEvent {
    pub description: String,
}

impl PresenceEvent {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Everything an endpoint reports to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointEvent {
    /// A user posted a message in the bridged channel.
    MessagePosted(Message),
    /// Someone joined or left the bridged channel.
    PresenceChanged(PresenceEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_username() {
        let msg = Message::from_user("bob", "hi there");
        assert_eq!(msg.render(), "<bob> hi there");
    }

    #[test]
    fn test_render_anonymous() {
        let msg = Message::anonymous("Users in IRC: carol, dave");
        assert_eq!(msg.render(), "Users in IRC: carol, dave");
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = Message::from_user("alice", "first");
        let snapshot = original.clone();
        assert_eq!(snapshot, original);

        original.username = Some("mallory".to_string());
        original.content.push_str(" edited");

        assert_eq!(snapshot.username.as_deref(), Some("alice"));
        assert_eq!(snapshot.content, "first");
        assert_ne!(snapshot, original);
    }

    #[test]
    fn test_network_other() {
        assert_eq!(Network::Irc.other(), Network::Slack);
        assert_eq!(Network::Slack.other(), Network::Irc);
        assert_eq!(Network::Slack.to_string(), "Slack");
    }
}
