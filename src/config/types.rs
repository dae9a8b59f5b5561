//! Configuration type definitions.

use serde::Deserialize;

/// Root configuration structure.
///
/// Keys are flat and camel-cased (`ircNick`, `slackChannel`, ...) so that
/// plain `key = value` files keep working.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub irc_nick: String,
    #[serde(default)]
    pub irc_verbose: bool,
    pub irc_server: String,
    pub irc_port: u16,
    #[serde(default)]
    pub irc_password: Option<String>,
    pub irc_channel: String,
    pub slack_auth_token: String,
    pub slack_channel: String,
}

impl Config {
    /// Settings for the IRC endpoint.
    pub fn irc(&self) -> IrcConfig {
        IrcConfig {
            nick: self.irc_nick.clone(),
            verbose: self.irc_verbose,
            server: self.irc_server.clone(),
            port: self.irc_port,
            password: self.irc_password.clone().filter(|p| !p.is_empty()),
            channel: self.irc_channel.clone(),
        }
    }

    /// Settings for the Slack endpoint.
    pub fn slack(&self) -> SlackConfig {
        SlackConfig {
            auth_token: self.slack_auth_token.clone(),
            channel: self.slack_channel.clone(),
        }
    }
}

/// IRC server connection configuration.
#[derive(Debug, Clone)]
pub struct IrcConfig {
    pub nick: String,
    /// Log raw protocol lines at info level.
    pub verbose: bool,
    pub server: String,
    pub port: u16,
    /// Server password, sent with PASS when present.
    pub password: Option<String>,
    pub channel: String,
}

/// Slack workspace configuration.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub auth_token: String,
    /// Channel name, with or without the leading '#'.
    pub channel: String,
}
