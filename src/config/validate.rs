//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate IRC config
    if config.irc_nick.is_empty() {
        errors.push("ircNick is required".to_string());
    }
    if config.irc_nick.contains(char::is_whitespace) {
        errors.push(format!("ircNick '{}' must not contain whitespace", config.irc_nick));
    }
    if config.irc_server.is_empty() {
        errors.push("ircServer is required".to_string());
    }
    if config.irc_port == 0 {
        errors.push("ircPort must be non-zero".to_string());
    }
    if config.irc_channel.is_empty() {
        errors.push("ircChannel is required".to_string());
    } else if !config.irc_channel.starts_with(['#', '&']) {
        errors.push(format!(
            "ircChannel '{}' must start with '#' or '&' (quote it in the config file)",
            config.irc_channel
        ));
    }

    // Validate Slack config
    if config.slack_auth_token.is_empty() {
        errors.push("slackAuthToken is required".to_string());
    }
    if config.slack_auth_token == "YOUR_SLACK_TOKEN_HERE" {
        errors.push("slackAuthToken has not been configured (still using placeholder)".to_string());
    }
    if config.slack_channel.trim_start_matches('#').is_empty() {
        errors.push("slackChannel is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
