//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `SLACK2IRC_SLACK_TOKEN` - Slack auth token
//! - `SLACK2IRC_IRC_PASSWORD` - IRC server password
//! - `SLACK2IRC_IRC_NICK` - IRC nickname
//! - `SLACK2IRC_IRC_SERVER` - IRC server host
//! - `SLACK2IRC_IRC_PORT` - IRC server port

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "SLACK2IRC";

/// Apply environment variable overrides to a config.
///
/// This allows secrets like the Slack token to be kept out of the
/// config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_SLACK_TOKEN", ENV_PREFIX)) {
        config.slack_auth_token = token;
    }

    if let Ok(password) = env::var(format!("{}_IRC_PASSWORD", ENV_PREFIX)) {
        config.irc_password = Some(password);
    }
    if let Ok(nick) = env::var(format!("{}_IRC_NICK", ENV_PREFIX)) {
        config.irc_nick = nick;
    }
    if let Ok(server) = env::var(format!("{}_IRC_SERVER", ENV_PREFIX)) {
        config.irc_server = server;
    }
    if let Ok(port) = env::var(format!("{}_IRC_PORT", ENV_PREFIX)) {
        if let Ok(port) = port.parse() {
            config.irc_port = port;
        }
    }

    config
}

/// Extract the config path from the command line.
///
/// Exactly one argument of the form `--config=<path>` is accepted; any
/// other shape yields `None`.
pub fn config_path_from_args<I>(args: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let arg = args.next()?;
    if args.next().is_some() {
        return None;
    }

    arg.strip_prefix("--config=")
        .filter(|path| !path.is_empty())
        .map(str::to_string)
}

/// Usage lines printed for any unsupported invocation.
pub fn usage() -> [String; 2] {
    let bin = env!("CARGO_PKG_NAME");
    [
        format!("Usage: {} --config=<configFile>", bin),
        format!("Example: {} --config=slack2irc.conf", bin),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_config() -> Config {
        Config {
            irc_nick: "bridgebot".to_string(),
            irc_verbose: false,
            irc_server: "irc.example.net".to_string(),
            irc_port: 6667,
            irc_password: None,
            irc_channel: "#chat".to_string(),
            slack_auth_token: "original_token".to_string(),
            slack_channel: "chat".to_string(),
        }
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "SLACK2IRC");
    }

    #[test]
    fn test_apply_env_overrides_no_vars() {
        env::remove_var("SLACK2IRC_SLACK_TOKEN");
        env::remove_var("SLACK2IRC_IRC_NICK");

        let config = make_test_config();
        let result = apply_env_overrides(config);

        assert_eq!(result.slack_auth_token, "original_token");
        assert_eq!(result.irc_nick, "bridgebot");
    }

    #[test]
    fn test_config_arg() {
        let args = vec!["--config=slack2irc.conf".to_string()];
        assert_eq!(config_path_from_args(args).as_deref(), Some("slack2irc.conf"));
    }

    #[test]
    fn test_config_arg_rejects_other_shapes() {
        assert!(config_path_from_args(Vec::<String>::new()).is_none());
        assert!(config_path_from_args(vec!["--config=".to_string()]).is_none());
        assert!(config_path_from_args(vec!["-c".to_string(), "x.conf".to_string()]).is_none());
        assert!(config_path_from_args(vec![
            "--config=a.conf".to_string(),
            "--config=b.conf".to_string(),
        ])
        .is_none());
    }

    #[test]
    fn test_usage_has_two_lines() {
        let [usage, example] = usage();
        assert!(usage.starts_with("Usage:"));
        assert!(example.contains("--config="));
    }
}
