//! In-band bridge commands (`?listusers`).
//!
//! Chat content starting with the command sigil is never relayed. Known
//! commands are answered on the network that asked; anything else is
//! dropped without a reply.

use crate::common::Network;

/// Prefix that marks chat content as a bridge command.
pub const COMMAND_SIGIL: char = '?';

/// Commands understood by the bridge, with the names that trigger them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeCommand {
    /// List the members of the other network's channel.
    ListUsers,
}

const COMMANDS: &[(&str, BridgeCommand)] = &[("listusers", BridgeCommand::ListUsers)];

impl BridgeCommand {
    /// Parse a sigil-prefixed message.
    ///
    /// A command matches when the text after the sigil starts with its name,
    /// ignoring ASCII case; whatever follows the name is ignored, so
    /// `?listusers please` and `?listusers!` both count.
    pub fn parse(content: &str) -> Option<Self> {
        let body = content.strip_prefix(COMMAND_SIGIL)?;

        COMMANDS.iter().find_map(|&(name, command)| {
            let head = body.get(..name.len())?;
            head.eq_ignore_ascii_case(name).then_some(command)
        })
    }
}

/// Whether the content must go through command processing instead of relay.
pub fn is_command(content: &str) -> bool {
    content.starts_with(COMMAND_SIGIL)
}

/// Reply text for `?listusers`: `Users in <Network>: a, b, c`.
pub fn format_user_list(network: Network, users: &[String]) -> String {
    format!("Users in {}: {}", network.display_name(), users.join(", "))
}
