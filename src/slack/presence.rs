//! Join/leave detection in Slack message text.
//!
//! Slack reports people joining or leaving a channel as ordinary messages
//! such as `<@U123|alice> has joined the channel`. Those are turned into
//! presence events; everything else stays a chat message.

use fancy_regex::Regex;
use tracing::warn;

use crate::common::PresenceEvent;

/// Matches the whole notification shape, anchored at the start of the text.
const PRESENCE_PATTERN: &str =
    r"^<@(?P<id>\w+)\|(?P<name>[^>|]+)>\s+has\s+(?P<verb>\w+)\s+the\s+(?P<noun>group|channel)\b";

/// A parsed join/leave notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceNotice {
    pub user_id: String,
    pub name: String,
    pub verb: String,
    pub noun: String,
}

impl PresenceNotice {
    /// Description relayed to the other network.
    pub fn to_event(&self) -> PresenceEvent {
        PresenceEvent::new(format!("{} has {} Slack.", self.name, self.verb))
    }
}

/// Recognizes Slack membership notifications.
#[derive(Debug, Clone)]
pub struct PresenceMatcher {
    pattern: Regex,
}

impl Default for PresenceMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceMatcher {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(PRESENCE_PATTERN).unwrap(),
        }
    }

    /// Parse `text` as a membership notification.
    pub fn detect(&self, text: &str) -> Option<PresenceNotice> {
        let captures = match self.pattern.captures(text) {
            Ok(captures) => captures?,
            Err(e) => {
                warn!("Presence pattern failed on '{}': {}", text, e);
                return None;
            }
        };

        let group = |name: &str| captures.name(name).map(|m| m.as_str().to_string());
        Some(PresenceNotice {
            user_id: group("id")?,
            name: group("name")?,
            verb: group("verb")?,
            noun: group("noun")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_join() {
        let matcher = PresenceMatcher::new();
        let notice = matcher.detect("<@U123|Alice> has joined the group").unwrap();

        assert_eq!(notice.user_id, "U123");
        assert_eq!(notice.name, "Alice");
        assert_eq!(notice.verb, "joined");
        assert_eq!(notice.noun, "group");
        assert_eq!(notice.to_event(), PresenceEvent::new("Alice has joined Slack."));
    }

    #[test]
    fn test_channel_leave() {
        let matcher = PresenceMatcher::new();
        let notice = matcher.detect("<@U0G9QF9C6|bob> has left the channel").unwrap();
        assert_eq!(notice.to_event().description, "bob has left Slack.");
    }

    #[test]
    fn test_plain_text_with_has_is_not_presence() {
        let matcher = PresenceMatcher::new();
        assert!(matcher.detect("hello, has anyone seen the group chat?").is_none());
        assert!(matcher.detect("bob has joined the group").is_none());
    }

    #[test]
    fn test_partial_structures_do_not_match() {
        let matcher = PresenceMatcher::new();
        // mention without a display name
        assert!(matcher.detect("<@U123> has joined the group").is_none());
        // wrong noun
        assert!(matcher.detect("<@U123|Alice> has joined the party").is_none());
        // not at the start
        assert!(matcher.detect("fyi <@U123|Alice> has left the channel").is_none());
        // noun must be a whole word
        assert!(matcher.detect("<@U123|Alice> has joined the groupies").is_none());
    }
}
