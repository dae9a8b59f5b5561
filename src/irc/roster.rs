//! Channel member tracking from NAMES replies and membership events.

use std::collections::BTreeSet;

/// Status prefixes a server may put in front of a nick in RPL_NAMREPLY.
const MEMBER_PREFIXES: [char; 5] = ['~', '&', '@', '%', '+'];

/// Members of the bridged IRC channel, as seen by the connection.
#[derive(Debug, Default)]
pub struct ChannelRoster {
    members: BTreeSet<String>,
    /// Names collected from 353 replies until the closing 366.
    incoming: BTreeSet<String>,
    /// Whether a full NAMES listing has been received.
    synced: bool,
}

impl ChannelRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect names from one RPL_NAMREPLY line.
    pub fn add_names(&mut self, names: &str) {
        self.incoming.extend(
            names
                .split_whitespace()
                .map(|name| name.trim_start_matches(MEMBER_PREFIXES))
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
    }

    /// RPL_ENDOFNAMES: the collected names replace the roster.
    pub fn finish_names(&mut self) {
        self.members = std::mem::take(&mut self.incoming);
        self.synced = true;
    }

    pub fn add(&mut self, nick: &str) {
        self.members.insert(nick.to_string());
    }

    /// Remove a nick; returns whether it was a member.
    pub fn remove(&mut self, nick: &str) -> bool {
        self.members.remove(nick)
    }

    pub fn rename(&mut self, old: &str, new: &str) {
        if self.members.remove(old) {
            self.members.insert(new.to_string());
        }
    }

    /// Forget everything, e.g. after leaving the channel.
    pub fn clear(&mut self) {
        self.members.clear();
        self.incoming.clear();
        self.synced = false;
    }

    /// Current members, or `None` before the first complete NAMES listing.
    pub fn snapshot(&self) -> Option<Vec<String>> {
        self.synced.then(|| self.members.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsynced_roster_has_no_snapshot() {
        let mut roster = ChannelRoster::new();
        roster.add_names("carol dave");
        assert!(roster.snapshot().is_none());
    }

    #[test]
    fn test_names_strip_prefixes() {
        let mut roster = ChannelRoster::new();
        roster.add_names("@carol +dave");
        roster.add_names("~erin bridgebot");
        roster.finish_names();

        assert_eq!(
            roster.snapshot().unwrap(),
            vec!["bridgebot", "carol", "dave", "erin"]
        );
    }

    #[test]
    fn test_membership_changes() {
        let mut roster = ChannelRoster::new();
        roster.add_names("carol dave");
        roster.finish_names();

        roster.add("erin");
        assert!(roster.remove("dave"));
        assert!(!roster.remove("nobody"));
        roster.rename("carol", "caroline");

        assert_eq!(roster.snapshot().unwrap(), vec!["caroline", "erin"]);
    }

    #[test]
    fn test_clear_resets_sync() {
        let mut roster = ChannelRoster::new();
        roster.finish_names();
        assert!(roster.snapshot().is_some());

        roster.clear();
        assert!(roster.snapshot().is_none());
    }
}
