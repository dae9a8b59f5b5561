//! Channel member list normalization shared by both endpoints.

use std::collections::BTreeSet;

use crate::common::error::MembershipUnavailable;

/// Turn raw member names into the list returned by `channel_users()`.
///
/// Drops the bot's own identity and empty names, deduplicates, and sorts
/// ascending. A list that is empty once the bot is removed is reported as
/// unavailable: it cannot be told apart from a query that returned nothing.
pub fn normalize_members<I, S>(names: I, own_identity: &str) -> Result<Vec<String>, MembershipUnavailable>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let members: BTreeSet<String> = names
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .filter(|name| !name.is_empty() && name != own_identity)
        .collect();

    if members.is_empty() {
        return Err(MembershipUnavailable::new("no members besides the bridge"));
    }

    Ok(members.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excludes_self_and_sorts() {
        let members = normalize_members(["dave", "bridgebot", "carol"], "bridgebot").unwrap();
        assert_eq!(members, vec!["carol", "dave"]);
    }

    #[test]
    fn test_deduplicates() {
        let members = normalize_members(["b", "a", "b", "a"], "bot").unwrap();
        assert_eq!(members, vec!["a", "b"]);
        assert!(members.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_only_self_is_unavailable() {
        assert!(normalize_members(["bot"], "bot").is_err());
        assert!(normalize_members(Vec::<String>::new(), "bot").is_err());
    }
}
