//! Blacklist/whitelist matching.
//!
//! Matching is exact and case-sensitive against list members. Each list is
//! typed by the user as a text block, one entry per line.

use serde::{Deserialize, Serialize};

/// The four name lists, replaced wholesale on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterLists {
    /// Clans to target.
    pub black_clan: Vec<String>,
    /// Nicks to target.
    pub black_nick: Vec<String>,
    /// Clans to spare. Wins over the blacklists.
    pub white_clan: Vec<String>,
    /// Nicks to spare. Wins over the blacklists.
    pub white_nick: Vec<String>,
}

impl FilterLists {
    /// Build lists from four newline-separated text blocks.
    #[must_use]
    pub fn from_blocks(
        black_clan: &str,
        black_nick: &str,
        white_clan: &str,
        white_nick: &str,
    ) -> Self {
        Self {
            black_clan: split_block(black_clan),
            black_nick: split_block(black_nick),
            white_clan: split_block(white_clan),
            white_nick: split_block(white_nick),
        }
    }

    /// Whether the nick or clan is whitelisted.
    #[must_use]
    pub fn is_whitelisted(&self, nick: &str, clan: &str) -> bool {
        contains(&self.white_nick, nick) || contains(&self.white_clan, clan)
    }

    /// Whether the nick or clan is blacklisted.
    #[must_use]
    pub fn is_blacklisted(&self, nick: &str, clan: &str) -> bool {
        contains(&self.black_nick, nick) || contains(&self.black_clan, clan)
    }

    /// Decide whether a participant should be targeted.
    ///
    /// `target_all` short-circuits to `true`. Otherwise the whitelist wins,
    /// then the blacklist, and anyone on neither list is left alone.
    #[must_use]
    pub fn should_target(&self, target_all: bool, nick: &str, clan: &str) -> bool {
        if target_all {
            return true;
        }
        if self.is_whitelisted(nick, clan) {
            return false;
        }
        self.is_blacklisted(nick, clan)
    }
}

/// Split a user text block into trimmed, non-empty lines.
#[must_use]
pub fn split_block(block: &str) -> Vec<String> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

// Participants without a clan send an empty tag; it never matches a list.
fn contains(list: &[String], value: &str) -> bool {
    !value.is_empty() && list.iter().any(|entry| entry == value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_block_trims_and_drops_blanks() {
        assert_eq!(
            split_block("  Evil \n\n\tBad\r\n   \n"),
            vec!["Evil".to_string(), "Bad".to_string()]
        );
        assert!(split_block("").is_empty());
    }

    #[test]
    fn test_whitelist_wins_over_blacklist() {
        let filters = FilterLists {
            black_nick: vec!["Evil".to_string()],
            white_clan: vec!["Allies".to_string()],
            ..FilterLists::default()
        };

        assert!(!filters.should_target(false, "Evil", "Allies"));
        assert!(filters.should_target(false, "Evil", ""));
        assert!(!filters.should_target(false, "Nice", ""));
    }

    #[test]
    fn test_target_all_ignores_filters() {
        let filters = FilterLists::from_blocks("", "", "Allies", "Friend");
        assert!(filters.should_target(true, "Friend", "Allies"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let filters = FilterLists::from_blocks("", "Evil", "", "");
        assert!(filters.should_target(false, "Evil", ""));
        assert!(!filters.should_target(false, "evil", ""));
    }

    #[test]
    fn test_empty_clan_never_matches() {
        let filters = FilterLists {
            black_clan: vec![String::new()],
            ..FilterLists::default()
        };
        assert!(!filters.should_target(false, "Anyone", ""));
    }
}
