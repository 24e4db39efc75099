//! Authorization list lookups.
//!
//! Decides whether a Telegram user or group may use the bot, based on the
//! `[access]` section of the configuration.

use crate::config::AccessConfig;

/// Wildcard entry admitting everyone.
const WILDCARD: &str = "*";

/// Identity of whoever sent an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// True for group and supergroup chats.
    pub is_group: bool,
    /// Telegram user id of the sender.
    pub user_id: u64,
    /// Sender username without `@`, if the user has one.
    pub user_name: Option<String>,
    /// Chat the update arrived in.
    pub chat_id: i64,
    /// Group username (or title when it has none).
    pub group_name: Option<String>,
}

/// Check whether `user_id` belongs to a configured admin.
pub fn is_admin(access: &AccessConfig, user_id: u64) -> bool {
    access.admins.contains(&user_id)
}

/// Check whether the requester may use the bot.
///
/// Group chats are checked against `allowed_groups`; private chats against
/// `admins` and `allowed_users`. Empty lists deny.
pub fn is_authorized(access: &AccessConfig, requester: &Requester) -> bool {
    if requester.is_group {
        list_admits(
            &access.allowed_groups,
            &requester.chat_id.to_string(),
            requester.group_name.as_deref(),
        )
    } else {
        is_admin(access, requester.user_id)
            || list_admits(
                &access.allowed_users,
                &requester.user_id.to_string(),
                requester.user_name.as_deref(),
            )
    }
}

fn list_admits(list: &[String], id: &str, name: Option<&str>) -> bool {
    let name = name.map(normalize_name);
    list.iter().any(|entry| {
        let entry = entry.trim();
        entry == WILDCARD
            || entry == id
            || name
                .as_deref()
                .is_some_and(|n| !n.is_empty() && normalize_name(entry) == n)
    })
}

fn normalize_name(name: &str) -> String {
    name.trim().trim_start_matches('@').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(admins: &[u64], users: &[&str], groups: &[&str]) -> AccessConfig {
        AccessConfig {
            admins: admins.to_vec(),
            allowed_users: users.iter().map(|s| s.to_string()).collect(),
            allowed_groups: groups.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn private(user_id: u64, user_name: Option<&str>) -> Requester {
        Requester {
            is_group: false,
            user_id,
            user_name: user_name.map(str::to_string),
            chat_id: user_id as i64,
            group_name: None,
        }
    }

    fn group(chat_id: i64, group_name: Option<&str>) -> Requester {
        Requester {
            is_group: true,
            user_id: 1,
            user_name: Some("member".to_string()),
            chat_id,
            group_name: group_name.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_lists_deny() {
        let acl = AccessConfig::default();
        assert!(!is_authorized(&acl, &private(5, Some("alice"))));
        assert!(!is_authorized(&acl, &group(-100, Some("club"))));
    }

    #[test]
    fn test_user_by_id() {
        let acl = access(&[], &["5"], &[]);
        assert!(is_authorized(&acl, &private(5, None)));
        assert!(!is_authorized(&acl, &private(6, None)));
    }

    #[test]
    fn test_user_by_name_case_insensitive_with_at() {
        let acl = access(&[], &["@Alice"], &[]);
        assert!(is_authorized(&acl, &private(9, Some("alice"))));
        assert!(!is_authorized(&acl, &private(9, Some("bob"))));
    }

    #[test]
    fn test_user_without_name_does_not_match_names() {
        let acl = access(&[], &["alice"], &[]);
        assert!(!is_authorized(&acl, &private(9, None)));
    }

    #[test]
    fn test_admin_always_allowed_privately() {
        let acl = access(&[42], &[], &[]);
        assert!(is_authorized(&acl, &private(42, None)));
        assert!(is_admin(&acl, 42));
        assert!(!is_admin(&acl, 43));
    }

    #[test]
    fn test_user_wildcard() {
        let acl = access(&[], &["*"], &[]);
        assert!(is_authorized(&acl, &private(1234, None)));
    }

    #[test]
    fn test_group_by_id_and_name() {
        let acl = access(&[], &[], &["-100500", "rustaceans"]);
        assert!(is_authorized(&acl, &group(-100500, None)));
        assert!(is_authorized(&acl, &group(-7, Some("Rustaceans"))));
        assert!(!is_authorized(&acl, &group(-7, Some("other"))));
    }

    #[test]
    fn test_group_ignores_user_list() {
        let acl = access(&[1], &["*"], &[]);
        assert!(!is_authorized(&acl, &group(-100, None)));
    }

    #[test]
    fn test_group_wildcard() {
        let acl = access(&[], &[], &["*"]);
        assert!(is_authorized(&acl, &group(-1, None)));
    }
}
