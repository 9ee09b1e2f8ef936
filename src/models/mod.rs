//! Entity models for desired and live organization state.
//!
//! These are plain records mirroring the `gorc.yml` document. The same types
//! describe both sides of a reconciliation: what the document declares and
//! what the GitHub API reports.

mod behaviours;
mod document;
mod member;
mod organization;
mod repository;
mod team;

pub use behaviours::{Behaviours, MemberRemovalPolicy, RemovalPolicy};
pub use document::{DesiredState, ResolvedState};
pub use member::{Collaborator, Member, MemberRole};
pub use organization::{DefaultRepositoryPermission, Organization};
pub use repository::{
    RepoPermission, Repository, RepositoryMember, RepositoryTeam, Visibility,
};
pub use team::{Team, TeamMember, TeamPrivacy, TeamRole};

/// Treats an empty string as unset.
pub(crate) fn normalize_text(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// Compares two GitHub logins, which are case-insensitive.
#[must_use]
pub fn same_login(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Returns true when `desired` is unset or equal to `current`.
pub(crate) fn matches_if_set<T: PartialEq>(current: Option<&T>, desired: Option<&T>) -> bool {
    desired.is_none_or(|d| current == Some(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_drops_empty() {
        assert_eq!(normalize_text(Some(&String::new())), None);
        assert_eq!(normalize_text(None), None);
        assert_eq!(
            normalize_text(Some(&String::from("acme"))),
            Some(String::from("acme"))
        );
    }

    #[test]
    fn test_matches_if_set() {
        assert!(matches_if_set::<u8>(Some(&1), None));
        assert!(matches_if_set::<u8>(None, None));
        assert!(matches_if_set(Some(&1), Some(&1)));
        assert!(!matches_if_set(None, Some(&1)));
        assert!(!matches_if_set(Some(&2), Some(&1)));
    }

    #[test]
    fn test_same_login_ignores_case() {
        assert!(same_login("Octocat", "octocat"));
        assert!(!same_login("octocat", "octodog"));
    }
}
