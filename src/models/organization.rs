//! Organization-level settings.

use serde::{Deserialize, Serialize};

use super::normalize_text;

/// Organization settings, a singleton per run.
///
/// Every field is optional: a field left unset in the document is not managed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    /// Billing email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_email: Option<String>,
    /// Company name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Publicly visible email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Twitter username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_username: Option<String>,
    /// Location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether organization projects are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_organization_projects: Option<bool>,
    /// Whether repository projects are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_repository_projects: Option<bool>,
    /// Base permission members get on every repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_repository_permission: Option<DefaultRepositoryPermission>,
    /// Whether members can create repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_can_create_repositories: Option<bool>,
    /// Whether members can create internal repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_can_create_internal_repositories: Option<bool>,
    /// Whether members can create private repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_can_create_private_repositories: Option<bool>,
    /// Whether members can create public repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_can_create_public_repositories: Option<bool>,
    /// Whether members can create pages sites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_can_create_pages: Option<bool>,
    /// Whether members can create public pages sites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_can_create_public_pages: Option<bool>,
    /// Whether members can create private pages sites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_can_create_private_pages: Option<bool>,
    /// Whether members can fork private repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_can_fork_private_repositories: Option<bool>,
    /// Whether commits made through the web UI must be signed off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_commit_signoff_required: Option<bool>,
}

/// Base repository permission for organization members.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DefaultRepositoryPermission {
    /// Read access.
    Read,
    /// Write access.
    Write,
    /// Admin access.
    Admin,
    /// No access.
    None,
}

impl Organization {
    /// Returns a copy with empty strings treated as unset.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            billing_email: normalize_text(self.billing_email.as_ref()),
            company: normalize_text(self.company.as_ref()),
            email: normalize_text(self.email.as_ref()),
            twitter_username: normalize_text(self.twitter_username.as_ref()),
            location: normalize_text(self.location.as_ref()),
            name: normalize_text(self.name.as_ref()),
            description: normalize_text(self.description.as_ref()),
            ..self.clone()
        }
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl std::fmt::Display for DefaultRepositoryPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
            Self::None => "none",
        };
        write!(f, "{s}")
    }
}
