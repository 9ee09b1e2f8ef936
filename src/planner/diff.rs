//! Diff engine for comparing live state with desired state.
//!
//! The engine is entity-agnostic: it classifies elements of two collections
//! using an identity predicate and an equality predicate. Every entity kind
//! supplies its predicate pair through the [`Entity`] table below.

use serde::Serialize;

use crate::models::{
    Collaborator, Member, Repository, RepositoryMember, RepositoryTeam, Team, TeamMember,
    matches_if_set, same_login,
};

/// Entity kinds handled by the engine, including nested collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Organization settings.
    Organization,
    /// Organization members.
    Members,
    /// Outside collaborators.
    Collaborators,
    /// Teams.
    Teams,
    /// Repositories.
    Repositories,
    /// Members of one team.
    TeamMembers,
    /// Direct collaborators of one repository.
    RepositoryMembers,
    /// Team bindings of one repository.
    RepositoryTeams,
}

/// Identity and equality predicates for one entity kind.
///
/// Both predicates are called as `(current, desired)`. Equality must imply
/// identity.
#[derive(Debug, Clone, Copy)]
pub struct Predicates<T> {
    /// Whether two records refer to the same logical entity.
    pub identity: fn(&T, &T) -> bool,
    /// Whether a live record already satisfies a desired one.
    pub equality: fn(&T, &T) -> bool,
}

/// A record that can be diffed.
pub trait Entity: Clone {
    /// Kind tag used for reporting.
    const KIND: EntityKind;
    /// Predicate pair used by [`diff_entities`].
    const PREDICATES: Predicates<Self>;

    /// Identity rendered for reports and logs.
    fn key(&self) -> String;
}

/// Result of diffing two collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff<T> {
    /// Live elements with no desired counterpart.
    pub remove: Vec<T>,
    /// Desired elements that no live element satisfies.
    pub update: Vec<T>,
}

/// Computes the difference between `current` and `desired`.
///
/// `remove` holds every current element whose identity is absent from
/// `desired`; `update` holds every desired element that no current element
/// equals. An element whose identity matches but whose fields differ lands
/// in `update` only. Both outputs keep input order.
pub fn diff<T, I, E>(current: &[T], desired: &[T], identity: I, equality: E) -> Diff<T>
where
    T: Clone,
    I: Fn(&T, &T) -> bool,
    E: Fn(&T, &T) -> bool,
{
    let remove = current
        .iter()
        .filter(|c| !desired.iter().any(|d| identity(c, d)))
        .cloned()
        .collect();

    let update = desired
        .iter()
        .filter(|d| !current.iter().any(|c| equality(c, d)))
        .cloned()
        .collect();

    Diff { remove, update }
}

/// Diffs two collections using the entity's own predicates.
pub fn diff_entities<T: Entity>(current: &[T], desired: &[T]) -> Diff<T> {
    diff(
        current,
        desired,
        T::PREDICATES.identity,
        T::PREDICATES.equality,
    )
}

impl<T> Diff<T> {
    /// Returns true if both sides are already in sync.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.update.is_empty()
    }
}

impl<T: Entity> Diff<T> {
    /// Identities of the elements to remove.
    #[must_use]
    pub fn remove_keys(&self) -> Vec<String> {
        self.remove.iter().map(Entity::key).collect()
    }

    /// Identities of the elements to create or update.
    #[must_use]
    pub fn update_keys(&self) -> Vec<String> {
        self.update.iter().map(Entity::key).collect()
    }
}

// ============================================================================
// Predicate table
// ============================================================================

impl Entity for Member {
    const KIND: EntityKind = EntityKind::Members;
    const PREDICATES: Predicates<Self> = Predicates {
        identity: |c, d| same_login(&c.login, &d.login),
        equality: |c, d| same_login(&c.login, &d.login) && c.role == d.role,
    };

    fn key(&self) -> String {
        self.login.clone()
    }
}

impl Entity for Collaborator {
    const KIND: EntityKind = EntityKind::Collaborators;
    const PREDICATES: Predicates<Self> = Predicates {
        identity: |c, d| same_login(&c.login, &d.login),
        equality: |c, d| same_login(&c.login, &d.login),
    };

    fn key(&self) -> String {
        self.login.clone()
    }
}

impl Entity for Team {
    const KIND: EntityKind = EntityKind::Teams;
    const PREDICATES: Predicates<Self> = Predicates {
        identity: |c, d| c.slug == d.slug,
        // Members are diffed separately per team.
        equality: |c, d| {
            c.slug == d.slug
                && matches_if_set(c.name.as_ref(), d.name.as_ref())
                && matches_if_set(c.description.as_ref(), d.description.as_ref())
                && matches_if_set(c.privacy.as_ref(), d.privacy.as_ref())
                && matches_if_set(c.parent.as_ref(), d.parent.as_ref())
        },
    };

    fn key(&self) -> String {
        self.slug.clone()
    }
}

impl Entity for Repository {
    const KIND: EntityKind = EntityKind::Repositories;
    const PREDICATES: Predicates<Self> = Predicates {
        identity: |c, d| c.name == d.name,
        // Members and teams are diffed separately per repository.
        equality: |c, d| {
            c.name == d.name
                && matches_if_set(c.description.as_ref(), d.description.as_ref())
                && matches_if_set(c.homepage.as_ref(), d.homepage.as_ref())
                && matches_if_set(c.visibility.as_ref(), d.visibility.as_ref())
                && matches_if_set(c.has_issues.as_ref(), d.has_issues.as_ref())
                && matches_if_set(c.has_projects.as_ref(), d.has_projects.as_ref())
                && matches_if_set(c.has_wiki.as_ref(), d.has_wiki.as_ref())
                && matches_if_set(c.is_template.as_ref(), d.is_template.as_ref())
                && matches_if_set(c.allow_squash_merge.as_ref(), d.allow_squash_merge.as_ref())
                && matches_if_set(c.allow_merge_commit.as_ref(), d.allow_merge_commit.as_ref())
                && matches_if_set(c.allow_rebase_merge.as_ref(), d.allow_rebase_merge.as_ref())
                && matches_if_set(
                    c.delete_branch_on_merge.as_ref(),
                    d.delete_branch_on_merge.as_ref(),
                )
        },
    };

    fn key(&self) -> String {
        self.name.clone()
    }
}

impl Entity for TeamMember {
    const KIND: EntityKind = EntityKind::TeamMembers;
    const PREDICATES: Predicates<Self> = Predicates {
        identity: |c, d| same_login(&c.login, &d.login),
        equality: |c, d| same_login(&c.login, &d.login) && c.role == d.role,
    };

    fn key(&self) -> String {
        self.login.clone()
    }
}

impl Entity for RepositoryMember {
    const KIND: EntityKind = EntityKind::RepositoryMembers;
    const PREDICATES: Predicates<Self> = Predicates {
        identity: |c, d| same_login(&c.login, &d.login),
        equality: |c, d| same_login(&c.login, &d.login) && c.permission == d.permission,
    };

    fn key(&self) -> String {
        self.login.clone()
    }
}

impl Entity for RepositoryTeam {
    const KIND: EntityKind = EntityKind::RepositoryTeams;
    const PREDICATES: Predicates<Self> = Predicates {
        identity: |c, d| c.slug == d.slug,
        equality: |c, d| c.slug == d.slug && c.permission == d.permission,
    };

    fn key(&self) -> String {
        self.slug.clone()
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Organization => "organization",
            Self::Members => "members",
            Self::Collaborators => "collaborators",
            Self::Teams => "teams",
            Self::Repositories => "repositories",
            Self::TeamMembers => "team members",
            Self::RepositoryMembers => "repository members",
            Self::RepositoryTeams => "repository teams",
        };
        write!(f, "{s}")
    }
}
