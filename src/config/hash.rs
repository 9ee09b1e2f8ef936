//! Fingerprints of resolved state.
//!
//! This module computes a deterministic SHA-256 over a resolved state so
//! that two runs resolving to the same document can be recognised, no
//! matter in which order the document lists its entries.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::ResolvedState;

/// Hasher for resolved-state fingerprints.
#[derive(Debug, Default)]
pub struct StateHasher;

impl StateHasher {
    /// Creates a new state hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a resolved state.
    #[must_use]
    pub fn fingerprint(&self, state: &ResolvedState) -> String {
        let mut hasher = Sha256::new();

        section(&mut hasher, "org", state.org.iter().collect());
        section(
            &mut hasher,
            "members",
            sorted(state.members.as_deref(), |m| m.login.to_lowercase()),
        );
        section(
            &mut hasher,
            "collaborators",
            sorted(state.collaborators.as_deref(), |c| c.login.to_lowercase()),
        );

        // Nested lists are sorted too, so only membership counts.
        let teams: Option<Vec<_>> = state.teams.as_ref().map(|teams| {
            teams
                .iter()
                .map(|team| {
                    let mut team = team.clone();
                    if let Some(members) = team.members.as_mut() {
                        members.sort_by_key(|m| m.login.to_lowercase());
                    }
                    team
                })
                .collect()
        });
        section(&mut hasher, "teams", sorted(teams.as_deref(), |t| t.slug.clone()));

        let repos: Option<Vec<_>> = state.repos.as_ref().map(|repos| {
            repos
                .iter()
                .map(|repo| {
                    let mut repo = repo.clone();
                    if let Some(members) = repo.members.as_mut() {
                        members.sort_by_key(|m| m.login.to_lowercase());
                    }
                    if let Some(teams) = repo.teams.as_mut() {
                        teams.sort_by(|a, b| a.slug.cmp(&b.slug));
                    }
                    repo
                })
                .collect()
        });
        section(&mut hasher, "repos", sorted(repos.as_deref(), |r| r.name.clone()));

        hex::encode(hasher.finalize())
    }
}

fn sorted<'a, T, K: Ord>(items: Option<&'a [T]>, key: impl Fn(&T) -> K) -> Vec<&'a T> {
    let mut items: Vec<&T> = items.unwrap_or_default().iter().collect();
    items.sort_by_key(|item| key(item));
    items
}

/// Hashes a named section; an unmanaged section hashes as empty.
fn section<T: Serialize>(hasher: &mut Sha256, name: &str, items: Vec<&T>) {
    hasher.update(name.as_bytes());
    hasher.update(items.len().to_be_bytes());
    for item in items {
        hasher.update(serde_json::to_vec(item).unwrap_or_default());
        hasher.update([0u8]);
    }
}
