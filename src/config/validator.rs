//! Validation gate for desired-state documents.
//!
//! The gate checks the raw YAML value rather than the typed model, so every
//! violation is reported with its path in one pass instead of stopping at
//! the first deserialization error.

use crate::error::{Result, ValidationError, Violation};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use tracing::debug;

/// Keys allowed at the document root.
const ROOT_KEYS: &[&str] = &[
    "org",
    "members",
    "collaborators",
    "teams",
    "repos",
    "behaviours",
    "behaviors",
];

const ORG_STRING_FIELDS: &[&str] = &[
    "billing_email",
    "company",
    "email",
    "twitter_username",
    "location",
    "name",
    "description",
];

const ORG_BOOL_FIELDS: &[&str] = &[
    "has_organization_projects",
    "has_repository_projects",
    "members_can_create_repositories",
    "members_can_create_internal_repositories",
    "members_can_create_private_repositories",
    "members_can_create_public_repositories",
    "members_can_create_pages",
    "members_can_create_public_pages",
    "members_can_create_private_pages",
    "members_can_fork_private_repositories",
    "web_commit_signoff_required",
];

const REPO_BOOL_FIELDS: &[&str] = &[
    "has_issues",
    "has_projects",
    "has_wiki",
    "is_template",
    "allow_squash_merge",
    "allow_merge_commit",
    "allow_rebase_merge",
    "delete_branch_on_merge",
];

const MEMBER_ROLES: &[&str] = &["admin", "member"];
const TEAM_ROLES: &[&str] = &["member", "maintainer"];
const TEAM_PRIVACY: &[&str] = &["secret", "closed"];
const VISIBILITY: &[&str] = &["public", "private"];
const DEFAULT_PERMISSIONS: &[&str] = &["read", "write", "admin", "none"];
const REPO_PERMISSIONS: &[&str] = &["read", "triage", "write", "maintain", "admin", "pull", "push"];
const REMOVAL_POLICIES: &[&str] = &["remove", "warn"];
const MEMBER_POLICIES: &[&str] = &["remove", "warn", "convert_to_outside_collaborator"];

/// Outcome of validating a document.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Violations that make the document unusable.
    pub errors: Vec<Violation>,
    /// Non-fatal issues.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Returns true if no error was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validator for desired-state documents.
#[derive(Debug, Default)]
pub struct ValidationGate;

impl ValidationGate {
    /// Creates a new validation gate.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks a document and collects every violation.
    #[must_use]
    pub fn check(&self, document: &Value) -> ValidationReport {
        let mut checker = Checker::default();
        checker.document(document);
        checker.report
    }

    /// Validates a document.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every violated path.
    pub fn validate(&self, document: &Value) -> Result<ValidationReport> {
        let report = self.check(document);
        if report.is_valid() {
            debug!(
                "Document validation passed with {} warning(s)",
                report.warnings.len()
            );
            Ok(report)
        } else {
            Err(ValidationError::new(report.errors).into())
        }
    }
}

#[derive(Default)]
struct Checker {
    report: ValidationReport,
}

impl Checker {
    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.report.errors.push(Violation {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warning(&mut self, path: &str, message: &str) {
        self.report.warnings.push(format!("{path}: {message}"));
    }

    fn document(&mut self, document: &Value) {
        let Some(root) = self.mapping(document, "$") else {
            return;
        };

        for key in root.keys() {
            match key.as_str() {
                Some(k) if ROOT_KEYS.contains(&k) => {}
                Some(k) => self.error(k, "unknown key"),
                None => self.error("$", "keys must be strings"),
            }
        }

        match root.get("org") {
            Some(org) => self.organization(org),
            None => self.error("org", "is required"),
        }

        let member_logins = root
            .get("members")
            .map(|members| self.members(members))
            .unwrap_or_default();
        if let Some(collaborators) = root.get("collaborators") {
            self.collaborators(collaborators, &member_logins);
        }
        if let Some(teams) = root.get("teams") {
            self.teams(teams);
        }
        if let Some(repos) = root.get("repos") {
            self.repositories(repos);
        }
        for key in ["behaviours", "behaviors"] {
            if let Some(behaviours) = root.get(key) {
                self.behaviours(behaviours, key);
            }
        }
        if root.contains_key("behaviours") && root.contains_key("behaviors") {
            self.error("behaviors", "conflicts with behaviours, use only one of them");
        }
    }

    fn organization(&mut self, org: &Value) {
        let Some(map) = self.mapping(org, "org") else {
            return;
        };
        for field in ORG_STRING_FIELDS {
            self.string(map, field, "org", false);
        }
        for field in ORG_BOOL_FIELDS {
            self.boolean(map, field, "org");
        }
        self.one_of(map, "default_repository_permission", "org", DEFAULT_PERMISSIONS, false);

        let known: Vec<&str> = ORG_STRING_FIELDS
            .iter()
            .chain(ORG_BOOL_FIELDS)
            .copied()
            .chain(["default_repository_permission"])
            .collect();
        self.unknown_keys(map, &known, "org");
    }

    /// Returns the lowercased logins of valid members.
    fn members(&mut self, members: &Value) -> HashSet<String> {
        let mut logins = HashSet::new();
        let Some(items) = self.sequence(members, "members") else {
            return logins;
        };

        for (i, item) in items.iter().enumerate() {
            let path = format!("members[{i}]");
            let Some(map) = self.mapping(item, &path) else {
                continue;
            };
            if let Some(login) = self.string(map, "login", &path, true) {
                if !logins.insert(login.to_lowercase()) {
                    self.error(format!("{path}.login"), format!("duplicate member: {login}"));
                }
            }
            self.one_of(map, "role", &path, MEMBER_ROLES, true);
            self.unknown_keys(map, &["login", "role"], &path);
        }
        logins
    }

    fn collaborators(&mut self, collaborators: &Value, member_logins: &HashSet<String>) {
        let Some(items) = self.sequence(collaborators, "collaborators") else {
            return;
        };

        let mut seen = HashSet::new();
        for (i, item) in items.iter().enumerate() {
            let path = format!("collaborators[{i}]");
            let Some(login) = item.as_str() else {
                self.error(path, "must be a string");
                continue;
            };
            let folded = login.to_lowercase();
            if member_logins.contains(&folded) {
                self.error(
                    path.clone(),
                    format!("{login} is also listed as a member"),
                );
            }
            if !seen.insert(folded) {
                self.error(path, format!("duplicate collaborator: {login}"));
            }
        }
    }

    fn teams(&mut self, teams: &Value) {
        let Some(items) = self.sequence(teams, "teams") else {
            return;
        };

        let mut slugs = HashSet::new();
        let mut parents = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let path = format!("teams[{i}]");
            let Some(map) = self.mapping(item, &path) else {
                continue;
            };
            if let Some(slug) = self.string(map, "slug", &path, true) {
                if !slugs.insert(slug.to_string()) {
                    self.error(format!("{path}.slug"), format!("duplicate team: {slug}"));
                }
            }
            if let Some(name) = self.string(map, "name", &path, true) {
                let derived = slugify(name);
                match map.get("slug").and_then(Value::as_str) {
                    Some(slug) if slug != derived => self.warning(
                        &format!("{path}.name"),
                        &format!("GitHub derives slug {derived} from this name, not {slug}"),
                    ),
                    _ => {}
                }
            }
            self.string(map, "description", &path, false);
            self.one_of(map, "privacy", &path, TEAM_PRIVACY, true);
            if let Some(parent) = self.string(map, "parent", &path, false) {
                parents.push((format!("{path}.parent"), parent.to_string()));
            }
            if let Some(members) = map.get("members") {
                self.team_members(members, &format!("{path}.members"));
            }
            self.unknown_keys(
                map,
                &["slug", "name", "description", "privacy", "parent", "members"],
                &path,
            );
        }

        for (path, parent) in parents {
            if !slugs.contains(&parent) {
                self.warning(&path, &format!("parent team {parent} is not in the document"));
            }
        }
    }

    fn team_members(&mut self, members: &Value, path: &str) {
        let Some(items) = self.sequence(members, path) else {
            return;
        };

        let mut seen = HashSet::new();
        for (i, item) in items.iter().enumerate() {
            let path = format!("{path}[{i}]");
            let Some(map) = self.mapping(item, &path) else {
                continue;
            };
            if let Some(login) = self.string(map, "login", &path, true) {
                if !seen.insert(login.to_lowercase()) {
                    self.error(format!("{path}.login"), format!("duplicate member: {login}"));
                }
            }
            self.one_of(map, "role", &path, TEAM_ROLES, true);
            self.unknown_keys(map, &["login", "role"], &path);
        }
    }

    fn repositories(&mut self, repos: &Value) {
        let Some(items) = self.sequence(repos, "repos") else {
            return;
        };

        let mut names = HashSet::new();
        for (i, item) in items.iter().enumerate() {
            let path = format!("repos[{i}]");
            let Some(map) = self.mapping(item, &path) else {
                continue;
            };
            if let Some(name) = self.string(map, "name", &path, true) {
                if !names.insert(name.to_string()) {
                    self.error(format!("{path}.name"), format!("duplicate repository: {name}"));
                }
            }
            self.string(map, "description", &path, false);
            self.string(map, "homepage", &path, false);
            self.one_of(map, "visibility", &path, VISIBILITY, false);
            for field in REPO_BOOL_FIELDS {
                self.boolean(map, field, &path);
            }
            if let Some(members) = map.get("members") {
                self.bindings(members, &format!("{path}.members"), "login", true);
            }
            if let Some(teams) = map.get("teams") {
                self.bindings(teams, &format!("{path}.teams"), "slug", false);
            }

            let known: Vec<&str> = ["name", "description", "homepage", "visibility", "members", "teams"]
                .into_iter()
                .chain(REPO_BOOL_FIELDS.iter().copied())
                .collect();
            self.unknown_keys(map, &known, &path);
        }
    }

    /// Checks repository access bindings keyed by `key`.
    fn bindings(&mut self, bindings: &Value, path: &str, key: &str, fold_case: bool) {
        let Some(items) = self.sequence(bindings, path) else {
            return;
        };

        let mut seen = HashSet::new();
        for (i, item) in items.iter().enumerate() {
            let path = format!("{path}[{i}]");
            let Some(map) = self.mapping(item, &path) else {
                continue;
            };
            if let Some(id) = self.string(map, key, &path, true) {
                let id = if fold_case { id.to_lowercase() } else { id.to_string() };
                if !seen.insert(id) {
                    self.error(format!("{path}.{key}"), "duplicate entry");
                }
            }
            self.one_of(map, "permission", &path, REPO_PERMISSIONS, true);
            self.unknown_keys(map, &[key, "permission"], &path);
        }
    }

    fn behaviours(&mut self, behaviours: &Value, path: &str) {
        let Some(map) = self.mapping(behaviours, path) else {
            return;
        };
        self.one_of(map, "unknown_teams", path, REMOVAL_POLICIES, false);
        self.one_of(map, "unknown_members", path, MEMBER_POLICIES, false);
        self.one_of(map, "unknown_collaborators", path, REMOVAL_POLICIES, false);
        self.one_of(map, "unknown_collaborator", path, REMOVAL_POLICIES, false);
        if map.contains_key("unknown_collaborators") && map.contains_key("unknown_collaborator") {
            self.error(
                format!("{path}.unknown_collaborator"),
                "conflicts with unknown_collaborators, use only one of them",
            );
        }
        self.unknown_keys(
            map,
            &[
                "unknown_teams",
                "unknown_members",
                "unknown_collaborators",
                "unknown_collaborator",
            ],
            path,
        );
    }

    fn mapping<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Mapping> {
        let map = value.as_mapping();
        if map.is_none() {
            self.error(path, "must be a mapping");
        }
        map
    }

    fn sequence<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v [Value]> {
        let seq = value.as_sequence().map(Vec::as_slice);
        if seq.is_none() {
            self.error(path, "must be a list");
        }
        seq
    }

    fn string<'v>(
        &mut self,
        map: &'v Mapping,
        key: &str,
        path: &str,
        required: bool,
    ) -> Option<&'v str> {
        match map.get(key) {
            None | Some(Value::Null) if required => {
                self.error(format!("{path}.{key}"), "is required");
                None
            }
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                self.error(format!("{path}.{key}"), "must be a string");
                None
            }
        }
    }

    fn boolean(&mut self, map: &Mapping, key: &str, path: &str) {
        match map.get(key) {
            None | Some(Value::Null | Value::Bool(_)) => {}
            Some(_) => self.error(format!("{path}.{key}"), "must be a boolean"),
        }
    }

    fn one_of(&mut self, map: &Mapping, key: &str, path: &str, allowed: &[&str], required: bool) {
        if let Some(value) = self.string(map, key, path, required) {
            if !allowed.contains(&value) {
                self.error(
                    format!("{path}.{key}"),
                    format!("must be one of: {}", allowed.join(", ")),
                );
            }
        }
    }

    fn unknown_keys(&mut self, map: &Mapping, known: &[&str], path: &str) {
        for key in map.keys().filter_map(Value::as_str) {
            if !known.contains(&key) {
                self.warning(&format!("{path}.{key}"), "unknown key is ignored");
            }
        }
    }
}

/// Derives a team slug from its name the way GitHub does on create.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(yaml: &str) -> ValidationReport {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        ValidationGate::new().check(&value)
    }

    fn paths(report: &ValidationReport) -> Vec<&str> {
        report.errors.iter().map(|v| v.path.as_str()).collect()
    }

    #[test]
    fn test_missing_org_is_reported() {
        let report = check("members: []\n");
        assert!(!report.is_valid());
        assert_eq!(paths(&report), vec!["org"]);
    }

    #[test]
    fn test_valid_document() {
        let report = check(
            r"
org:
  billing_email: billing@acme.test
  default_repository_permission: read
members:
  - login: octocat
    role: admin
collaborators:
  - contractor
teams:
  - slug: platform
    name: Platform
    privacy: closed
    members:
      - login: octocat
        role: maintainer
repos:
  - name: api
    visibility: private
    has_wiki: false
    members:
      - login: contractor
        permission: push
    teams:
      - slug: platform
        permission: maintain
behaviours:
  unknown_members: convert_to_outside_collaborator
",
        );
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_every_violation_is_collected() {
        let report = check(
            r"
org: {}
extra: true
members:
  - login: Octocat
    role: owner
  - login: octocat
    role: member
teams:
  - slug: platform
    privacy: open
behaviours:
  unknown_teams: convert_to_outside_collaborator
",
        );
        assert_eq!(
            paths(&report),
            vec![
                "extra",
                "members[0].role",
                "members[1].login",
                "teams[0].name",
                "teams[0].privacy",
                "behaviours.unknown_teams",
            ]
        );
        assert!(ValidationGate::new()
            .validate(&serde_yaml::from_str("{}").unwrap())
            .is_err());
    }

    #[test]
    fn test_member_listed_as_collaborator() {
        let report = check(
            "org: {}\nmembers:\n  - login: Alice\n    role: member\ncollaborators:\n  - alice\n",
        );
        assert_eq!(paths(&report), vec!["collaborators[0]"]);
    }

    #[test]
    fn test_unknown_parent_and_keys_are_warnings() {
        let report = check(
            r"
org: {}
teams:
  - slug: sre
    name: SRE
    privacy: secret
    parent: infra
    maintainers: []
",
        );
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().any(|w| w.contains("infra")));
    }

    #[test]
    fn test_root_must_be_mapping() {
        let report = check("- org\n");
        assert_eq!(paths(&report), vec!["$"]);
    }

    #[test]
    fn test_both_behaviour_spellings_conflict() {
        let report = check(
            "org: {}\nbehaviours:\n  unknown_teams: warn\nbehaviors:\n  unknown_members: warn\n",
        );
        assert_eq!(paths(&report), vec!["behaviors"]);

        let report = check(
            "org: {}\nbehaviors:\n  unknown_collaborators: warn\n  unknown_collaborator: remove\n",
        );
        assert_eq!(paths(&report), vec!["behaviors.unknown_collaborator"]);
    }

    #[test]
    fn test_name_that_derives_another_slug_warns() {
        let report = check(
            r"
org: {}
teams:
  - slug: sre
    name: Site Reliability
    privacy: closed
  - slug: site-reliability-2
    name: Site Reliability 2
    privacy: closed
",
        );
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("teams[0].name"));
        assert!(report.warnings[0].contains("site-reliability"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Platform SRE"), "platform-sre");
        assert_eq!(slugify("  Ops & Infra!"), "ops-infra");
        assert_eq!(slugify("data_eng"), "data_eng");
    }
}
