//! Reconciliation orchestrator.
//!
//! The orchestrator runs one operation per invocation: `init` bootstraps
//! the document from live state, `validate` checks it, and `dry-run` /
//! `apply` reconcile every managed kind in a fixed order. A failing kind is
//! recorded in the report and the run moves on to the next kind.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{DocumentParser, StateHasher, ValidationGate, ValidationReport};
use crate::error::{GorcError, ReconcileError, Result};
use crate::github::Gateway;
use crate::models::{Behaviours, DesiredState, ResolvedState};
use crate::planner::{DEFAULT_CONCURRENCY, EntityKind, KindPlan, WriteExecutor};
use crate::reconciler::{
    KindOutcome, ReconcileContext, collaborators, members, organization, repositories, teams,
};
use crate::state::DocumentStore;

/// Operation requested for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Build the document from live state.
    Init,
    /// Check the document.
    Validate,
    /// Report differences without writing.
    DryRun,
    /// Write differences.
    Apply,
}

impl Operation {
    /// Returns the operation name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Validate => "validate",
            Self::DryRun => "dry-run",
            Self::Apply => "apply",
        }
    }

    /// Parses a comma-separated list of operations.
    ///
    /// # Errors
    ///
    /// Returns an unknown-operation error for the first unknown name, or
    /// for a list that names no operation at all.
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        let operations: Vec<Self> = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::parse)
            .collect::<Result<_>>()?;

        if operations.is_empty() {
            return Err(GorcError::UnknownOperation {
                name: list.to_string(),
            });
        }
        Ok(operations)
    }
}

impl FromStr for Operation {
    type Err = GorcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "init" => Ok(Self::Init),
            "validate" => Ok(Self::Validate),
            "dry-run" => Ok(Self::DryRun),
            "apply" => Ok(Self::Apply),
            other => Err(GorcError::UnknownOperation {
                name: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for a run, threaded explicitly into every operation.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Organization login.
    pub organization: String,
    /// Whether repositories are reconciled.
    pub include_repositories: bool,
    /// Maximum concurrent writes per batch.
    pub concurrency: usize,
}

impl RunSettings {
    /// Creates settings for `organization` with repositories out of scope.
    #[must_use]
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            include_repositories: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// A failure recorded during a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunError {
    /// Kind that failed, if the failure belongs to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntityKind>,
    /// Error message.
    pub message: String,
}

/// Result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Run identifier.
    pub run_id: Uuid,
    /// Operation performed.
    pub operation: Operation,
    /// Organization login.
    pub org: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Resolved state of every attempted kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedState>,
    /// SHA-256 of the resolved state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Validation outcome (`validate` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    /// Non-fatal findings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// What differed, per kind.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<KindPlan>,
    /// Failures; empty on full success.
    pub errors: Vec<RunError>,
}

impl Report {
    fn new(operation: Operation, org: &str) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            operation,
            org: org.to_string(),
            started_at: now,
            finished_at: now,
            resolved: None,
            fingerprint: None,
            valid: None,
            warnings: Vec::new(),
            changes: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Returns true if no error was recorded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of differences across kinds.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.changes.iter().map(KindPlan::change_count).sum()
    }

    /// Records the outcome of one kind and returns its resolved state.
    fn record<T>(&mut self, kind: EntityKind, result: Result<KindOutcome<T>>) -> Option<T> {
        match result {
            Ok(outcome) => {
                self.changes.push(outcome.plan);
                Some(outcome.resolved)
            }
            Err(e) => {
                let failure = ReconcileError::KindFailed {
                    kind: kind.to_string(),
                    reason: e.to_string(),
                };
                error!("{failure}");
                self.errors.push(RunError {
                    kind: Some(kind),
                    message: failure.to_string(),
                });
                None
            }
        }
    }

    fn finish(mut self, hasher: &StateHasher) -> Self {
        self.fingerprint = self.resolved.as_ref().map(|r| hasher.fingerprint(r));
        self.finished_at = Utc::now();
        self
    }
}

/// Runs operations against one organization.
pub struct Orchestrator<'a> {
    gateway: &'a dyn Gateway,
    store: &'a dyn DocumentStore,
    settings: RunSettings,
    parser: DocumentParser,
    gate: ValidationGate,
    hasher: StateHasher,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        gateway: &'a dyn Gateway,
        store: &'a dyn DocumentStore,
        settings: RunSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            settings,
            parser: DocumentParser::new(),
            gate: ValidationGate::new(),
            hasher: StateHasher::new(),
        }
    }

    /// Runs an operation given by name.
    ///
    /// # Errors
    ///
    /// Returns an unknown-operation error for names other than `init`,
    /// `validate`, `dry-run` and `apply`, and otherwise as [`Self::run`].
    pub async fn run_named(&self, operation: &str) -> Result<Report> {
        self.run(operation.parse()?).await
    }

    /// Runs one operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be loaded or fails
    /// validation, or if `init` cannot fetch or save. Failures of single
    /// kinds during `dry-run` and `apply` are recorded in the report.
    pub async fn run(&self, operation: Operation) -> Result<Report> {
        let report = Report::new(operation, &self.settings.organization);
        info!(
            "Starting {operation} for {} (run {})",
            self.settings.organization, report.run_id
        );

        let report = match operation {
            Operation::Init => self.init(report).await?,
            Operation::Validate => self.validate(report).await?,
            Operation::DryRun => self.reconcile(report, true).await?,
            Operation::Apply => self.reconcile(report, false).await?,
        };

        let report = report.finish(&self.hasher);
        info!(
            "Finished {operation}: {} change(s), {} error(s)",
            report.change_count(),
            report.errors.len()
        );
        Ok(report)
    }

    /// Fetches every kind and writes it as the new document.
    async fn init(&self, mut report: Report) -> Result<Report> {
        let behaviours = self.existing_behaviours().await;
        let executor = self.executor();

        let (org, members, collaborators, teams) = tokio::try_join!(
            organization::fetch(self.gateway),
            members::fetch(self.gateway),
            collaborators::fetch(self.gateway),
            teams::fetch(self.gateway, executor),
        )?;
        let repos = if self.settings.include_repositories {
            Some(repositories::fetch(self.gateway, executor).await?)
        } else {
            None
        };

        let desired = DesiredState {
            org,
            members: Some(members),
            collaborators: Some(collaborators),
            teams: Some(teams),
            repos,
            behaviours,
        };
        self.store.save(&desired).await?;
        info!("Wrote document to {}", self.store.location());

        report.resolved = Some(ResolvedState::from(&desired));
        Ok(report)
    }

    async fn validate(&self, mut report: Report) -> Result<Report> {
        let document = self.store.load().await?;
        let result = self.gate.validate(&document)?;
        Self::log_warnings(&result);

        report.valid = Some(true);
        report.warnings = result.warnings;
        Ok(report)
    }

    async fn reconcile(&self, mut report: Report, dry_run: bool) -> Result<Report> {
        let document = self.store.load().await?;
        let result = self.gate.validate(&document)?;
        Self::log_warnings(&result);
        report.warnings = result.warnings;

        let desired = self.parser.to_state(document)?;
        let ctx = ReconcileContext::new(
            self.gateway,
            &desired.behaviours,
            dry_run,
            self.executor(),
        );

        let mut resolved = ResolvedState {
            org: report.record(
                EntityKind::Organization,
                organization::reconcile(&ctx, &desired.org).await,
            ),
            ..ResolvedState::default()
        };

        if let Some(list) = &desired.members {
            resolved.members =
                report.record(EntityKind::Members, members::reconcile(&ctx, list).await);
        }
        if let Some(list) = &desired.collaborators {
            resolved.collaborators = report.record(
                EntityKind::Collaborators,
                collaborators::reconcile(&ctx, list).await,
            );
        }
        if let Some(list) = &desired.teams {
            resolved.teams = report.record(EntityKind::Teams, teams::reconcile(&ctx, list).await);
        }
        match &desired.repos {
            Some(list) if self.settings.include_repositories => {
                resolved.repos = report.record(
                    EntityKind::Repositories,
                    repositories::reconcile(&ctx, list).await,
                );
            }
            Some(_) => warn!("Document lists repositories but repositories are not in scope"),
            None => {}
        }

        report.resolved = Some(resolved);
        Ok(report)
    }

    /// Behaviours of the current document, so `init` does not reset them.
    async fn existing_behaviours(&self) -> Behaviours {
        let document = match self.store.load().await {
            Ok(document) => document,
            Err(e) => {
                warn!("Cannot read existing document, using default behaviours: {e}");
                return Behaviours::default();
            }
        };

        ["behaviours", "behaviors"]
            .iter()
            .find_map(|key| document.get(key))
            .cloned()
            .map_or_else(
                || Ok(Behaviours::default()),
                serde_yaml::from_value::<Behaviours>,
            )
            .unwrap_or_else(|e| {
                warn!("Ignoring invalid behaviours in existing document: {e}");
                Behaviours::default()
            })
    }

    fn executor(&self) -> WriteExecutor {
        WriteExecutor::new(self.settings.concurrency)
    }

    fn log_warnings(result: &ValidationReport) {
        for warning in &result.warnings {
            warn!("{warning}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GitHubError, ValidationError};
    use crate::github::MockGateway;
    use crate::models::{
        Collaborator, Member, MemberRemovalPolicy, MemberRole, Organization, Team, TeamPrivacy,
    };
    use crate::planner::SyncStatus;
    use crate::state::LocalDocumentStore;
    use tempfile::TempDir;

    const DOCUMENT: &str = r"
org:
  company: Acme
members:
  - login: octocat
    role: admin
collaborators:
  - contractor
teams:
  - slug: platform
    name: Platform
    privacy: closed
repos:
  - name: api
behaviours:
  unknown_members: warn
";

    fn store_with(content: Option<&str>) -> (LocalDocumentStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("gorc.yml");
        if let Some(content) = content {
            std::fs::write(&path, content).expect("Failed to write document");
        }
        (LocalDocumentStore::new(path), temp_dir)
    }

    fn live_gateway() -> MockGateway {
        let mut gateway = MockGateway::new();
        gateway.expect_get_organization().returning(|| {
            Ok(Organization {
                company: Some(String::from("Acme")),
                ..Organization::default()
            })
        });
        gateway.expect_list_members().returning(|role| {
            Ok(match role {
                MemberRole::Admin => vec![Member::new("octocat", MemberRole::Admin)],
                MemberRole::Member => vec![Member::new("intern", MemberRole::Member)],
            })
        });
        gateway
            .expect_list_outside_collaborators()
            .returning(|| Ok(vec![Collaborator::new("contractor")]));
        gateway.expect_list_teams().returning(|| {
            Ok(vec![Team {
                slug: String::from("platform"),
                name: Some(String::from("Platform")),
                description: None,
                privacy: Some(TeamPrivacy::Closed),
                parent: None,
                members: None,
            }])
        });
        gateway.expect_list_team_members().returning(|_, _| Ok(Vec::new()));
        gateway
    }

    #[test]
    fn test_parse_operations() {
        assert_eq!(
            Operation::parse_list("validate, dry-run,apply").unwrap(),
            vec![Operation::Validate, Operation::DryRun, Operation::Apply]
        );
        assert!(matches!(
            "destroy".parse::<Operation>(),
            Err(GorcError::UnknownOperation { name }) if name == "destroy"
        ));
    }

    #[test]
    fn test_empty_operation_list_is_rejected() {
        for list in ["", ",", " , ,"] {
            assert!(matches!(
                Operation::parse_list(list),
                Err(GorcError::UnknownOperation { name }) if name == list
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_operation_by_name() {
        let gateway = MockGateway::new();
        let (store, _temp) = store_with(Some(DOCUMENT));
        let orchestrator = Orchestrator::new(&gateway, &store, RunSettings::new("acme"));

        let err = orchestrator.run_named("plan").await.unwrap_err();
        assert!(matches!(err, GorcError::UnknownOperation { .. }));
    }

    #[tokio::test]
    async fn test_validate_missing_org() {
        let gateway = MockGateway::new();
        let (store, _temp) = store_with(Some("members: []\n"));
        let orchestrator = Orchestrator::new(&gateway, &store, RunSettings::new("acme"));

        match orchestrator.run(Operation::Validate).await {
            Err(GorcError::Validation(ValidationError { violations })) => {
                assert_eq!(violations[0].path, "org");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validate_valid_document() {
        let gateway = MockGateway::new();
        let (store, _temp) = store_with(Some(DOCUMENT));
        let orchestrator = Orchestrator::new(&gateway, &store, RunSettings::new("acme"));

        let report = orchestrator.run(Operation::Validate).await.unwrap();
        assert_eq!(report.valid, Some(true));
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_writes() {
        let gateway = live_gateway();
        let (store, _temp) = store_with(Some(DOCUMENT));
        let orchestrator = Orchestrator::new(&gateway, &store, RunSettings::new("acme"));

        let report = orchestrator.run(Operation::DryRun).await.unwrap();

        let kinds: Vec<EntityKind> = report.changes.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntityKind::Organization,
                EntityKind::Members,
                EntityKind::Collaborators,
                EntityKind::Teams,
            ]
        );
        assert_eq!(report.changes[1].remove, vec!["intern"]);
        assert_eq!(report.changes[1].status, SyncStatus::Planned);
        assert!(report.resolved.as_ref().unwrap().repos.is_none());
        assert_eq!(report.fingerprint.as_ref().map(String::len), Some(64));
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_failed_kind_does_not_stop_the_run() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_get_organization()
            .returning(|| Ok(Organization::default()));
        gateway
            .expect_list_members()
            .returning(|_| Err(GitHubError::api_error(502, "bad gateway").into()));
        gateway
            .expect_list_outside_collaborators()
            .returning(|| Ok(vec![Collaborator::new("contractor")]));
        gateway.expect_list_teams().returning(|| Ok(Vec::new()));
        gateway.expect_update_organization().times(1).returning(|_| Ok(()));
        gateway.expect_create_or_update_team().times(1).returning(|_| Ok(()));

        let (store, _temp) = store_with(Some(DOCUMENT));
        let orchestrator = Orchestrator::new(&gateway, &store, RunSettings::new("acme"));
        let report = orchestrator.run(Operation::Apply).await.unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, Some(EntityKind::Members));
        assert!(report.errors[0].message.contains("bad gateway"));

        let resolved = report.resolved.unwrap();
        assert!(resolved.members.is_none());
        assert_eq!(resolved.teams.map(|t| t.len()), Some(1));
        assert_eq!(
            report.changes.last().map(|c| (c.kind, c.status)),
            Some((EntityKind::Teams, SyncStatus::Applied))
        );
    }

    #[tokio::test]
    async fn test_repositories_in_scope() {
        let mut gateway = live_gateway();
        gateway.expect_list_repositories().returning(|| Ok(Vec::new()));

        let (store, _temp) = store_with(Some(DOCUMENT));
        let settings = RunSettings {
            include_repositories: true,
            ..RunSettings::new("acme")
        };
        let orchestrator = Orchestrator::new(&gateway, &store, settings);
        let report = orchestrator.run(Operation::DryRun).await.unwrap();

        let repos = report.changes.last().unwrap();
        assert_eq!(repos.kind, EntityKind::Repositories);
        assert_eq!(repos.update, vec!["api"]);
    }

    #[tokio::test]
    async fn test_init_writes_live_state_and_keeps_behaviours() {
        let gateway = live_gateway();
        let (store, _temp) = store_with(Some("org: {}\nbehaviors:\n  unknown_members: warn\n"));
        let orchestrator = Orchestrator::new(&gateway, &store, RunSettings::new("acme"));

        let report = orchestrator.run(Operation::Init).await.unwrap();
        assert!(report.changes.is_empty());

        let written = DocumentParser::new()
            .to_state(store.load().await.unwrap())
            .unwrap();
        assert_eq!(written.org.company.as_deref(), Some("Acme"));
        assert_eq!(written.members.as_ref().map(Vec::len), Some(2));
        assert_eq!(written.teams.as_ref().unwrap()[0].members, Some(Vec::new()));
        assert!(written.repos.is_none());
        assert_eq!(written.behaviours.unknown_members, MemberRemovalPolicy::Warn);
        assert_eq!(report.resolved, Some(ResolvedState::from(&written)));
    }

    #[tokio::test]
    async fn test_init_from_missing_document() {
        let gateway = live_gateway();
        let (store, _temp) = store_with(None);
        let orchestrator = Orchestrator::new(&gateway, &store, RunSettings::new("acme"));

        orchestrator.run(Operation::Init).await.unwrap();
        assert!(store.exists().await.unwrap());
    }
}
