//! The Apply Executor (§4.4 Apply). Walks a [`ReconcilePlan`] in
//! creates-then-updates-then-deletes order, isolating each action's
//! failure so one bad resource never aborts the batch.

use agentsync_api::{ApiClient, ApiError, BlocksClient, FoldersClient, RemoteResource, ToolsClient};

use crate::metadata::ManagedMetadata;
use crate::model::{PlanAction, ReconcilePlan, ResourceId, ResourceKind, SkipReason};

/// What happened when a single action was executed (or withheld).
#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    /// Created; carries the remote's new id.
    Created { remote_id: String },
    /// Updated in place.
    Updated,
    /// Brought under management, stamping metadata over an existing
    /// unmanaged remote resource.
    Adopted,
    /// Deleted (or already absent — deletion is idempotent).
    Deleted,
    /// The action was never executed (dry run, or already a `Skip`).
    NotExecuted { reason: String },
    /// The remote call failed; the rest of the plan still proceeds.
    Failed { error: String },
}

/// The result of executing (or not executing) one planned action.
#[derive(Clone, Debug, PartialEq)]
pub struct ApplyResult {
    /// Identity of the resource this result concerns.
    pub id: ResourceId,
    /// What happened.
    pub outcome: ActionOutcome,
}

/// The full result of an apply pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplySummary {
    /// One entry per action in the plan, in apply order.
    pub results: Vec<ApplyResult>,
}

impl ApplySummary {
    /// Count of actions that completed without error.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ActionOutcome::Created { .. } | ActionOutcome::Updated | ActionOutcome::Adopted | ActionOutcome::Deleted))
            .count()
    }

    /// Count of actions that errored against the remote.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| matches!(r.outcome, ActionOutcome::Failed { .. })).count()
    }
}

/// Options controlling how a plan is executed.
#[derive(Clone, Debug, Default)]
pub struct ApplyOptions {
    /// Compute outcomes but issue no remote calls.
    pub dry_run: bool,
    /// Timestamp (RFC 3339) stamped as `last_synced` on every write.
    pub now: String,
    /// The org scope to stamp into managed metadata, if any.
    pub org: Option<String>,
    /// The project scope to stamp into managed metadata, if any.
    pub project: Option<String>,
    /// The manifest package version (sha) being applied.
    pub package_version: Option<String>,
}

/// Execute a full reconcile plan against a remote client.
pub fn apply<C: ApiClient>(client: &C, plan: &ReconcilePlan, options: &ApplyOptions) -> ApplySummary {
    let mut results = Vec::new();

    for action in &plan.creates {
        results.push(apply_one(client, action, options));
    }
    for action in &plan.updates {
        results.push(apply_one(client, action, options));
    }
    for action in &plan.deletes {
        results.push(apply_one(client, action, options));
    }
    for action in &plan.skipped {
        results.push(skip_result(action));
    }

    ApplySummary { results }
}

fn skip_result(action: &PlanAction) -> ApplyResult {
    let PlanAction::Skip { id, reason } = action else {
        unreachable!("skip_result only ever receives PlanAction::Skip")
    };
    ApplyResult {
        id: id.clone(),
        outcome: ActionOutcome::NotExecuted { reason: reason.to_string() },
    }
}

fn apply_one<C: ApiClient>(client: &C, action: &PlanAction, options: &ApplyOptions) -> ApplyResult {
    let id = action.id().clone();

    if options.dry_run {
        return ApplyResult {
            id,
            outcome: ActionOutcome::NotExecuted { reason: "dry run".to_owned() },
        };
    }

    let outcome = match action {
        PlanAction::Create { desired, .. } => create(client, desired, options),
        PlanAction::Update { desired, .. } => write_existing(client, desired, options, false),
        PlanAction::Adopt { desired, .. } => write_existing(client, desired, options, true),
        PlanAction::Delete { remote_id, .. } => delete(client, id.kind, remote_id),
        PlanAction::Skip { reason, .. } => ActionOutcome::NotExecuted { reason: reason.to_string() },
    };

    ApplyResult { id, outcome }
}

fn stamp(resource: &crate::model::Resource, options: &ApplyOptions, adopted_from: Option<&str>) -> RemoteResource {
    let layer = resource.spec.layer.unwrap_or(crate::model::Layer::Base);
    let managed = ManagedMetadata {
        managed_by: crate::model::RECONCILER_ID.to_owned(),
        layer,
        org: options.org.clone(),
        project: options.project.clone(),
        package_version: options.package_version.clone(),
        last_synced: Some(options.now.clone()),
        description: resource.metadata.description.clone(),
        source_path: None,
        adopted_at: adopted_from.map(|_| options.now.clone()),
        original_name: adopted_from.map(str::to_owned),
    };

    let mut remote = RemoteResource::new(
        resource.status.as_ref().and_then(|s| s.remote_id.clone()).unwrap_or_default(),
        resource.metadata.name.clone(),
    );
    remote.fields = resource.spec.fields.clone().into_iter().collect();

    match resource.kind {
        ResourceKind::Block | ResourceKind::Folder => {
            remote.metadata = managed.to_metadata_map();
            if let Some(desc) = &resource.metadata.description {
                remote.fields.insert("description".to_owned(), serde_json::Value::String(desc.clone()));
            }
        }
        _ => {
            remote.tags = managed.to_tags();
        }
    }

    remote
}

fn create<C: ApiClient>(client: &C, desired: &crate::model::Resource, options: &ApplyOptions) -> ActionOutcome {
    let body = stamp(desired, options, None);
    let result = match desired.kind {
        ResourceKind::Block => client.blocks().create(&body).map(|r| r.id),
        ResourceKind::Tool => client.tools().create(&body).map(|r| r.id),
        ResourceKind::Folder => client.folders().create(&body).map(|r| r.id),
        other => return ActionOutcome::Failed { error: format!("create not supported for {other}") },
    };
    match result {
        Ok(remote_id) => ActionOutcome::Created { remote_id },
        Err(e) => ActionOutcome::Failed { error: e.to_string() },
    }
}

fn write_existing<C: ApiClient>(client: &C, desired: &crate::model::Resource, options: &ApplyOptions, is_adopt: bool) -> ActionOutcome {
    let Some(remote_id) = desired.status.as_ref().and_then(|s| s.remote_id.clone()) else {
        return ActionOutcome::Failed { error: "missing remote id for update".to_owned() };
    };
    let original_name = is_adopt.then_some(desired.metadata.name.as_str());
    let body = stamp(desired, options, original_name);
    let result = match desired.kind {
        ResourceKind::Block => client.blocks().update(&remote_id, &body).map(|_| ()),
        ResourceKind::Tool => client.tools().update(&remote_id, &body).map(|_| ()),
        ResourceKind::Folder => client.folders().update(&remote_id, &body).map(|_| ()),
        other => return ActionOutcome::Failed { error: format!("update not supported for {other}") },
    };
    match result {
        Ok(()) if is_adopt => ActionOutcome::Adopted,
        Ok(()) => ActionOutcome::Updated,
        Err(e) => ActionOutcome::Failed { error: e.to_string() },
    }
}

fn delete<C: ApiClient>(client: &C, kind: ResourceKind, remote_id: &str) -> ActionOutcome {
    let result = match kind {
        ResourceKind::Block => client.blocks().delete(remote_id),
        ResourceKind::Tool => client.tools().delete(remote_id),
        ResourceKind::Folder => client.folders().delete(remote_id),
        other => return ActionOutcome::Failed { error: format!("delete not supported for {other}") },
    };
    match tolerate_not_found(result) {
        Ok(()) => ActionOutcome::Deleted,
        Err(e) => ActionOutcome::Failed { error: e.to_string() },
    }
}

/// Deleting something already gone is a success, not a failure (§4.4:
/// delete tolerates "not found" as idempotent).
fn tolerate_not_found(result: Result<(), ApiError>) -> Result<(), ApiError> {
    match result {
        Err(ApiError::NotFound(_)) => Ok(()),
        other => other,
    }
}
