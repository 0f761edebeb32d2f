//! The Batch Upgrade Executor (§4.10). Runs upgrade plans across many
//! agents with bounded in-flight concurrency, isolating failures so one
//! agent's problem never silently swallows the rest of the run.

use std::time::Instant;

use agentsync_api::ApiClient;

use crate::model::UpgradePlan;
use crate::upgrade::applier::{apply_upgrade_plan, can_proceed_with_upgrade, ActionOutcome, ApplyUpgradeOptions, ApplyUpgradeResult};
use crate::upgrade::planner::AgentState;

/// Options governing one batch pass (§4.10 Scheduling).
#[derive(Clone, Debug)]
pub struct BatchOptions {
    /// At most this many agents in flight at once. `1` is sequential.
    pub concurrency: usize,
    /// Keep processing remaining agents after one fails. Defaults to
    /// `true` (§4.10 Failure isolation).
    pub continue_on_failure: bool,
    /// Override the breaking/pinned safety gate for every agent.
    pub force: bool,
    /// Compute outcomes but issue no remote calls.
    pub dry_run: bool,
    /// Timestamp (RFC 3339) threaded into every agent's apply pass.
    pub now: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            continue_on_failure: true,
            force: false,
            dry_run: false,
            now: String::new(),
        }
    }
}

/// Where one agent landed in the batch.
#[derive(Clone, Debug, PartialEq)]
pub enum AgentStatus {
    /// The agent already matched its desired state.
    UpToDate,
    /// Withheld by the safety gate; carries the refusal reason.
    Skipped {
        /// Why the agent's upgrade was withheld.
        reason: String,
    },
    /// Applied without any action failing.
    Applied,
    /// At least one action failed.
    Failed {
        /// The first failure's error text.
        error: String,
    },
}

/// One agent's outcome within a batch run.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchAgentResult {
    /// The agent this result concerns.
    pub agent_id: String,
    /// Where it landed.
    pub status: AgentStatus,
    /// The plan computed for it, if one was computed.
    pub plan: Option<UpgradePlan>,
    /// The apply pass result, if the plan was actually applied.
    pub apply: Option<ApplyUpgradeResult>,
}

/// Reported to a [`BatchObserver`] before an agent starts (§4.10 Progress).
#[derive(Clone, Debug, PartialEq)]
pub struct BatchProgress {
    /// The agent about to be processed.
    pub current_agent: String,
    /// 1-based position of this agent in the batch.
    pub current: usize,
    /// Total agents in the batch.
    pub total: usize,
    /// `current / total * 100`.
    pub percentage: f64,
    /// Milliseconds elapsed since the batch started.
    pub elapsed_ms: u64,
    /// Extrapolated milliseconds remaining, based on progress so far.
    pub estimated_remaining_ms: u64,
}

/// Synchronous progress/completion callbacks the batch executor invokes
/// from whichever worker is processing an agent (§9 Design notes:
/// "async-callback progress reporting" re-architected as two plain
/// methods with default no-op bodies).
pub trait BatchObserver: Send + Sync {
    /// Called just before an agent's pipeline starts.
    fn on_progress(&self, _progress: &BatchProgress) {}
    /// Called once an agent's pipeline has finished.
    fn on_agent_complete(&self, _result: &BatchAgentResult) {}
}

/// Aggregated counts across a batch run (§4.10 Aggregated stats).
///
/// `total` reflects agents actually processed, so the accounting
/// invariant `succeeded + failed + skipped + up_to_date = total` holds
/// even when `continue_on_failure = false` stopped the run early.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchStats {
    /// Agents actually processed.
    pub total: usize,
    /// Agents applied without any action failing.
    pub succeeded: usize,
    /// Agents with at least one failed action.
    pub failed: usize,
    /// Agents withheld by the safety gate.
    pub skipped: usize,
    /// Agents already at their desired state.
    pub up_to_date: usize,
    /// Sum of `plan.summary.total_changes()` across applied agents.
    pub total_changes_applied: usize,
    /// Sum of `plan.summary.breaking_changes` across every processed agent.
    pub total_breaking_changes: usize,
    /// Sum of `plan.summary.safe_changes` across every processed agent.
    pub total_safe_changes: usize,
    /// Wall-clock duration of the whole batch run.
    pub total_duration_ms: u64,
}

/// The full result of a batch run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchUpgradeResult {
    /// Aggregated counts.
    pub stats: BatchStats,
    /// Per-agent results, in completion order within each chunk.
    pub results: Vec<BatchAgentResult>,
}

/// Run upgrade plans across many agents (§4.10 Operation).
///
/// `compute_plan` is the per-agent planner (role resolution, remote-id
/// lookup, and [`crate::upgrade::planner::plan`] already folded in by the
/// caller) — this executor only handles scheduling, gating, and
/// accounting, not plan construction itself.
pub fn execute_batch_upgrade<C, F>(
    client: &C,
    agents: &[AgentState],
    compute_plan: F,
    options: &BatchOptions,
    observer: Option<&(dyn BatchObserver)>,
) -> BatchUpgradeResult
where
    C: ApiClient + Sync,
    F: Fn(&AgentState) -> UpgradePlan + Sync,
{
    let start = Instant::now();
    let total = agents.len();
    let concurrency = options.concurrency.max(1);
    let mut slots: Vec<Option<BatchAgentResult>> = (0..total).map(|_| None).collect();

    let indexed: Vec<(usize, &AgentState)> = agents.iter().enumerate().collect();
    let mut processed = 0_usize;
    let mut stop = false;

    for chunk in indexed.chunks(concurrency) {
        if stop {
            break;
        }

        let chunk_results: Vec<(usize, BatchAgentResult)> = std::thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|&(idx, agent)| {
                    let compute_plan = &compute_plan;
                    scope.spawn(move || {
                        if let Some(obs) = observer {
                            obs.on_progress(&BatchProgress {
                                current_agent: agent.agent_id.clone(),
                                current: idx + 1,
                                total,
                                percentage: (idx + 1) as f64 / total.max(1) as f64 * 100.0,
                                elapsed_ms: start.elapsed().as_millis() as u64,
                                estimated_remaining_ms: 0,
                            });
                        }
                        let result = run_one(client, agent, compute_plan, options);
                        (idx, result)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("batch worker panicked")).collect()
        });

        for (idx, result) in chunk_results {
            if let Some(obs) = observer {
                obs.on_agent_complete(&result);
            }
            let failed = matches!(result.status, AgentStatus::Failed { .. });
            slots[idx] = Some(result);
            processed += 1;
            if failed && !options.continue_on_failure {
                stop = true;
            }
        }
    }

    let mut stats = BatchStats {
        total: processed,
        ..Default::default()
    };
    let mut results = Vec::with_capacity(processed);
    for slot in slots.into_iter().flatten() {
        match &slot.status {
            AgentStatus::UpToDate => stats.up_to_date += 1,
            AgentStatus::Skipped { .. } => stats.skipped += 1,
            AgentStatus::Applied => stats.succeeded += 1,
            AgentStatus::Failed { .. } => stats.failed += 1,
        }
        if let Some(plan) = &slot.plan {
            stats.total_safe_changes += plan.summary.safe_changes;
            stats.total_breaking_changes += plan.summary.breaking_changes;
            if matches!(slot.status, AgentStatus::Applied) {
                stats.total_changes_applied += plan.summary.total_changes();
            }
        }
        results.push(slot);
    }
    stats.total_duration_ms = start.elapsed().as_millis() as u64;

    BatchUpgradeResult { stats, results }
}

fn run_one<C: ApiClient>(client: &C, agent: &AgentState, compute_plan: &impl Fn(&AgentState) -> UpgradePlan, options: &BatchOptions) -> BatchAgentResult {
    let plan = compute_plan(agent);

    if !plan.has_changes() {
        return BatchAgentResult {
            agent_id: agent.agent_id.clone(),
            status: AgentStatus::UpToDate,
            plan: Some(plan),
            apply: None,
        };
    }

    if let Err(reason) = can_proceed_with_upgrade(&plan, options.force) {
        return BatchAgentResult {
            agent_id: agent.agent_id.clone(),
            status: AgentStatus::Skipped { reason },
            plan: Some(plan),
            apply: None,
        };
    }

    let apply_options = ApplyUpgradeOptions {
        force: options.force,
        dry_run: options.dry_run,
        now: options.now.clone(),
    };
    let apply_result = apply_upgrade_plan(client, agent, &plan, &apply_options);
    let first_failure = apply_result.results.iter().find_map(|r| match &r.outcome {
        ActionOutcome::Failed { error } => Some(error.clone()),
        _ => None,
    });

    let status = match first_failure {
        Some(error) => AgentStatus::Failed { error },
        None => AgentStatus::Applied,
    };

    BatchAgentResult {
        agent_id: agent.agent_id.clone(),
        status,
        plan: Some(plan),
        apply: Some(apply_result),
    }
}
