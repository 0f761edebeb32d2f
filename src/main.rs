//! `agentsync` CLI: loads layered manifests, merges them, and either
//! prints the resulting reconcile plan (`plan`) or applies it against a
//! remote tenant (`apply`).
//!
//! Constructing the remote `ApiClient` (credential resolution, HTTP
//! transport, retry/backoff) is outside this crate's scope; `apply`
//! reports that boundary explicitly rather than faking a client.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use agentsync::config::{self, AgentSyncConfig};
use agentsync::loader;
use agentsync::merge;
use agentsync::model::Layer;
use agentsync::reconcile::{self, ReconcileOptions, RemoteInventory};
use agentsync::telemetry;

#[derive(Parser)]
#[command(name = "agentsync", about = "Declarative reconciliation for agent-platform tenants")]
struct Cli {
    /// Path to the base-layer manifest directory.
    #[arg(long)]
    base: Option<PathBuf>,

    /// Path to the org-layer manifest directory.
    #[arg(long)]
    org: Option<PathBuf>,

    /// Path to the project-layer manifest directory.
    #[arg(long)]
    project: Option<PathBuf>,

    /// Path to `agentsync.toml`. Missing file falls back to defaults.
    #[arg(long, default_value = "agentsync.toml")]
    config: PathBuf,

    /// Compute outcomes but issue no remote calls.
    #[arg(long)]
    dry_run: bool,

    /// Allow orphaned managed resources to be proposed for deletion.
    #[arg(long)]
    allow_delete: bool,

    /// Bypass the breaking-change precondition gate.
    #[arg(long)]
    force: bool,

    /// Max in-flight agents during a batch upgrade.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Raise the log level to debug.
    #[arg(long)]
    verbose: bool,

    /// The manifest package version (sha) being applied.
    #[arg(long)]
    package_version: Option<String>,

    /// Pin a layer's upgrade target: `layer=version`, repeatable.
    #[arg(long = "target-version", value_parser = parse_target_version)]
    target_versions: Vec<(Layer, String)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, merge, and reconcile; print the resulting action counts.
    Plan,
    /// Apply the reconcile plan against the remote tenant.
    Apply,
}

fn parse_target_version(s: &str) -> Result<(Layer, String), String> {
    let (layer, version) = s.split_once('=').ok_or_else(|| format!("expected `layer=version`, got {s:?}"))?;
    let layer = match layer {
        "base" => Layer::Base,
        "org" => Layer::Org,
        "project" => Layer::Project,
        other => return Err(format!("unknown layer {other:?} (expected base, org, or project)")),
    };
    if version.is_empty() {
        return Err("version must not be empty".to_owned());
    }
    Ok((layer, version.to_owned()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var(config::ENV_LOG_LEVEL, "debug");
    }
    let _telemetry = telemetry::init();

    let cfg = AgentSyncConfig::load(&cli.config).context("loading agentsync.toml")?;

    let mut paths = BTreeMap::new();
    if let Some(path) = &cli.base {
        paths.insert(Layer::Base, path.clone());
    }
    if let Some(path) = &cli.org {
        paths.insert(Layer::Org, path.clone());
    }
    if let Some(path) = &cli.project {
        paths.insert(Layer::Project, path.clone());
    }
    if paths.is_empty() {
        anyhow::bail!("at least one of --base, --org, --project must be given");
    }

    let packages = loader::load_layered_packages(&paths).context("loading manifest layers")?;
    let merged = merge::merge_packages(&packages, &merge::MergeOptions::default()).context("merging manifest layers")?;
    for warning in &merged.warnings {
        tracing::warn!(%warning, "merge warning");
    }

    tracing::debug!(
        dry_run = cli.dry_run,
        force = cli.force,
        concurrency = cli.concurrency,
        package_version = ?cli.package_version,
        target_versions = ?cli.target_versions,
        "invocation options",
    );

    let remote = RemoteInventory::default();
    let reconcile_options = ReconcileOptions { allow_delete: cli.allow_delete, ..Default::default() };
    let plan = reconcile::plan(&merged.desired_state, &remote, &reconcile_options);

    match cli.command {
        Commands::Plan => {
            println!("org default: {:?}", cfg.defaults.org);
            println!("creates: {}", plan.creates.len());
            println!("updates: {}", plan.updates.len());
            println!("deletes: {}", plan.deletes.len());
            println!("skipped: {}", plan.skipped.len());
            Ok(())
        }
        Commands::Apply => {
            anyhow::bail!(
                "apply requires a configured remote ApiClient (credential resolution and HTTP \
                 transport against the platform tenant), which is outside this crate's scope; \
                 construct an agentsync_api::ApiClient implementation and call agentsync::apply::apply \
                 directly from a host program"
            )
        }
    }
}
