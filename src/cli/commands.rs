//! CLI command implementations
//!
//! `advise` and `families` are pure: they read JSON files and print the
//! advisor's answer. `simulate` runs the whole index lifecycle against
//! in-memory collaborators and a stepped clock, so the job flow can be
//! inspected without a database.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::advisor::{candidate_families, extract_query_families, indexes_to_create, ConcreteIndex};
use crate::lifecycle::{
    Credentials, IndexOrchestrator, LifecycleConfig, MemoryCatalog, MemoryIterationRepository,
    MemoryJobQueue, RolePermissions, ScenarioIteration, Worker,
};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_json_file, write_error, write_response};

/// Queue passes after which `simulate` gives up
const MAX_SIMULATION_PASSES: usize = 64;

/// Configuration file structure (`rulegate.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Index lifecycle settings
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", &path.display().to_string())],
        );
        Ok(config)
    }

    /// Load from `path`, or defaults when no file is given
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> CliResult<()> {
        self.lifecycle
            .validate()
            .map_err(|e| CliError::config_error(e.to_string()))
    }
}

/// Parse arguments, run the command and print its answer.
///
/// Failures are printed as an error response and returned.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();

    Logger::set_stderr_only(true);
    if cli.verbose {
        Logger::set_min_severity(Severity::Trace);
    }

    let result = run_command(cli.command).and_then(write_response);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command, returning its response data
pub fn run_command(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Advise { scenario, existing } => advise(&scenario, existing.as_deref()),
        Command::Families { scenario } => families(&scenario),
        Command::Simulate {
            scenario,
            existing,
            config,
        } => simulate(&scenario, existing.as_deref(), config.as_deref()),
    }
}

fn load_scenario(path: &Path) -> CliResult<ScenarioIteration> {
    read_json_file(path)
}

fn load_existing(path: Option<&Path>) -> CliResult<Vec<ConcreteIndex>> {
    match path {
        Some(path) => read_json_file(path),
        None => Ok(Vec::new()),
    }
}

/// Indexes the scenario needs on top of `existing`
pub fn advise(scenario: &Path, existing: Option<&Path>) -> CliResult<Value> {
    let iteration = load_scenario(scenario)?;
    let existing = load_existing(existing)?;

    let advice = indexes_to_create(iteration.asts(), &existing)?;
    Ok(json!({
        "to_create": advice.to_create,
        "stats": advice.stats,
    }))
}

/// Aggregation shapes of the scenario, each with its candidate families
pub fn families(scenario: &Path) -> CliResult<Value> {
    let iteration = load_scenario(scenario)?;
    let query_families = extract_query_families(iteration.asts())?;

    let entries: Vec<Value> = query_families
        .iter()
        .map(|family| {
            let candidates: Vec<String> = candidate_families(family)
                .iter()
                .map(|c| c.to_string())
                .collect();
            json!({
                "family": family,
                "indexable": family.is_indexable(),
                "candidates": candidates,
            })
        })
        .collect();

    Ok(json!({ "query_families": entries }))
}

/// Advises, submits and verifies indexes on an in-memory catalog
pub fn simulate(
    scenario: &Path,
    existing: Option<&Path>,
    config: Option<&Path>,
) -> CliResult<Value> {
    let config = Config::load_or_default(config)?;
    let mut iteration = load_scenario(scenario)?;
    if iteration.id.is_nil() {
        iteration.id = Uuid::new_v4();
    }
    let org_id = iteration.org_id;
    let iteration_id = iteration.id;

    let catalog = Arc::new(MemoryCatalog::instant());
    for index in load_existing(existing)? {
        catalog.add_valid(org_id, index)?;
    }
    let queue = Arc::new(MemoryJobQueue::new());
    let repository = MemoryIterationRepository::new();
    repository.insert(iteration)?;

    let orchestrator = IndexOrchestrator::new(
        catalog.clone(),
        queue.clone(),
        Arc::new(repository),
        Arc::new(RolePermissions),
        config.lifecycle,
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let (advice, passes) = runtime.block_on(async {
        let advice = orchestrator
            .ensure_indexes_for_iteration(&Credentials::service(), iteration_id)
            .await?;

        let creation = orchestrator.creation_worker();
        let status = orchestrator.status_worker();
        let workers: [&dyn Worker; 2] = [&creation, &status];

        let mut now = Utc::now();
        let mut passes = 0;
        while let Some(next) = queue.next_scheduled_at() {
            if passes >= MAX_SIMULATION_PASSES {
                return Err(CliError::input_error(format!(
                    "Lifecycle did not settle after {} queue passes",
                    MAX_SIMULATION_PASSES
                )));
            }
            now = now.max(next);
            queue.run_due(&workers, now).await?;
            passes += 1;
        }
        Ok::<_, CliError>((advice, passes))
    })?;

    Ok(json!({
        "to_create": advice.to_create,
        "num_pending": advice.num_pending,
        "queue_passes": passes,
        "valid_indexes": catalog.valid_indexes(org_id)?,
        "discarded_jobs": queue.discarded().len(),
        "metrics": orchestrator.metrics().snapshot(),
    }))
}
