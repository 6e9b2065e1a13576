//! Scenario lifecycle: provision, verify, tear down.
//!
//! Teardown is owned by a [`TeardownGuard`] created before the first tool
//! call. The guard runs `destroy` exactly once, either through
//! [`TeardownGuard::finish`] or from `Drop` when the scenario unwinds.

use crate::assertions::{evaluate, AssertionFailure, Expectation, Subject};
use crate::cloud::{self, CloudInspector, ResourceKind, Snapshot};
use crate::error::{HarnessError, Result};
use crate::retry::with_retry;
use crate::scenario::ScenarioConfig;
use crate::tool::{OutputSet, ProvisioningTool};
use crate::workdir;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Scenario-specific verification, run after a successful apply.
pub type CheckFn = fn(&mut Checker<'_>) -> Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Configured,
    Provisioned,
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub kind: String,
    pub message: String,
}

impl From<&HarnessError> for FailureRecord {
    fn from(err: &HarnessError) -> Self {
        FailureRecord {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub name_prefix: String,
    pub region: String,
    pub phase: Phase,
    /// First fatal error. Later errors never replace it.
    pub error: Option<FailureRecord>,
    pub failures: Vec<AssertionFailure>,
    pub torn_down: bool,
    pub teardown_error: Option<String>,
    pub workdir: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

impl ScenarioOutcome {
    pub fn new(config: &ScenarioConfig) -> Self {
        Self {
            scenario: config.scenario().to_string(),
            name_prefix: config.name_prefix().to_string(),
            region: config.region().to_string(),
            phase: Phase::Configured,
            error: None,
            failures: Vec::new(),
            torn_down: false,
            teardown_error: None,
            workdir: None,
            started_at: Utc::now(),
            duration_secs: 0.0,
        }
    }

    /// Outcome for a scenario whose worker died without reporting.
    pub fn aborted(config: &ScenarioConfig, message: impl Into<String>) -> Self {
        let mut outcome = Self::new(config);
        outcome.error = Some(FailureRecord {
            kind: "panic".to_string(),
            message: message.into(),
        });
        outcome
    }

    pub fn record_error(&mut self, err: &HarnessError) {
        if self.error.is_none() {
            self.error = Some(err.into());
        }
    }

    pub fn passed(&self) -> bool {
        self.error.is_none()
            && self.failures.is_empty()
            && self.torn_down
            && self.teardown_error.is_none()
    }
}

/// Calls `destroy` exactly once for the scenario it guards.
pub struct TeardownGuard<'a> {
    tool: &'a dyn ProvisioningTool,
    config: &'a ScenarioConfig,
    done: bool,
}

impl<'a> TeardownGuard<'a> {
    pub fn new(tool: &'a dyn ProvisioningTool, config: &'a ScenarioConfig) -> Self {
        Self {
            tool,
            config,
            done: false,
        }
    }

    pub fn finish(mut self) -> Result<()> {
        self.done = true;
        teardown(self.tool, self.config)
    }
}

impl Drop for TeardownGuard<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        tracing::warn!(
            "[{}] Scenario unwound before teardown, destroying now",
            self.config.name_prefix()
        );
        if let Err(e) = teardown(self.tool, self.config) {
            tracing::error!("[{}] {}", self.config.name_prefix(), e);
        }
    }
}

fn into_provision_error(err: HarnessError) -> HarnessError {
    match err {
        HarnessError::Tool(msg) => HarnessError::Provision(msg),
        other => other,
    }
}

/// `init` then `apply` under the scenario's retry policy, then read outputs.
pub fn provision(
    tool: &dyn ProvisioningTool,
    config: &ScenarioConfig,
    interrupt: Option<&AtomicBool>,
) -> Result<OutputSet> {
    let prefix = config.name_prefix();

    with_retry(&format!("[{}] init", prefix), config.retry(), interrupt, || {
        tool.init(config)
    })
    .map_err(into_provision_error)?;

    with_retry(&format!("[{}] apply", prefix), config.retry(), interrupt, || {
        tool.apply(config)
    })
    .map_err(into_provision_error)?;

    tool.outputs(config)
}

/// `destroy` under the scenario's retry policy. Never interrupted.
pub fn teardown(tool: &dyn ProvisioningTool, config: &ScenarioConfig) -> Result<()> {
    let prefix = config.name_prefix();
    with_retry(&format!("[{}] destroy", prefix), config.retry(), None, || {
        tool.destroy(config)
    })
    .map_err(|e| match e {
        HarnessError::Provision(msg) | HarnessError::Tool(msg) => HarnessError::Teardown(msg),
        HarnessError::Teardown(msg) => HarnessError::Teardown(msg),
        other => HarnessError::Teardown(other.to_string()),
    })?;
    tracing::info!("[{}] Destroyed", prefix);
    Ok(())
}

/// Handle passed to scenario checks: outputs, live lookups and recorded
/// assertion failures.
pub struct Checker<'a> {
    config: &'a ScenarioConfig,
    outputs: &'a OutputSet,
    cloud: &'a dyn CloudInspector,
    failures: Vec<AssertionFailure>,
}

impl<'a> Checker<'a> {
    pub fn new(
        config: &'a ScenarioConfig,
        outputs: &'a OutputSet,
        cloud: &'a dyn CloudInspector,
    ) -> Self {
        Self {
            config,
            outputs,
            cloud,
            failures: Vec::new(),
        }
    }

    pub fn config(&self) -> &'a ScenarioConfig {
        self.config
    }

    /// Non-empty text output; absence is fatal.
    pub fn require_output(&self, name: &str) -> Result<String> {
        self.outputs.require_text(name).map(str::to_string)
    }

    pub fn output_or_empty(&self, name: &str) -> String {
        self.outputs.text_or_empty(name).to_string()
    }

    pub fn output_list(&self, name: &str) -> Result<Vec<String>> {
        self.outputs.require_list(name)
    }

    /// Live state for the resource whose id is held in output `id_output`.
    pub fn fetch(&self, kind: ResourceKind, id_output: &str) -> Result<Snapshot> {
        let snapshot = cloud::fetch_from_outputs(
            self.cloud,
            self.config.region(),
            self.outputs,
            kind,
            id_output,
        )?;
        tracing::debug!("[{}] Fetched {}", self.config.name_prefix(), snapshot.label());
        Ok(snapshot)
    }

    /// Record a failure if `expectation` does not hold; returns whether it held.
    pub fn expect(&mut self, snapshot: &Snapshot, expectation: Expectation) -> bool {
        self.check(Subject::Resource(snapshot), &expectation)
    }

    pub fn expect_output(&mut self, name: &str, expectation: Expectation) -> bool {
        match self.outputs.get(name) {
            Some(value) => self.check(Subject::Output { name, value }, &expectation),
            None => {
                self.record(AssertionFailure {
                    expectation: expectation.to_string(),
                    resource: format!("output {}", name),
                    detail: "output not found".to_string(),
                });
                false
            }
        }
    }

    pub fn into_failures(self) -> Vec<AssertionFailure> {
        self.failures
    }

    fn check(&mut self, subject: Subject<'_>, expectation: &Expectation) -> bool {
        match evaluate(subject, expectation) {
            None => true,
            Some(failure) => {
                self.record(failure);
                false
            }
        }
    }

    fn record(&mut self, failure: AssertionFailure) {
        tracing::warn!("[{}] {}", self.config.name_prefix(), failure);
        self.failures.push(failure);
    }
}

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub module_root: PathBuf,
    pub work_dir: PathBuf,
    /// Run each scenario against its own copy of the module root.
    pub isolate_workdir: bool,
    /// Keep the copy even after a clean teardown.
    pub keep_workdir: bool,
}

pub struct ScenarioRunner {
    tool: Arc<dyn ProvisioningTool>,
    cloud: Arc<dyn CloudInspector>,
    settings: RunnerSettings,
    interrupt: Arc<AtomicBool>,
}

impl ScenarioRunner {
    pub fn new(
        tool: Arc<dyn ProvisioningTool>,
        cloud: Arc<dyn CloudInspector>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            tool,
            cloud,
            settings,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Point `config` at the directory the tool should run in, copying the
    /// module root first when isolation is on.
    fn prepare(&self, config: &ScenarioConfig) -> Result<(ScenarioConfig, Option<PathBuf>)> {
        if !self.settings.isolate_workdir {
            let dir = self.settings.module_root.join(config.terraform_dir());
            return Ok((config.relocated(dir), None));
        }

        let root = workdir::scenario_workdir(&self.settings.work_dir, config.name_prefix());
        let copied = workdir::copy_module_tree(&self.settings.module_root, &root)?;
        tracing::debug!(
            "[{}] Copied {} files into {}",
            config.name_prefix(),
            copied,
            root.display()
        );
        Ok((config.relocated(root.join(config.terraform_dir())), Some(root)))
    }

    /// Resolve `config` against an existing work copy if one is present.
    fn locate_existing(&self, config: &ScenarioConfig) -> (ScenarioConfig, Option<PathBuf>) {
        let root = workdir::scenario_workdir(&self.settings.work_dir, config.name_prefix());
        if root.is_dir() {
            (config.relocated(root.join(config.terraform_dir())), Some(root))
        } else {
            let dir = self.settings.module_root.join(config.terraform_dir());
            (config.relocated(dir), None)
        }
    }

    pub fn run(&self, config: &ScenarioConfig, check: CheckFn) -> ScenarioOutcome {
        let timer = Instant::now();
        let mut outcome = ScenarioOutcome::new(config);
        let prefix = config.name_prefix().to_string();
        if self.interrupted() {
            tracing::info!("[{}] Interrupted before start, skipping", prefix);
            outcome.record_error(&HarnessError::Interrupted);
            return outcome;
        }
        tracing::info!("[{}] Starting scenario {}", prefix, config.scenario());

        let (config, workdir) = match self.prepare(config) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!("[{}] Could not prepare working directory: {}", prefix, e);
                outcome.record_error(&e);
                outcome.duration_secs = timer.elapsed().as_secs_f64();
                return outcome;
            }
        };
        outcome.workdir = workdir.clone();

        let guard = TeardownGuard::new(self.tool.as_ref(), &config);

        match provision(self.tool.as_ref(), &config, Some(self.interrupt.as_ref())) {
            Ok(outputs) => {
                outcome.phase = Phase::Provisioned;
                if self.interrupted() {
                    outcome.record_error(&HarnessError::Interrupted);
                } else {
                    let mut checker = Checker::new(&config, &outputs, self.cloud.as_ref());
                    let result = check(&mut checker);
                    outcome.failures = checker.into_failures();
                    match result {
                        Ok(()) => outcome.phase = Phase::Verified,
                        Err(e) => {
                            tracing::error!("[{}] {}", prefix, e);
                            outcome.record_error(&e);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!("[{}] {}", prefix, e);
                outcome.record_error(&e);
            }
        }

        match guard.finish() {
            Ok(()) => {
                outcome.torn_down = true;
                if let Some(root) = &workdir {
                    if !self.settings.keep_workdir {
                        if let Err(e) = workdir::remove_workdir(root) {
                            tracing::warn!("[{}] Failed to remove {}: {}", prefix, root.display(), e);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!("[{}] {}", prefix, e);
                outcome.teardown_error = Some(e.to_string());
            }
        }

        outcome.duration_secs = timer.elapsed().as_secs_f64();
        let status = if outcome.passed() { "passed" } else { "failed" };
        tracing::info!(
            "[{}] Scenario {} {} in {:.1}s",
            prefix,
            config.scenario(),
            status,
            outcome.duration_secs
        );
        outcome
    }

    /// Destroy a previously provisioned scenario, reusing its kept work copy.
    pub fn destroy_existing(&self, config: &ScenarioConfig) -> Result<()> {
        let (config, workdir) = self.locate_existing(config);
        teardown(self.tool.as_ref(), &config)?;
        if let Some(root) = workdir {
            workdir::remove_workdir(&root)?;
        }
        Ok(())
    }
}
