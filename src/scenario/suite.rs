//! Sequential execution of a scenario suite

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use super::assertions;
use super::result::ScenarioResult;
use super::runner::{IsolatedRun, LaunchContext, Launcher};
use super::spec::{FailurePolicy, SuiteConfig};
use crate::{BenchError, ErrorCategory, Result};

/// How one scenario ended.
#[derive(Debug)]
pub enum ScenarioStatus {
    Passed(ScenarioResult),
    /// The run produced a result that violated an assertion
    Failed { result: ScenarioResult, error: BenchError },
    /// The run produced no usable result (timeout, crash, bad output)
    Errored(BenchError),
    /// Not run because an earlier scenario failed under [`FailurePolicy::Abort`]
    Skipped,
}

impl ScenarioStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, ScenarioStatus::Passed(_))
    }

    pub fn error(&self) -> Option<&BenchError> {
        match self {
            ScenarioStatus::Failed { error, .. } | ScenarioStatus::Errored(error) => Some(error),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&ScenarioResult> {
        match self {
            ScenarioStatus::Passed(result) | ScenarioStatus::Failed { result, .. } => Some(result),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ScenarioStatus::Passed(_) => "passed",
            ScenarioStatus::Failed { .. } => "failed",
            ScenarioStatus::Errored(e) if e.category() == ErrorCategory::Timeout => "timed out",
            ScenarioStatus::Errored(_) => "errored",
            ScenarioStatus::Skipped => "skipped",
        }
    }
}

/// Outcome of one scenario in a suite run.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub status: ScenarioStatus,
    pub elapsed: Duration,
}

/// Outcomes of a suite run, in scenario order.
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.error().is_some()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o.status, ScenarioStatus::Skipped)).count()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_pass())
    }

    pub fn outcome(&self, name: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Machine-readable summary.
    pub fn summary(&self) -> Vec<OutcomeSummary<'_>> {
        self.outcomes
            .iter()
            .map(|o| OutcomeSummary {
                name: &o.name,
                status: o.status.label(),
                elapsed_ms: o.elapsed.as_millis() as u64,
                error: o.status.error().map(ToString::to_string),
                result: o.status.result(),
            })
            .collect()
    }

    /// `Ok` when every scenario passed, otherwise the first failure.
    pub fn into_result(self) -> Result<()> {
        for outcome in self.outcomes {
            match outcome.status {
                ScenarioStatus::Failed { error, .. } | ScenarioStatus::Errored(error) => {
                    return Err(error);
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            write!(
                f,
                "{:<10} {} ({:.1}s)",
                outcome.status.label(),
                outcome.name,
                outcome.elapsed.as_secs_f64()
            )?;
            if let Some(error) = outcome.status.error() {
                write!(f, ": {error}")?;
            }
            writeln!(f)?;
        }
        write!(f, "{} passed, {} failed, {} skipped", self.passed(), self.failed(), self.skipped())
    }
}

/// Serializable view of one outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeSummary<'a> {
    pub name: &'a str,
    pub status: &'static str,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    pub result: Option<&'a ScenarioResult>,
}

/// Runs a suite's scenarios one at a time, each in its own process.
pub struct SuiteRunner {
    config: SuiteConfig,
    launcher: Arc<dyn Launcher>,
}

impl SuiteRunner {
    pub fn new(config: SuiteConfig, launcher: Arc<dyn Launcher>) -> Self {
        Self { config, launcher }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub async fn run(&self) -> SuiteReport {
        let mut report = SuiteReport::default();
        let mut aborted = false;

        info!(
            scenarios = self.config.scenarios.len(),
            policy = ?self.config.failure_policy,
            "Running suite"
        );

        for scenario in &self.config.scenarios {
            if aborted {
                report.outcomes.push(ScenarioOutcome {
                    name: scenario.name.clone(),
                    status: ScenarioStatus::Skipped,
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            let started = Instant::now();
            let context = LaunchContext {
                scenario,
                target_host: &self.config.target_host,
                frame_budget: self.config.frame_budget_for(scenario),
                timeout: self.config.timeout_for(scenario),
            };

            let status = match IsolatedRun::new(context).execute(self.launcher.as_ref()).await {
                Ok(result) => match assertions::check(scenario, &result) {
                    Ok(()) => ScenarioStatus::Passed(result),
                    Err(error) => ScenarioStatus::Failed { result, error },
                },
                Err(error) => ScenarioStatus::Errored(error),
            };
            let elapsed = started.elapsed();

            match status.error() {
                None => info!(scenario = %scenario.name, ?elapsed, "Scenario passed"),
                Some(e) => {
                    error!(scenario = %scenario.name, error = %e, "Scenario {}", status.label());
                    if self.config.failure_policy == FailurePolicy::Abort {
                        warn!("Aborting suite after first failure");
                        aborted = true;
                    }
                }
            }

            report.outcomes.push(ScenarioOutcome { name: scenario.name.clone(), status, elapsed });
        }

        info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Suite finished"
        );
        report
    }
}
