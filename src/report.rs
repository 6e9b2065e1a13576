//! Human and JSON renderings of scenario outcomes.

use crate::error::Result;
use crate::runner::ScenarioOutcome;
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub passed: usize,
    pub failed: usize,
    pub scenarios: &'a [ScenarioOutcome],
}

impl<'a> RunSummary<'a> {
    pub fn new(scenarios: &'a [ScenarioOutcome]) -> Self {
        let passed = scenarios.iter().filter(|o| o.passed()).count();
        Self {
            passed,
            failed: scenarios.len() - passed,
            scenarios,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub fn render_json(outcomes: &[ScenarioOutcome]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&RunSummary::new(outcomes))?)
}

pub fn render_text(outcomes: &[ScenarioOutcome]) -> String {
    let summary = RunSummary::new(outcomes);
    let mut out = String::new();

    let name_width = outcomes
        .iter()
        .map(|o| o.scenario.len())
        .max()
        .unwrap_or(0)
        .max(16);

    for outcome in outcomes {
        let status = if outcome.passed() { "PASS" } else { "FAIL" };
        let _ = writeln!(
            out,
            "{}  {:<width$}  {:<18}  {:>7.1}s",
            status,
            outcome.scenario,
            outcome.name_prefix,
            outcome.duration_secs,
            width = name_width,
        );

        if let Some(error) = &outcome.error {
            let _ = writeln!(out, "      [{}] {}", error.kind, error.message);
        }
        for failure in &outcome.failures {
            let _ = writeln!(out, "      [assertion] {}", failure);
        }
        if let Some(teardown) = &outcome.teardown_error {
            let _ = writeln!(out, "      [teardown] {}", teardown);
            if let Some(dir) = &outcome.workdir {
                let _ = writeln!(
                    out,
                    "      state kept in {}; clean up with: s2s-harness destroy {} --prefix {}",
                    dir.display(),
                    outcome.scenario,
                    outcome.name_prefix
                );
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} passed, {} failed",
        summary.passed, summary.failed
    );
    out
}
