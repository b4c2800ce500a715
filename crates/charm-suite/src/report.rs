use crate::scenario::Scenario;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { reason: String },
    Skipped { reason: String },
    /// Expected to fail and did.
    #[serde(rename = "xfailed")]
    XFailed { reason: String },
    /// Expected to fail but passed.
    #[serde(rename = "xpassed")]
    XPassed,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed { .. } => "failed",
            Outcome::Skipped { .. } => "skipped",
            Outcome::XFailed { .. } => "xfailed",
            Outcome::XPassed => "xpassed",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Failed { reason }
            | Outcome::Skipped { reason }
            | Outcome::XFailed { reason } => Some(reason),
            Outcome::Passed | Outcome::XPassed => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{} ({reason})", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// ScenarioReport
// ---------------------------------------------------------------------------

/// Result of one scenario against one matrix case.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Matrix case id, e.g. `bionic-local`
    pub case: String,
    pub application: String,
    pub scenario: Scenario,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// SuiteReport / Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn summary(&self) -> Summary {
        let mut s = Summary::default();
        for r in &self.results {
            match r.outcome {
                Outcome::Passed => s.passed += 1,
                Outcome::Failed { .. } => s.failed += 1,
                Outcome::Skipped { .. } => s.skipped += 1,
                Outcome::XFailed { .. } => s.xfailed += 1,
                Outcome::XPassed => s.xpassed += 1,
            }
        }
        s
    }

    /// No scenario failed. Expected failures and skips don't count.
    pub fn succeeded(&self) -> bool {
        !self.results.iter().any(|r| r.outcome.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.results.iter().filter(|r| r.outcome.is_failure())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub xfailed: usize,
    pub xpassed: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            (self.failed, "failed"),
            (self.passed, "passed"),
            (self.skipped, "skipped"),
            (self.xfailed, "xfailed"),
            (self.xpassed, "xpassed"),
        ]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{n} {label}"))
        .collect();

        if parts.is_empty() {
            f.write_str("no scenarios run")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<Outcome>) -> SuiteReport {
        let now = Utc::now();
        SuiteReport {
            model: "ci".into(),
            started_at: now,
            finished_at: now,
            results: outcomes
                .into_iter()
                .map(|outcome| ScenarioReport {
                    case: "bionic-local".into(),
                    application: "gitlab-bionic-local".into(),
                    scenario: Scenario::Deploy,
                    outcome,
                    duration_ms: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn expected_failures_do_not_fail_the_suite() {
        let r = report(vec![
            Outcome::Passed,
            Outcome::Skipped {
                reason: "local".into(),
            },
            Outcome::XFailed {
                reason: "boom".into(),
            },
            Outcome::XPassed,
        ]);
        assert!(r.succeeded());
        assert_eq!(r.summary().to_string(), "1 passed, 1 skipped, 1 xfailed, 1 xpassed");
    }

    #[test]
    fn one_failure_fails_the_suite() {
        let r = report(vec![
            Outcome::Passed,
            Outcome::Failed {
                reason: "timed out".into(),
            },
        ]);
        assert!(!r.succeeded());
        assert_eq!(r.failures().count(), 1);
        assert_eq!(r.summary().to_string(), "1 failed, 1 passed");
    }

    #[test]
    fn empty_summary() {
        assert_eq!(report(vec![]).summary().to_string(), "no scenarios run");
    }

    #[test]
    fn outcome_display_includes_reason() {
        let o = Outcome::Failed {
            reason: "gitlab-bionic-local is in error".into(),
        };
        assert_eq!(o.to_string(), "failed (gitlab-bionic-local is in error)");
        assert_eq!(Outcome::Passed.to_string(), "passed");
    }

    #[test]
    fn outcome_serializes_flat() {
        let r = report(vec![Outcome::XFailed {
            reason: "relation failed".into(),
        }]);
        let yaml = serde_yaml::to_string(&r.results[0]).unwrap();
        assert!(yaml.contains("outcome: xfailed"));
        assert!(yaml.contains("reason: relation failed"));
        assert!(yaml.contains("scenario: deploy"));
    }
}
