use super::types::RequestOutcome;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Aggregate counters for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounts {
    pub total_requests: usize,
    pub passed_requests: usize,
    pub failed_requests: usize,
    pub total_assertions: usize,
    pub passed_assertions: usize,
    pub failed_assertions: usize,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
}

impl SummaryCounts {
    /// Contribution of a single outcome.
    ///
    /// A request counts as failed only when it carries a request-level error; failing
    /// assertions or tests do not change the request classification.
    pub fn of(outcome: &RequestOutcome) -> Self {
        let failed_request = usize::from(outcome.error.is_some());
        let passed_assertions = outcome
            .assertion_results
            .iter()
            .filter(|a| a.status.is_pass())
            .count();
        let passed_tests = outcome
            .test_results
            .iter()
            .filter(|t| t.status.is_pass())
            .count();

        Self {
            total_requests: 1,
            passed_requests: 1 - failed_request,
            failed_requests: failed_request,
            total_assertions: outcome.assertion_results.len(),
            passed_assertions,
            failed_assertions: outcome.assertion_results.len() - passed_assertions,
            total_tests: outcome.test_results.len(),
            passed_tests,
            failed_tests: outcome.test_results.len() - passed_tests,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed_requests > 0 || self.failed_assertions > 0 || self.failed_tests > 0
    }
}

impl Add for SummaryCounts {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for SummaryCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.total_requests += rhs.total_requests;
        self.passed_requests += rhs.passed_requests;
        self.failed_requests += rhs.failed_requests;
        self.total_assertions += rhs.total_assertions;
        self.passed_assertions += rhs.passed_assertions;
        self.failed_assertions += rhs.failed_assertions;
        self.total_tests += rhs.total_tests;
        self.passed_tests += rhs.passed_tests;
        self.failed_tests += rhs.failed_tests;
    }
}

impl Sum for SummaryCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Fold a run's outcomes into summary counts
pub fn summarize(results: &[RequestOutcome]) -> SummaryCounts {
    results.iter().map(SummaryCounts::of).sum()
}

/// Print a summary table to stdout
pub fn print_summary(summary: &SummaryCounts) {
    println!();
    println!("{}", "📊 Run Summary".bold());
    println!(
        "  Requests:   {}",
        format_row(
            summary.total_requests,
            summary.passed_requests,
            summary.failed_requests
        )
    );
    println!(
        "  Tests:      {}",
        format_row(summary.total_tests, summary.passed_tests, summary.failed_tests)
    );
    println!(
        "  Assertions: {}",
        format_row(
            summary.total_assertions,
            summary.passed_assertions,
            summary.failed_assertions
        )
    );
    println!();
}

fn format_row(total: usize, passed: usize, failed: usize) -> String {
    let passed = format!("{} passed", passed).green();
    let failed = if failed > 0 {
        format!("{} failed", failed).red()
    } else {
        format!("{} failed", failed).normal()
    };
    format!("{}, {}, {} total", passed, failed, total)
}
