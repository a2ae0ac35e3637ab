use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of executing a single request, as produced by the runner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suitename: Option<String>,
    #[serde(default)]
    pub request: RequestInfo,
    #[serde(default)]
    pub assertion_results: Vec<AssertionResult>,
    #[serde(default)]
    pub test_results: Vec<TestResult>,
    #[serde(default)]
    pub runtime: f64,
    #[serde(default)]
    pub error: Option<RequestError>,
}

impl RequestOutcome {
    /// Suite this outcome is reported under, if it names one
    pub fn suite_name(&self) -> Option<&str> {
        [self.suitename.as_deref(), self.description.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
    }

    /// Number of individual checks (assertions + tests) carried by this outcome
    pub fn check_count(&self) -> usize {
        self.assertion_results.len() + self.test_results.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Result of a declarative `lhs <op> rhs` assertion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lhs_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhs_expr: Option<String>,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a scripted `test(...)` block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lhs_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhs_expr: Option<String>,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status of one assertion or test.
///
/// Anything other than `"pass"` is read as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
        }
    }

    pub fn is_pass(self) -> bool {
        self == CheckStatus::Pass
    }
}

impl From<String> for CheckStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pass" => CheckStatus::Pass,
            "fail" => CheckStatus::Fail,
            other => {
                log::warn!("Unknown check status '{}', counting it as a failure", other);
                CheckStatus::Fail
            }
        }
    }
}

impl From<CheckStatus> for &'static str {
    fn from(status: CheckStatus) -> Self {
        status.as_str()
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-level failure (network error, timeout, ...).
///
/// Accepted either as a bare string or as an object carrying a `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRequestError")]
pub struct RequestError {
    pub message: String,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRequestError {
    Text(String),
    Object {
        #[serde(default)]
        message: String,
    },
}

impl From<RawRequestError> for RequestError {
    fn from(raw: RawRequestError) -> Self {
        match raw {
            RawRequestError::Text(message) | RawRequestError::Object { message } => {
                RequestError { message }
            }
        }
    }
}

/// A single reportable check, tagged by where it came from
#[derive(Debug, Clone, Copy)]
pub enum CaseSource<'a> {
    Assertion(&'a AssertionResult),
    Test(&'a TestResult),
    RequestError(&'a RequestError),
}

impl<'a> CaseSource<'a> {
    /// Checks an outcome contributes to a report, in report order.
    ///
    /// A request-level error replaces the outcome's checks with a single error case.
    pub fn from_outcome(outcome: &'a RequestOutcome) -> Vec<CaseSource<'a>> {
        if let Some(error) = &outcome.error {
            return vec![CaseSource::RequestError(error)];
        }

        outcome
            .assertion_results
            .iter()
            .map(CaseSource::Assertion)
            .chain(outcome.test_results.iter().map(CaseSource::Test))
            .collect()
    }

    /// Case name: `"lhs rhs"` when both sides are known, else the description.
    ///
    /// Request errors have no name of their own and return `None`.
    pub fn name(&self) -> Option<String> {
        match self {
            CaseSource::Assertion(a) => join_exprs(a.lhs_expr.as_deref(), a.rhs_expr.as_deref()),
            CaseSource::Test(t) => join_exprs(t.lhs_expr.as_deref(), t.rhs_expr.as_deref())
                .or_else(|| t.description.clone()),
            CaseSource::RequestError(_) => None,
        }
    }

    pub fn status(&self) -> CheckStatus {
        match self {
            CaseSource::Assertion(a) => a.status,
            CaseSource::Test(t) => t.status,
            CaseSource::RequestError(_) => CheckStatus::Fail,
        }
    }
}

fn join_exprs(lhs: Option<&str>, rhs: Option<&str>) -> Option<String> {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => Some(format!("{} {}", lhs, rhs)),
        _ => None,
    }
}

/// Contents of a results file: either a bare list of outcomes or a saved JSON report
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ResultsFile {
    Outcomes(Vec<RequestOutcome>),
    Report { results: Vec<RequestOutcome> },
}

impl ResultsFile {
    pub fn into_outcomes(self) -> Vec<RequestOutcome> {
        match self {
            ResultsFile::Outcomes(results) => results,
            ResultsFile::Report { results } => results,
        }
    }
}
