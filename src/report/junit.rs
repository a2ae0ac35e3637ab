use super::types::{CaseSource, RequestOutcome};
use crate::error::{ReportError, Result};
use crate::utils::config::ReportConfig;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

/// Root of a JUnit report (`<testsuites>`)
#[derive(Debug, Clone, PartialEq)]
pub struct JUnitDocument {
    pub suites: Vec<TestSuite>,
}

/// One `<testsuite>`, collecting the cases of every outcome sharing a suite name
#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    pub name: String,
    pub timestamp: String,
    pub hostname: String,
    /// Sum of request runtimes, in seconds
    pub time: f64,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn tests(&self) -> usize {
        self.cases.len()
    }

    pub fn failures(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| matches!(c.outcome, CaseOutcome::Failure { .. }))
            .count()
    }

    pub fn errors(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| matches!(c.outcome, CaseOutcome::Error { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub classname: Option<String>,
    pub time: f64,
    pub outcome: CaseOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    Passed,
    /// A check evaluated and did not hold
    Failure { message: Option<String> },
    /// The request itself failed
    Error { message: String },
}

impl CaseOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            CaseOutcome::Passed => "pass",
            CaseOutcome::Failure { .. } | CaseOutcome::Error { .. } => "fail",
        }
    }
}

/// Environment details stamped onto every suite
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub timestamp: String,
    pub hostname: String,
}

impl ReportMeta {
    /// Current UTC time and the local host name
    pub fn current() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());

        Self {
            timestamp: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.3f")
                .to_string(),
            hostname,
        }
    }
}

/// Build a JUnit document from a run's outcomes
pub fn build_report(results: &[RequestOutcome], config: &ReportConfig) -> JUnitDocument {
    build_report_with(results, config, &ReportMeta::current())
}

/// Build a JUnit document with explicit timestamp and hostname.
///
/// Suites appear in the order their name is first seen; cases keep input order.
pub fn build_report_with(
    results: &[RequestOutcome],
    config: &ReportConfig,
    meta: &ReportMeta,
) -> JUnitDocument {
    let mut suites: Vec<TestSuite> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for outcome in results {
        let name = outcome
            .suite_name()
            .unwrap_or(config.default_suite_name.as_str());

        let slot = *index.entry(name).or_insert_with(|| {
            suites.push(TestSuite {
                name: name.to_string(),
                timestamp: meta.timestamp.clone(),
                hostname: meta.hostname.clone(),
                time: 0.0,
                cases: Vec::new(),
            });
            suites.len() - 1
        });

        let suite = &mut suites[slot];
        suite.time += outcome.runtime;
        suite.cases.extend(outcome_cases(outcome, config));
    }

    log::debug!(
        "Built JUnit report: {} suites from {} outcomes",
        suites.len(),
        results.len()
    );

    JUnitDocument { suites }
}

fn outcome_cases(outcome: &RequestOutcome, config: &ReportConfig) -> Vec<TestCase> {
    let sources = CaseSource::from_outcome(outcome);
    let case_time = if sources.is_empty() {
        0.0
    } else {
        outcome.runtime / sources.len() as f64
    };
    let classname = outcome.request.url.clone();

    sources
        .into_iter()
        .map(|source| {
            let (name, case_outcome) = match source {
                CaseSource::RequestError(error) => (
                    config.error_case_name.clone(),
                    CaseOutcome::Error {
                        message: error.message.clone(),
                    },
                ),
                CaseSource::Assertion(a) => (
                    case_name(&source, config),
                    check_outcome(source, a.error.as_deref()),
                ),
                CaseSource::Test(t) => (
                    case_name(&source, config),
                    check_outcome(source, t.error.as_deref()),
                ),
            };

            TestCase {
                name,
                classname: classname.clone(),
                time: case_time,
                outcome: case_outcome,
            }
        })
        .collect()
}

fn case_name(source: &CaseSource<'_>, config: &ReportConfig) -> String {
    source
        .name()
        .unwrap_or_else(|| config.unnamed_case_name.clone())
}

fn check_outcome(source: CaseSource<'_>, error: Option<&str>) -> CaseOutcome {
    if source.status().is_pass() {
        CaseOutcome::Passed
    } else {
        CaseOutcome::Failure {
            message: error.map(str::to_string),
        }
    }
}

/// Generic XML element: ordered attributes, optional text, ordered children
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Direct children with the given element name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

impl JUnitDocument {
    /// Lower the report into a generic XML tree
    pub fn to_xml_tree(&self) -> XmlNode {
        self.suites
            .iter()
            .fold(XmlNode::new("testsuites"), |root, suite| {
                root.child(suite_node(suite))
            })
    }

    /// Serialize the report to an XML string
    pub fn to_xml(&self, config: &ReportConfig) -> Result<String> {
        serialize_xml(&self.to_xml_tree(), config.indent)
    }
}

fn suite_node(suite: &TestSuite) -> XmlNode {
    let node = XmlNode::new("testsuite")
        .attr("name", &suite.name)
        .attr("errors", suite.errors())
        .attr("failures", suite.failures())
        .attr("skipped", 0)
        .attr("tests", suite.tests())
        .attr("timestamp", &suite.timestamp)
        .attr("hostname", &suite.hostname)
        .attr("time", format!("{:.3}", suite.time));

    suite
        .cases
        .iter()
        .fold(node, |node, case| node.child(case_node(case)))
}

fn case_node(case: &TestCase) -> XmlNode {
    let mut node = XmlNode::new("testcase")
        .attr("name", &case.name)
        .attr("status", case.outcome.status());
    if let Some(classname) = &case.classname {
        node = node.attr("classname", classname);
    }
    node = node.attr("time", format!("{:.3}", case.time));

    match &case.outcome {
        CaseOutcome::Passed => node,
        CaseOutcome::Failure { message } => {
            let mut failure = XmlNode::new("failure").attr("type", "failure");
            if let Some(message) = message {
                failure = failure.attr("message", message).text(message.as_str());
            }
            node.child(failure)
        }
        CaseOutcome::Error { message } => node.child(
            XmlNode::new("error")
                .attr("type", "error")
                .attr("message", message)
                .text(message.as_str()),
        ),
    }
}

/// Serialize an XML tree with a UTF-8 declaration
pub fn serialize_xml(root: &XmlNode, indent: usize) -> Result<String> {
    let mut writer = if indent > 0 {
        Writer::new_with_indent(Cursor::new(Vec::new()), b' ', indent)
    } else {
        Writer::new(Cursor::new(Vec::new()))
    };

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_node(&mut writer, root)?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_node<W: std::io::Write>(writer: &mut Writer<W>, node: &XmlNode) -> Result<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), &*xml_safe(value)));
    }

    if node.text.is_none() && node.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &node.text {
        writer.write_event(Event::Text(BytesText::new(&xml_safe(text))))?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
    Ok(())
}

/// Drop ANSI escape sequences and any character XML 1.0 cannot carry.
///
/// Escaping `<>&"'` is left to quick-xml.
fn xml_safe(value: &str) -> Cow<'_, str> {
    if value.chars().all(is_xml_char) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            // CSI sequence: parameters up to a final byte in '@'..='~'
            chars.next();
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        } else if is_xml_char(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || (c >= ' ' && c != '\u{fffe}' && c != '\u{ffff}')
}

/// Serialize the report and write it to `path`, replacing any existing file
pub fn write_report(doc: &JUnitDocument, path: &Path, config: &ReportConfig) -> Result<()> {
    let xml = doc.to_xml(config)?;
    std::fs::write(path, xml).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Wrote JUnit report with {} suites", doc.suites.len());
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::{
        AssertionResult, CheckStatus, RequestError, RequestInfo, TestResult,
    };
    use pretty_assertions::assert_eq;

    fn meta() -> ReportMeta {
        ReportMeta {
            timestamp: "2024-01-01T12:00:00.000".to_string(),
            hostname: "ci-runner".to_string(),
        }
    }

    fn assertion(lhs: &str, rhs: &str, status: CheckStatus, error: Option<&str>) -> AssertionResult {
        AssertionResult {
            lhs_expr: Some(lhs.to_string()),
            rhs_expr: Some(rhs.to_string()),
            status,
            error: error.map(str::to_string),
        }
    }

    fn request(url: &str) -> RequestInfo {
        RequestInfo {
            method: Some("GET".to_string()),
            url: Some(url.to_string()),
        }
    }

    fn sample_results() -> Vec<RequestOutcome> {
        vec![
            RequestOutcome {
                description: Some("description provided".to_string()),
                suitename: Some("Tests/Suite A".to_string()),
                request: request("https://ima.test"),
                assertion_results: vec![
                    assertion("res.status", "eq 200", CheckStatus::Pass, None),
                    assertion(
                        "res.status",
                        "neq 200",
                        CheckStatus::Fail,
                        Some("expected 200 to not equal 200"),
                    ),
                ],
                runtime: 1.2345678,
                ..Default::default()
            },
            RequestOutcome {
                suitename: Some("Tests/Suite B".to_string()),
                request: request("https://imanother.test"),
                test_results: vec![
                    TestResult {
                        description: Some("A test that passes".to_string()),
                        lhs_expr: Some("res.status".to_string()),
                        rhs_expr: Some("eq 200".to_string()),
                        status: CheckStatus::Pass,
                        error: None,
                    },
                    TestResult {
                        description: Some("A test that fails".to_string()),
                        lhs_expr: None,
                        rhs_expr: None,
                        status: CheckStatus::Fail,
                        error: Some("expected 200 to not equal 200".to_string()),
                    },
                ],
                runtime: 2.3456789,
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_build_report_structure() {
        let doc = build_report_with(&sample_results(), &ReportConfig::default(), &meta());

        assert_eq!(doc.suites.len(), 2);
        assert_eq!(doc.suites[0].name, "Tests/Suite A");
        assert_eq!(doc.suites[1].name, "Tests/Suite B");
        assert_eq!(doc.suites[0].tests(), 2);
        assert_eq!(doc.suites[1].tests(), 2);

        let pass_case = &doc.suites[0].cases[0];
        assert_eq!(pass_case.name, "res.status eq 200");
        assert_eq!(pass_case.outcome, CaseOutcome::Passed);
        assert_eq!(pass_case.classname.as_deref(), Some("https://ima.test"));

        let fail_case = &doc.suites[0].cases[1];
        assert_eq!(fail_case.name, "res.status neq 200");
        assert_eq!(
            fail_case.outcome,
            CaseOutcome::Failure {
                message: Some("expected 200 to not equal 200".to_string())
            }
        );

        assert_eq!(doc.suites[1].cases[0].name, "res.status eq 200");
        assert_eq!(doc.suites[1].cases[1].name, "A test that fails");
        assert_eq!(doc.suites[1].failures(), 1);
    }

    #[test]
    fn test_request_error_yields_single_error_case() {
        let results = vec![RequestOutcome {
            suitename: Some("Tests/Suite A".to_string()),
            request: request("https://ima.test"),
            assertion_results: vec![assertion("res.status", "eq 200", CheckStatus::Fail, None)],
            runtime: 1.2345678,
            error: Some(RequestError::new("timeout of 2000ms exceeded")),
            ..Default::default()
        }];

        let doc = build_report_with(&results, &ReportConfig::default(), &meta());
        let suite = &doc.suites[0];
        assert_eq!(suite.tests(), 1);
        assert_eq!(suite.errors(), 1);
        assert_eq!(suite.failures(), 0);

        let tree = doc.to_xml_tree();
        let case = tree.children[0].children_named("testcase").next().unwrap();
        assert_eq!(case.attribute("name"), Some("Test suite has no errors"));
        assert_eq!(case.attribute("status"), Some("fail"));
        assert_eq!(case.attribute("time"), Some("1.235"));

        let error = case.children_named("error").next().unwrap();
        assert_eq!(error.attribute("type"), Some("error"));
        assert_eq!(error.attribute("message"), Some("timeout of 2000ms exceeded"));
    }

    #[test]
    fn test_shared_suite_names_are_merged_in_order() {
        let mut results = sample_results();
        results.push(RequestOutcome {
            suitename: Some("Tests/Suite A".to_string()),
            assertion_results: vec![assertion("res.body.id", "isDefined", CheckStatus::Pass, None)],
            runtime: 0.5,
            ..Default::default()
        });

        let doc = build_report_with(&results, &ReportConfig::default(), &meta());
        assert_eq!(doc.suites.len(), 2);

        let suite_a = &doc.suites[0];
        let names: Vec<&str> = suite_a.cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["res.status eq 200", "res.status neq 200", "res.body.id isDefined"]
        );
        assert!((suite_a.time - 1.7345678).abs() < 1e-9);
    }

    #[test]
    fn test_outcome_without_checks_adds_no_cases() {
        let results = vec![RequestOutcome {
            suitename: Some("Empty".to_string()),
            runtime: 0.25,
            ..Default::default()
        }];

        let doc = build_report_with(&results, &ReportConfig::default(), &meta());
        assert_eq!(doc.suites.len(), 1);
        assert_eq!(doc.suites[0].tests(), 0);

        let tree = doc.to_xml_tree();
        assert_eq!(tree.children[0].attribute("tests"), Some("0"));
        assert_eq!(tree.children[0].attribute("time"), Some("0.250"));
    }

    #[test]
    fn test_unnamed_checks_and_default_suite() {
        let results = vec![RequestOutcome {
            test_results: vec![TestResult {
                description: None,
                lhs_expr: None,
                rhs_expr: None,
                status: CheckStatus::Pass,
                error: None,
            }],
            ..Default::default()
        }];

        let doc = build_report_with(&results, &ReportConfig::default(), &meta());
        assert_eq!(doc.suites[0].name, "default");
        assert_eq!(doc.suites[0].cases[0].name, "Unnamed check");
        assert_eq!(doc.suites[0].cases[0].classname, None);
    }

    #[test]
    fn test_xml_output() {
        let doc = build_report_with(&sample_results(), &ReportConfig::default(), &meta());
        let xml = doc.to_xml(&ReportConfig::default()).expect("Failed to generate XML");

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("<testsuites>"));
        assert!(xml.contains(r#"<testsuite name="Tests/Suite A" errors="0" failures="1" skipped="0" tests="2""#));
        assert!(xml.contains(r#"hostname="ci-runner""#));
        assert!(xml.contains(
            r#"<testcase name="res.status eq 200" status="pass" classname="https://ima.test" time="0.617"/>"#
        ));
        assert!(xml.contains(r#"<failure type="failure" message="expected 200 to not equal 200">"#));
        assert!(xml.trim_end().ends_with("</testsuites>"));
    }

    #[test]
    fn test_failure_without_error_text_is_bare() {
        let results = vec![RequestOutcome {
            suitename: Some("Tests/Suite A".to_string()),
            assertion_results: vec![AssertionResult {
                lhs_expr: Some("res.status".to_string()),
                rhs_expr: Some("eq 201".to_string()),
                status: CheckStatus::Fail,
                error: None,
            }],
            ..Default::default()
        }];

        let doc = build_report_with(&results, &ReportConfig::default(), &meta());
        let tree = doc.to_xml_tree();
        let case = tree.children[0].children_named("testcase").next().unwrap();
        let failure = case.children_named("failure").next().unwrap();
        assert_eq!(failure.attribute("type"), Some("failure"));
        assert_eq!(failure.attribute("message"), None);
        assert_eq!(failure.text, None);

        let xml = doc.to_xml(&ReportConfig::default()).unwrap();
        assert!(xml.contains(r#"<failure type="failure"/>"#));
    }

    #[test]
    fn test_ansi_colored_messages_are_stripped() {
        let results = vec![RequestOutcome {
            suitename: Some("Tests/Suite A".to_string()),
            assertion_results: vec![assertion(
                "res.status",
                "eq 200",
                CheckStatus::Fail,
                Some("\u{1b}[31mexpected 500 to equal 200\u{1b}[39m"),
            )],
            ..Default::default()
        }];

        let doc = build_report_with(&results, &ReportConfig::default(), &meta());
        let xml = serialize_xml(&doc.to_xml_tree(), 0).unwrap();

        assert!(!xml.contains('\u{1b}'));
        assert!(xml.contains(r#"message="expected 500 to equal 200""#));
        assert!(xml.contains(">expected 500 to equal 200</failure>"));
    }

    #[test]
    fn test_control_characters_are_dropped() {
        let root = XmlNode::new("error")
            .attr("message", "bad\u{0}byte\u{8}")
            .text("line one\nline\ttwo\u{7}");

        let xml = serialize_xml(&root, 0).unwrap();
        assert!(xml.contains(r#"message="badbyte""#));
        assert!(xml.contains(">line one\nline\ttwo</error>"));
    }

    #[test]
    fn test_error_message_is_kept_as_body() {
        let results = vec![RequestOutcome {
            suitename: Some("Tests/Suite A".to_string()),
            error: Some(RequestError::new("connect ECONNREFUSED\n    at TCPConnectWrap")),
            ..Default::default()
        }];

        let tree = build_report_with(&results, &ReportConfig::default(), &meta()).to_xml_tree();
        let case = tree.children[0].children_named("testcase").next().unwrap();
        let error = case.children_named("error").next().unwrap();
        assert_eq!(
            error.text.as_deref(),
            Some("connect ECONNREFUSED\n    at TCPConnectWrap")
        );
    }

    #[test]
    fn test_xml_escapes_text() {
        let root = XmlNode::new("testcase")
            .attr("name", r#"res.body.name eq "a&b""#)
            .child(XmlNode::new("failure").text("1 < 2"));

        let xml = serialize_xml(&root, 0).unwrap();
        assert!(xml.contains("name=\"res.body.name eq &quot;a&amp;b&quot;\""));
        assert!(xml.contains("<failure>1 &lt; 2</failure>"));
    }

    #[test]
    fn test_write_report_overwrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junit.xml");
        std::fs::write(&path, "stale").unwrap();

        let doc = build_report_with(&sample_results(), &ReportConfig::default(), &meta());
        write_report(&doc, &path, &ReportConfig::default()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("stale"));
        assert!(written.contains("Tests/Suite B"));
    }

    #[test]
    fn test_write_report_propagates_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("junit.xml");

        let doc = build_report_with(&[], &ReportConfig::default(), &meta());
        let err = write_report(&doc, &path, &ReportConfig::default()).unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
    }
}
