use std::collections::HashSet;

/// Cap on extracted build warnings/errors
const WARNINGS_CAP: usize = 30;
/// Cap on extracted test failures
const FAILURES_CAP: usize = 50;

/// A single line matcher used by classification rules
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Line contains the substring
    Contains(&'static str),
    /// Line starts with the prefix
    StartsWith(&'static str),
}

impl Matcher {
    fn matches(&self, line: &str) -> bool {
        match self {
            Matcher::Contains(s) => line.contains(s),
            Matcher::StartsWith(s) => line.starts_with(s),
        }
    }
}

/// Ordering applied to a finding set before truncation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    /// Sort lexicographically for deterministic output
    Sorted,
    /// Preserve first-seen order
    FirstSeen,
}

/// A classification rule: inclusion matchers, exclusion matchers, ordering, and a cap.
///
/// Heuristic by design. Rules are data so callers can swap in structured
/// parsers later without touching the pipeline.
#[derive(Debug, Clone)]
pub struct Rule {
    pub includes: Vec<Matcher>,
    pub excludes: Vec<Matcher>,
    pub ordering: Ordering,
    pub cap: usize,
}

/// Rule for compiler warnings and errors in build logs.
///
/// Continuation notes, "declared here" annotations, and "In file included"
/// headers are noise attached to a primary diagnostic and are dropped.
pub fn warnings_rule() -> Rule {
    Rule {
        includes: vec![Matcher::Contains("warning:"), Matcher::Contains("error:")],
        excludes: vec![
            Matcher::Contains("note:"),
            Matcher::Contains("declared here"),
            Matcher::StartsWith("In file included"),
        ],
        ordering: Ordering::Sorted,
        cap: WARNINGS_CAP,
    }
}

/// Rule for test failures in test-runner logs (case-sensitive on purpose)
pub fn failures_rule() -> Rule {
    Rule {
        includes: vec![
            Matcher::Contains("FAILED"),
            Matcher::Contains("ERROR"),
            Matcher::Contains("FAIL"),
        ],
        excludes: vec![],
        ordering: Ordering::FirstSeen,
        cap: FAILURES_CAP,
    }
}

/// Extract the lines of `log` matching `rule`.
///
/// Processing order: include, exclude, deduplicate, order, truncate to the cap.
/// Deterministic for identical input.
pub fn classify(log: &str, rule: &Rule) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut lines: Vec<String> = log
        .lines()
        .filter(|line| rule.includes.iter().any(|m| m.matches(line)))
        .filter(|line| !rule.excludes.iter().any(|m| m.matches(line)))
        .filter(|line| seen.insert(line.to_string()))
        .map(|line| line.to_string())
        .collect();

    if rule.ordering == Ordering::Sorted {
        lines.sort();
    }
    lines.truncate(rule.cap);
    lines
}
