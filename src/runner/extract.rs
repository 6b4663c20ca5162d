//! Pass/fail scraping from a test runner's human-readable output.
//!
//! Only the summary line is looked at (`=== 3 failed, 5 passed in 0.12s ===`
//! for pytest). Colour codes are stripped before matching, so the patterns
//! never have to account for them.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outcome recorded for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    Passed,
    Failed,
}

impl TestStatus {
    /// `Passed` exactly when nothing failed.
    pub fn from_failed(failed: u32) -> Self {
        if failed == 0 {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Passed => f.write_str("Passed"),
            TestStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// Counts scraped from one run's stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub status: TestStatus,
    pub passed: u32,
    pub failed: u32,
    /// False when neither a passed nor a failed count appeared anywhere.
    pub summary_found: bool,
}

impl Summary {
    /// Whether a Passed status disagrees with the process exit code, as when
    /// pytest exits 1 on collection errors without counting any failure.
    pub fn contradicts_exit(&self, returncode: Option<i32>) -> bool {
        self.status == TestStatus::Passed && returncode != Some(0)
    }
}

fn ansi_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("static ANSI pattern")
    })
}

fn combined_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s+failed\b.*?(\d+)\s+passed\b").expect("static summary pattern")
    })
}

fn passed_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s+passed\b").expect("static passed pattern"))
}

fn failed_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s+failed\b").expect("static failed pattern"))
}

/// Remove terminal colour/cursor escape sequences.
pub fn strip_ansi(text: &str) -> String {
    ansi_pattern().replace_all(text, "").into_owned()
}

/// Last count captured by `re` in `text`, if any.
///
/// The runner prints its totals at the very end, so later matches win over
/// earlier ones (e.g. a test named `test_3_passed` echoed in the log).
fn last_count(re: &Regex, text: &str) -> Option<u32> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .last()
}

/// Scrape pass/fail counts out of `stdout`.
///
/// Tries the combined `<N> failed ... <M> passed` form first, then looks for
/// each count on its own. Missing counts are zero.
pub fn extract(stdout: &str) -> Summary {
    let clean = strip_ansi(stdout);

    let combined = combined_pattern()
        .captures_iter(&clean)
        .filter_map(|caps| {
            let failed = caps.get(1)?.as_str().parse::<u32>().ok()?;
            let passed = caps.get(2)?.as_str().parse::<u32>().ok()?;
            Some((passed, failed))
        })
        .last();

    let (passed, failed, summary_found) = match combined {
        Some((passed, failed)) => (passed, failed, true),
        None => {
            let passed = last_count(passed_pattern(), &clean);
            let failed = last_count(failed_pattern(), &clean);
            (
                passed.unwrap_or(0),
                failed.unwrap_or(0),
                passed.is_some() || failed.is_some(),
            )
        }
    };

    Summary {
        status: TestStatus::from_failed(failed),
        passed,
        failed,
        summary_found,
    }
}
