use polcheck_config::SuiteConfig;
use polcheck_harness::{CaseOutcome, SuiteReport};
use serde_json::{json, Value};

/// Render a suite report as human-readable text.
pub fn render_report(report: &SuiteReport) -> String {
    let mut out = String::new();
    for case in &report.cases {
        let status = if case.passed() { "PASS" } else { "FAIL" };
        out.push_str(&format!("{}  {}  ({}s)\n", status, case.label, case.duration_secs));
        if let CaseOutcome::Failed { message } = &case.outcome {
            for line in message.lines() {
                out.push_str(&format!("      {}\n", line));
            }
        }
        if let Some(err) = &case.teardown_error {
            out.push_str(&format!("      teardown: {}\n", err));
        }
    }
    if let Some(err) = &report.baseline_teardown_error {
        out.push_str(&format!("baseline teardown: {}\n", err));
    }
    out.push_str(&format!("{} passed, {} failed\n", report.passed(), report.failed()));
    out
}

/// Render the cases of a suite, one per line with its module directory.
pub fn render_cases(suite: &SuiteConfig) -> String {
    let mut out = String::new();
    for case in &suite.cases {
        out.push_str(&format!(
            "{:<6} {:<40} {}\n",
            case.effect,
            case.label(),
            suite.case_dir(case).display()
        ));
    }
    out
}

pub fn cases_json(suite: &SuiteConfig) -> Value {
    let cases: Vec<Value> = suite
        .cases
        .iter()
        .map(|c| {
            json!({
                "name":       c.name,
                "effect":     c.effect,
                "dir":        suite.case_dir(c).display().to_string(),
                "assignment": c.assignment_name(&suite.assignment_prefix),
            })
        })
        .collect();
    json!({
        "terraform_dir": suite.terraform_dir.display().to_string(),
        "cases":         cases,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use polcheck_domain::{Effect, TestCase};
    use polcheck_harness::CaseReport;

    use super::*;

    fn suite() -> SuiteConfig {
        polcheck_config::parse_suite(
            "cases:\n  - name: tags\n    effect: audit\n  - name: tags\n    allowed: false\n",
            Path::new("/s"),
            "inline",
        )
        .unwrap()
    }

    #[test]
    fn report_lists_failures_with_messages() {
        let mut report = SuiteReport::new(Default::default());
        report.cases.push(CaseReport::new(
            &TestCase::new("tags", Effect::Allow).unwrap(),
            CaseOutcome::Passed,
        ));
        let mut failed = CaseReport::new(
            &TestCase::new("tags", Effect::Deny).unwrap(),
            CaseOutcome::Failed { message: "Policy breach was not prevented".into() },
        );
        failed.teardown_error = Some("destroy exited with code 1".into());
        report.cases.push(failed);

        let text = render_report(&report);
        assert!(text.contains("PASS  tags-allow"), "got: {}", text);
        assert!(text.contains("FAIL  tags-deny"), "got: {}", text);
        assert!(text.contains("      Policy breach was not prevented"), "got: {}", text);
        assert!(text.contains("teardown: destroy exited with code 1"), "got: {}", text);
        assert!(text.ends_with("1 passed, 1 failed\n"), "got: {}", text);
    }

    #[test]
    fn cases_text_shows_dirs() {
        let text = render_cases(&suite());
        assert!(text.contains("tags-audit"), "got: {}", text);
        assert!(text.contains("/s/terraform/tags-deny"), "got: {}", text);
    }

    #[test]
    fn cases_json_includes_assignment() {
        let v = cases_json(&suite());
        assert_eq!(v["cases"][0]["assignment"], "test-tags");
        assert_eq!(v["cases"][1]["effect"], "deny");
    }
}
