use std::collections::BTreeMap;

use anyhow::{Context, bail};
use sbs_config::SbsConfig;
use sbs_core::bundle::{Bundle, FailureEntry, ViolationEntry};
use sbs_core::contract::ValidationContext;
use sbs_core::refs::{DanglingReference, dangling_references};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::CheckArgs;
use crate::output::{output, read_input};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    /// Decoded record count per kind tag.
    records: BTreeMap<String, usize>,
    failures: Vec<FailureEntry>,
    violations: Vec<ViolationEntry>,
    dangling: Vec<DanglingReference>,
}

impl CheckReport {
    fn from_bundle(bundle: &Bundle) -> Self {
        Self {
            records: bundle
                .kinds()
                .map(|records| (records.kind().to_string(), records.len()))
                .collect(),
            failures: bundle.failures(),
            violations: bundle.violations(),
            dangling: dangling_references(bundle),
        }
    }

    fn problem_count(&self) -> usize {
        self.failures.len() + self.violations.len() + self.dangling.len()
    }
}

fn build_report(text: &str, ctx: &ValidationContext) -> anyhow::Result<CheckReport> {
    let bundle = Bundle::from_json(text, ctx).context("not a bundle")?;
    Ok(CheckReport::from_bundle(&bundle))
}

/// Handle `sbs check`.
pub fn handle(args: &CheckArgs, config: &SbsConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let text = read_input(&args.path)?;
    let report = build_report(&text, &config.decode.validation_context())
        .with_context(|| format!("failed to decode {}", args.path.display()))?;
    output(&report, flags.format)?;

    let problems = report.problem_count();
    if args.strict && problems > 0 {
        bail!("{problems} problem(s) found in {}", args.path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn report_collects_every_problem_kind() {
        let text = json!({
            "user": [
                {"id": 5, "createDate": "2020-01-01T00:00:00Z", "username": "ok"},
                {"id": "x", "createDate": "2020-01-01T00:00:00Z", "username": "bad"}
            ],
            "comment": [{
                "id": 9001,
                "createDate": "2020-01-01T00:00:00Z",
                "editDate": "2020-01-01T00:00:00Z",
                "createUserId": 5,
                "parentId": 300,
                "content": "k"
            }],
            "content": [],
            "poll": []
        })
        .to_string();

        let report = build_report(&text, &ValidationContext::default()).unwrap();

        assert_eq!(report.records.get("user"), Some(&1));
        assert_eq!(report.records.get("comment"), Some(&1));
        let failed_kinds: Vec<&str> = report.failures.iter().map(|f| f.kind.as_str()).collect();
        assert!(failed_kinds.contains(&"user"));
        assert!(failed_kinds.contains(&"poll"));
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.dangling.len(), 1);
        assert_eq!(report.dangling[0].target_id, 300);
        assert_eq!(report.problem_count(), 4);
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(build_report("[1, 2]", &ValidationContext::default()).is_err());
        assert!(build_report("{oops", &ValidationContext::default()).is_err());
    }

    #[test]
    fn clean_bundle_has_no_problems() {
        let text = json!({
            "user": [{"id": 5, "createDate": "2020-01-01T00:00:00Z", "username": "ok"}]
        })
        .to_string();
        let report = build_report(&text, &ValidationContext::default()).unwrap();
        assert_eq!(report.problem_count(), 0);
    }
}
