use std::collections::BTreeMap;

use anyhow::{Context, Result};
use audit_policy::{AttributesRecord, Level, RuleEvaluator};
use decision_log::{DecisionEntry, DecisionSink, RequestSummary};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Totals reported after a run.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    /// Requests evaluated.
    pub evaluated: usize,
    /// Requests decided by a rule rather than the policy default.
    pub matched: usize,
    /// Input lines that could not be parsed.
    pub skipped: usize,
    pub by_level: BTreeMap<Level, usize>,
}

/// Parse one input line.  Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<AttributesRecord>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let attrs = serde_json::from_str(line).context("invalid request attributes")?;
    Ok(Some(attrs))
}

/// Evaluate every request read from `input` and log a decision for each.
///
/// Malformed lines are skipped with a warning; only read errors abort.
pub async fn run<R>(evaluator: &RuleEvaluator, input: R, sink: &DecisionSink) -> Result<Summary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = Summary::default();
    let mut lines = input.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read requests")? {
        line_no += 1;
        let attrs = match parse_line(&line) {
            Ok(Some(attrs)) => attrs,
            Ok(None) => continue,
            Err(err) => {
                warn!(line = line_no, error = %format!("{err:#}"), "skipping request");
                summary.skipped += 1;
                continue;
            }
        };

        let (matched_rule, disposition) = evaluator.decide(&attrs);
        debug!(
            line = line_no,
            level = %disposition.level,
            ?matched_rule,
            "request evaluated"
        );

        summary.evaluated += 1;
        if matched_rule.is_some() {
            summary.matched += 1;
        }
        *summary.by_level.entry(disposition.level).or_default() += 1;

        let entry = DecisionEntry::new(RequestSummary::from(&attrs), &disposition)
            .with_matched_rule(matched_rule);
        sink.log(entry).await;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use audit_policy::loader::load_policy_from_str;

    use super::*;

    const POLICY: &str = r#"
apiVersion: audit.k8s.io/v1
kind: Policy
omitStages: ["RequestReceived"]
rules:
  - level: None
    nonResourceURLs: ["/healthz*"]
  - level: RequestResponse
    userGroups: ["system:masters"]
  - level: Metadata
    resources:
      - group: ""
        resources: ["secrets"]
"#;

    #[test]
    fn parse_skips_blank_and_comment_lines() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("# recorded 2024-01-01").unwrap().is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = parse_line("{not json").unwrap_err();
        assert!(err.to_string().contains("invalid request attributes"));
    }

    #[test]
    fn parse_reads_record() {
        let attrs = parse_line(r#"{"verb":"get","path":"/healthz"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(attrs.verb, "get");
        assert_eq!(attrs.path, "/healthz");
    }

    #[tokio::test]
    async fn run_evaluates_and_logs_every_request() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("decisions.jsonl");

        let evaluator = RuleEvaluator::new(load_policy_from_str(POLICY).unwrap());
        let (sink, handle) = DecisionSink::start(&log_path).await.unwrap();

        let input = [
            r#"{"verb":"get","path":"/healthz/ready"}"#,
            r#"{"user":{"name":"root","groups":["system:masters"]},"verb":"delete","resource":{"resource":"pods","namespace":"default"}}"#,
            "",
            r#"{"verb":"get","resource":{"resource":"secrets","name":"token","namespace":"default"}}"#,
            "not json at all",
            r#"{"verb":"get","resource":{"resource":"pods"}}"#,
        ]
        .join("\n");

        let summary = run(&evaluator, input.as_bytes(), &sink).await.unwrap();
        drop(sink);
        handle.await.unwrap();

        assert_eq!(summary.evaluated, 4);
        assert_eq!(summary.matched, 3);
        assert_eq!(summary.skipped, 1);
        // The healthz rule and the unmatched pod both land on None.
        assert_eq!(summary.by_level.get(&Level::None), Some(&2));
        assert_eq!(summary.by_level.get(&Level::RequestResponse), Some(&1));
        assert_eq!(summary.by_level.get(&Level::Metadata), Some(&1));

        let contents = tokio::fs::read_to_string(&log_path).await.unwrap();
        let entries: Vec<DecisionEntry> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].matched_rule, Some(0));
        assert_eq!(entries[1].matched_rule, Some(1));
        assert_eq!(entries[1].request.user.as_deref(), Some("root"));
        assert_eq!(entries[2].level, Level::Metadata);
        assert_eq!(entries[3].matched_rule, None);
        assert!(entries
            .iter()
            .all(|e| e.omit_stages.contains(&audit_policy::Stage::RequestReceived)));
    }

    #[test]
    fn summary_serializes_levels_as_keys() {
        let mut summary = Summary::default();
        summary.by_level.insert(Level::Metadata, 2);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["by_level"]["Metadata"], 2);
    }
}
