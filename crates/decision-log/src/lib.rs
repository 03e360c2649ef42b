//! Append-only JSON-lines log of audit policy decisions.
//!
//! Every evaluated request becomes one [`DecisionEntry`]: a summary of the
//! request, the level and omitted stages chosen for it, and the index of the
//! rule that decided.  Entries are handed to a [`DecisionSink`], which feeds
//! a background task writing one JSON object per line.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use audit_policy::{AttributesRecord, Policy, RuleEvaluator};
//! use decision_log::{DecisionEntry, DecisionSink, RequestSummary};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let evaluator = RuleEvaluator::new(Policy::default());
//! let (sink, handle) = DecisionSink::start("decisions.jsonl").await?;
//!
//! let attrs = AttributesRecord::non_resource_request("get", "/healthz");
//! let entry = DecisionEntry::new(RequestSummary::from(&attrs), &evaluator.evaluate(&attrs))
//!     .with_matched_rule(evaluator.first_match(&attrs));
//! sink.log(entry).await;
//!
//! drop(sink);
//! handle.await?;
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod sink;
pub mod writer;

// Re-export primary public types at the crate root for convenience.
pub use entry::{DecisionEntry, RequestSummary, RequestTarget};
pub use sink::DecisionSink;
pub use writer::{DecisionWriteError, DecisionWriter};
