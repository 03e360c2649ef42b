//! # audit-policy
//!
//! Decides how much of an inbound API request gets written to the audit log.
//! A [`Policy`] is an ordered list of rules; the first rule whose predicates
//! all match a request decides the audit [`Level`], the [`Stage`]s to skip,
//! and whether managed fields are stripped from logged bodies.
//!
//! Construction normalizes the rules once (policy-wide omitted stages are
//! merged into every rule).  Evaluation afterwards is read-only, so a single
//! [`RuleEvaluator`] can be shared across request handlers without locking.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use audit_policy::{loader, AttributesRecord, ResourceTarget, RuleEvaluator};
//!
//! let policy = loader::load_policy("audit-policy.yaml").unwrap();
//! let evaluator = RuleEvaluator::new(policy);
//!
//! let attrs = AttributesRecord::resource_request("get", ResourceTarget::new("", "pods"));
//! let disposition = evaluator.evaluate(&attrs);
//! println!("{:?}", disposition.level);
//! ```

mod attributes;
mod decision;
mod evaluator;
pub mod loader;
pub mod matcher;
mod normalize;
mod schema;

// Re-export primary public API at crate root.
pub use attributes::{AttributesRecord, RequestAttributes, ResourceTarget, User, UserInfo};
pub use decision::Disposition;
pub use evaluator::{
    ConstantEvaluator, PolicyRuleEvaluator, RuleEvaluator, DEFAULT_AUDIT_LEVEL,
};
pub use normalize::{normalize, union_stages};
pub use schema::{GroupResources, Level, Policy, PolicyRule, Stage};
