use tracing::{debug, trace};

use crate::attributes::RequestAttributes;
use crate::decision::Disposition;
use crate::matcher::rule_matches;
use crate::normalize::{normalize, union_stages};
use crate::schema::{Level, Policy, PolicyRule, Stage};

/// Level returned when no rule matches a request.
pub const DEFAULT_AUDIT_LEVEL: Level = Level::None;

/// Anything that can pick an audit [`Disposition`] for a request.
///
/// Object safe, so servers can hold an `Arc<dyn PolicyRuleEvaluator>` and
/// swap in a [`ConstantEvaluator`] for tests or to bypass the policy.
pub trait PolicyRuleEvaluator: Send + Sync {
    /// Pick the disposition for one request.
    fn evaluate_policy_rule(&self, attrs: &dyn RequestAttributes) -> Disposition<'_>;
}

// ---------------------------------------------------------------------------
// RuleEvaluator
// ---------------------------------------------------------------------------

/// First-match evaluator over a normalized policy.
///
/// Construct via [`RuleEvaluator::new`], which merges the policy-wide omitted
/// stages into every rule.  The evaluator is immutable afterwards; to reload
/// a policy build a new evaluator and replace the shared reference.
pub struct RuleEvaluator {
    /// Rules in declaration order, stages already merged.
    rules: Vec<PolicyRule>,
    omit_stages: Vec<Stage>,
    omit_managed_fields: bool,
}

impl std::fmt::Debug for RuleEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEvaluator")
            .field("num_rules", &self.rules.len())
            .field("omit_stages", &self.omit_stages)
            .field("omit_managed_fields", &self.omit_managed_fields)
            .finish()
    }
}

impl RuleEvaluator {
    /// Normalize `policy` and build an evaluator from it.
    pub fn new(policy: Policy) -> Self {
        let policy = normalize(policy);

        for (index, rule) in policy.rules.iter().enumerate() {
            debug!(
                index,
                level = %rule.level,
                users = ?rule.users,
                user_groups = ?rule.user_groups,
                verbs = ?rule.verbs,
                resources = ?rule.resources,
                namespaces = ?rule.namespaces,
                non_resource_urls = ?rule.non_resource_urls,
                omit_stages = ?rule.omit_stages,
                omit_managed_fields = ?rule.omit_managed_fields,
                "audit policy rule loaded"
            );
        }

        Self {
            rules: policy.rules,
            omit_stages: union_stages(&[policy.omit_stages.as_slice()]),
            omit_managed_fields: policy.omit_managed_fields,
        }
    }

    /// The normalized rules in evaluation order.
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Policy-wide omitted stages, also used for unmatched requests.
    pub fn omit_stages(&self) -> &[Stage] {
        &self.omit_stages
    }

    /// Policy-wide managed-fields default.
    pub fn omit_managed_fields(&self) -> bool {
        self.omit_managed_fields
    }

    /// Index of the first rule matching `attrs`, if any.
    pub fn first_match<A>(&self, attrs: &A) -> Option<usize>
    where
        A: RequestAttributes + ?Sized,
    {
        self.rules.iter().position(|rule| rule_matches(rule, attrs))
    }

    /// Pick the disposition for `attrs`: the first matching rule's, or the
    /// policy default at [`DEFAULT_AUDIT_LEVEL`] when nothing matches.
    pub fn evaluate<A>(&self, attrs: &A) -> Disposition<'_>
    where
        A: RequestAttributes + ?Sized,
    {
        self.decide(attrs).1
    }

    /// Like [`evaluate`](Self::evaluate), also returning the index of the
    /// deciding rule.
    pub fn decide<A>(&self, attrs: &A) -> (Option<usize>, Disposition<'_>)
    where
        A: RequestAttributes + ?Sized,
    {
        match self.first_match(attrs) {
            Some(index) => {
                trace!(rule = index, verb = attrs.verb(), "audit policy rule matched");
                (Some(index), self.disposition_from_rule(&self.rules[index]))
            }
            None => {
                trace!(verb = attrs.verb(), "no audit policy rule matched");
                (None, self.default_disposition())
            }
        }
    }

    // -- Helpers --------------------------------------------------------------

    fn disposition_from_rule<'a>(&'a self, rule: &'a PolicyRule) -> Disposition<'a> {
        Disposition {
            level: rule.level,
            omit_stages: &rule.omit_stages,
            omit_managed_fields: rule
                .omit_managed_fields
                .unwrap_or(self.omit_managed_fields),
        }
    }

    fn default_disposition(&self) -> Disposition<'_> {
        Disposition {
            level: DEFAULT_AUDIT_LEVEL,
            omit_stages: &self.omit_stages,
            omit_managed_fields: self.omit_managed_fields,
        }
    }
}

impl PolicyRuleEvaluator for RuleEvaluator {
    fn evaluate_policy_rule(&self, attrs: &dyn RequestAttributes) -> Disposition<'_> {
        self.evaluate(attrs)
    }
}

// ---------------------------------------------------------------------------
// ConstantEvaluator
// ---------------------------------------------------------------------------

/// Returns the same level and omitted stages for every request.
#[derive(Debug, Clone)]
pub struct ConstantEvaluator {
    level: Level,
    omit_stages: Vec<Stage>,
}

impl ConstantEvaluator {
    /// Build an evaluator that always answers `level` and `omit_stages`.
    pub fn new(level: Level, omit_stages: Vec<Stage>) -> Self {
        Self { level, omit_stages }
    }
}

impl PolicyRuleEvaluator for ConstantEvaluator {
    fn evaluate_policy_rule(&self, _attrs: &dyn RequestAttributes) -> Disposition<'_> {
        Disposition {
            level: self.level,
            omit_stages: &self.omit_stages,
            omit_managed_fields: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
