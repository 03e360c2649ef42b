use std::collections::HashSet;

use crate::schema::{Policy, Stage};

/// Merge the policy-wide omitted stages into every rule.
///
/// Afterwards each rule's `omit_stages` is the duplicate-free union of its
/// own stages and `policy.omit_stages`.  Nothing else on the rules changes;
/// in particular `omit_managed_fields` stays unset where it was unset, since
/// the policy default is applied at evaluation time.
pub fn normalize(mut policy: Policy) -> Policy {
    for rule in &mut policy.rules {
        rule.omit_stages =
            union_stages(&[policy.omit_stages.as_slice(), rule.omit_stages.as_slice()]);
    }
    policy
}

/// Union of several stage lists, keeping the first occurrence of each stage.
pub fn union_stages(lists: &[&[Stage]]) -> Vec<Stage> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for stage in lists.iter().flat_map(|l| l.iter()) {
        if seen.insert(stage) {
            out.push(stage.clone());
        }
    }
    out
}
